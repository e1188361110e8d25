//! Job-control client: list, kill, and kill-all server-side jobs.
//!
//! Payloads are JSON inside the envelope's opaque bytes:
//!
//! | kind | request | response |
//! |---|---|---|
//! | list jobs | empty | `{"active": [Job, ...]}` |
//! | kill job | `{"id": n}` | `{"id": n, "success": bool, "err": "..."}` |

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use helm_core::MessageKind;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::RpcError;
use crate::gateway::RpcGateway;

/// Server-assigned job identifier.
pub type JobId = u32;

/// Read snapshot of one server-side job.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    /// Identifier, unique among active jobs.
    pub id: JobId,
    /// Short name (e.g. listener type).
    pub name: String,
    /// Protocol label.
    #[serde(default)]
    pub protocol: String,
    /// Bound port, `0` when not applicable.
    #[serde(default)]
    pub port: u16,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
}

/// Result of listing jobs.
///
/// `NoActiveJobs` is a normal state, distinct from any RPC failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JobListing {
    /// The server reported no active jobs.
    NoActiveJobs,
    /// Active jobs keyed by id, ascending.
    Active(BTreeMap<JobId, Job>),
}

impl JobListing {
    /// Build a listing from the server's job array.
    pub fn from_jobs(jobs: Vec<Job>) -> Self {
        let mut active = BTreeMap::new();
        for job in jobs {
            let id = job.id;
            if active.insert(id, job).is_some() {
                warn!(job_id = id, "server listed the same job id twice, keeping the last");
            }
        }
        if active.is_empty() {
            Self::NoActiveJobs
        } else {
            Self::Active(active)
        }
    }

    /// Job ids in ascending order.
    pub fn ids(&self) -> Vec<JobId> {
        match self {
            Self::NoActiveJobs => Vec::new(),
            Self::Active(jobs) => jobs.keys().copied().collect(),
        }
    }

    /// Number of active jobs.
    pub fn len(&self) -> usize {
        match self {
            Self::NoActiveJobs => 0,
            Self::Active(jobs) => jobs.len(),
        }
    }

    /// Whether there are no active jobs.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::NoActiveJobs)
    }
}

/// Outcome of one kill attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KillOutcome {
    /// Job the kill targeted.
    pub id: JobId,
    /// Whether the server confirmed the kill.
    pub success: bool,
    /// Server message, or the RPC error that prevented a confirmation.
    pub message: String,
}

impl KillOutcome {
    fn failed(id: JobId, message: impl Into<String>) -> Self {
        Self {
            id,
            success: false,
            message: message.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct JobsResponse {
    #[serde(default)]
    active: Vec<Job>,
}

#[derive(Debug, Serialize)]
struct KillRequest {
    id: JobId,
}

#[derive(Debug, Deserialize)]
struct KillResponse {
    id: JobId,
    success: bool,
    #[serde(default)]
    err: String,
}

/// Typed job-control API over the [`RpcGateway`].
#[derive(Clone)]
pub struct JobsClient {
    gateway: Arc<RpcGateway>,
    timeout: Duration,
    concurrent_batch: bool,
}

impl JobsClient {
    /// Create a client issuing calls with the given timeout.
    pub fn new(gateway: Arc<RpcGateway>, timeout: Duration) -> Self {
        Self {
            gateway,
            timeout,
            concurrent_batch: false,
        }
    }

    /// Issue the per-job kills of [`kill_all_jobs`](Self::kill_all_jobs)
    /// concurrently instead of one after another.
    #[must_use]
    pub fn with_concurrent_batch(mut self, concurrent: bool) -> Self {
        self.concurrent_batch = concurrent;
        self
    }

    /// Fetch the current job snapshot.
    pub async fn list_jobs(&self) -> Result<JobListing, RpcError> {
        let kind = MessageKind::ListJobs;
        let payload = self.gateway.call(kind, Vec::new(), self.timeout).await?;
        let response: JobsResponse =
            serde_json::from_slice(&payload).map_err(|e| RpcError::decode(kind, &e))?;
        debug!(count = response.active.len(), "listed jobs");
        Ok(JobListing::from_jobs(response.active))
    }

    /// Ask the server to kill one job.
    ///
    /// Never fails: RPC errors come back as an unsuccessful outcome whose
    /// message is the error text.
    pub async fn kill_job(&self, id: JobId) -> KillOutcome {
        let outcome = match self.try_kill_job(id).await {
            Ok(outcome) => outcome,
            Err(err) => KillOutcome::failed(id, err.to_string()),
        };
        if outcome.success {
            info!(job_id = id, "job killed");
        } else {
            warn!(job_id = id, message = %outcome.message, "job kill failed");
        }
        outcome
    }

    async fn try_kill_job(&self, id: JobId) -> Result<KillOutcome, RpcError> {
        let kind = MessageKind::KillJob;
        let request =
            serde_json::to_vec(&KillRequest { id }).map_err(|e| RpcError::encode(kind, &e))?;
        let payload = self.gateway.call(kind, request, self.timeout).await?;
        let response: KillResponse =
            serde_json::from_slice(&payload).map_err(|e| RpcError::decode(kind, &e))?;

        if response.id != id {
            return Err(RpcError::ProtocolDecode {
                kind,
                message: format!("kill response names job #{} instead of #{id}", response.id),
            });
        }
        let message = if response.err.is_empty() {
            if response.success {
                format!("Successfully killed job #{id}")
            } else {
                format!("Failed to kill job #{id}")
            }
        } else {
            response.err
        };
        Ok(KillOutcome {
            id,
            success: response.success,
            message,
        })
    }

    /// List jobs, then kill each one.
    ///
    /// Not transactional: every listed job gets its own attempt regardless of
    /// earlier failures. Returns one outcome per job in id order. An empty
    /// vector means there were no active jobs; only the listing can fail.
    pub async fn kill_all_jobs(&self) -> Result<Vec<KillOutcome>, RpcError> {
        let ids = self.list_jobs().await?.ids();
        debug!(count = ids.len(), concurrent = self.concurrent_batch, "killing all jobs");

        if self.concurrent_batch {
            return Ok(join_all(ids.into_iter().map(|id| self.kill_job(id))).await);
        }

        let mut outcomes = Vec::with_capacity(ids.len());
        for id in ids {
            outcomes.push(self.kill_job(id).await);
        }
        Ok(outcomes)
    }
}
