//! Scripted in-process server for exercising the gateway and its clients.
//!
//! [`FakeServer::connect`] links a real [`RpcGateway`] to a task that answers
//! each request through a responder closure. [`JobBoard`] is a stateful
//! responder holding jobs and workspaces.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use helm_core::{Envelope, MessageKind};
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::json;
use tokio::task::JoinHandle;

use crate::errors::TransportError;
use crate::gateway::RpcGateway;
use crate::jobs::{Job, JobId};
use crate::transport::memory::{self, MemorySink};
use crate::transport::{EnvelopeSink, EnvelopeSource};

/// What the fake server does with one request.
#[derive(Debug)]
pub enum Reply {
    /// Send this envelope immediately.
    Respond(Envelope),
    /// Send this envelope after a delay, without blocking later requests.
    Delayed(Duration, Envelope),
    /// Never answer.
    Ignore,
}

/// Responder closure type.
pub type Responder = Arc<dyn Fn(&Envelope) -> Reply + Send + Sync>;

/// Server end of an in-memory link, answering through a responder.
pub struct FakeServer {
    sink: MemorySink,
    requests: Arc<Mutex<Vec<Envelope>>>,
    task: JoinHandle<()>,
}

impl FakeServer {
    /// Spawn a fake server and a gateway connected to it.
    pub fn connect<F>(responder: F) -> (Arc<RpcGateway>, Self)
    where
        F: Fn(&Envelope) -> Reply + Send + Sync + 'static,
    {
        let (client, server) = memory::link(64);
        let gateway = Arc::new(RpcGateway::spawn(client.sink, client.source, 64));

        let requests = Arc::new(Mutex::new(Vec::new()));
        let responder: Responder = Arc::new(responder);
        let sink = server.sink.clone();
        let task = tokio::spawn(serve(server.sink, server.source, responder, requests.clone()));

        (gateway, Self { sink, requests, task })
    }

    /// Every request received so far, in arrival order.
    pub fn requests(&self) -> Vec<Envelope> {
        self.requests.lock().clone()
    }

    /// Requests of one kind, in arrival order.
    pub fn requests_of(&self, kind: MessageKind) -> Vec<Envelope> {
        self.requests
            .lock()
            .iter()
            .filter(|env| env.kind == kind)
            .cloned()
            .collect()
    }

    /// Inject an unsolicited envelope toward the client.
    pub async fn push(&self, envelope: Envelope) -> Result<(), TransportError> {
        self.sink.clone().send(envelope).await
    }

    /// Stop serving and close the link; the gateway sees a disconnect.
    pub fn disconnect(self) {
        drop(self);
    }
}

impl Drop for FakeServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve(
    mut sink: MemorySink,
    mut source: memory::MemorySource,
    responder: Responder,
    requests: Arc<Mutex<Vec<Envelope>>>,
) {
    while let Some(Ok(request)) = source.recv().await {
        requests.lock().push(request.clone());
        match responder(&request) {
            Reply::Respond(envelope) => {
                if sink.send(envelope).await.is_err() {
                    break;
                }
            }
            Reply::Delayed(delay, envelope) => {
                let mut delayed = sink.clone();
                drop(tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let _ = delayed.send(envelope).await;
                }));
            }
            Reply::Ignore => {}
        }
    }
}

#[derive(Default)]
struct BoardState {
    jobs: BTreeMap<JobId, Job>,
    failing: BTreeSet<JobId>,
    workspaces: Vec<String>,
}

#[derive(Deserialize)]
struct KillRequest {
    id: JobId,
}

/// Shared, mutable job and workspace state served by [`JobBoard::responder`].
#[derive(Clone, Default)]
pub struct JobBoard {
    state: Arc<Mutex<BoardState>>,
}

impl JobBoard {
    /// Board with the given active jobs.
    pub fn new(jobs: Vec<Job>) -> Self {
        let board = Self::default();
        board.state.lock().jobs = jobs.into_iter().map(|job| (job.id, job)).collect();
        board
    }

    /// Jobs whose kill the server refuses.
    #[must_use]
    pub fn failing(self, ids: impl IntoIterator<Item = JobId>) -> Self {
        self.state.lock().failing.extend(ids);
        self
    }

    /// Workspace names the server reports.
    #[must_use]
    pub fn with_workspaces<S: Into<String>>(self, names: impl IntoIterator<Item = S>) -> Self {
        self.state.lock().workspaces = names.into_iter().map(Into::into).collect();
        self
    }

    /// Ids still active, ascending.
    pub fn ids(&self) -> Vec<JobId> {
        self.state.lock().jobs.keys().copied().collect()
    }

    /// Add or replace a job.
    pub fn insert(&self, job: Job) {
        let _ = self.state.lock().jobs.insert(job.id, job);
    }

    /// Responder answering list, kill, and workspace requests from this board.
    pub fn responder(&self) -> impl Fn(&Envelope) -> Reply + Send + Sync + 'static {
        let state = self.state.clone();
        move |request: &Envelope| Reply::Respond(answer(&state, request))
    }
}

fn answer(state: &Mutex<BoardState>, request: &Envelope) -> Envelope {
    let mut state = state.lock();
    let body = match request.kind {
        MessageKind::ListJobs => {
            let active: Vec<&Job> = state.jobs.values().collect();
            json!({ "active": active })
        }
        MessageKind::KillJob => {
            let Ok(KillRequest { id }) = serde_json::from_slice(&request.payload) else {
                return Envelope::reply_error(request, "malformed kill request");
            };
            if state.failing.contains(&id) {
                json!({ "id": id, "success": false, "err": format!("job #{id} could not be stopped") })
            } else if state.jobs.remove(&id).is_some() {
                json!({ "id": id, "success": true })
            } else {
                json!({ "id": id, "success": false, "err": format!("job #{id} not found") })
            }
        }
        MessageKind::ListWorkspaces => json!({ "workspaces": state.workspaces }),
        MessageKind::Other(tag) => {
            return Envelope::reply_error(request, format!("unsupported request kind {tag}"));
        }
    };
    Envelope::reply(request, body.to_string().into_bytes())
}
