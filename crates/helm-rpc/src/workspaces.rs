//! Workspace listing over the gateway.

use std::sync::Arc;
use std::time::Duration;

use helm_core::MessageKind;
use serde::Deserialize;

use crate::errors::RpcError;
use crate::gateway::RpcGateway;

#[derive(Debug, Deserialize)]
struct WorkspacesResponse {
    #[serde(default)]
    workspaces: Vec<String>,
}

/// Typed workspace API over the [`RpcGateway`].
#[derive(Clone)]
pub struct WorkspacesClient {
    gateway: Arc<RpcGateway>,
    timeout: Duration,
}

impl WorkspacesClient {
    /// Create a client issuing calls with the given timeout.
    pub fn new(gateway: Arc<RpcGateway>, timeout: Duration) -> Self {
        Self { gateway, timeout }
    }

    /// Same client with a different per-call timeout.
    #[must_use]
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        Self {
            gateway: self.gateway.clone(),
            timeout,
        }
    }

    /// Names of all workspaces the server knows, in server order.
    pub async fn list_workspaces(&self) -> Result<Vec<String>, RpcError> {
        let kind = MessageKind::ListWorkspaces;
        let payload = self.gateway.call(kind, Vec::new(), self.timeout).await?;
        let response: WorkspacesResponse =
            serde_json::from_slice(&payload).map_err(|e| RpcError::decode(kind, &e))?;
        Ok(response.workspaces)
    }
}
