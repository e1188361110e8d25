//! Per-operator session state handed to every handler and provider.

use std::sync::Arc;
use std::time::Duration;

use helm_rpc::{JobsClient, RpcGateway, WorkspacesClient};
use helm_settings::HelmSettings;
use parking_lot::RwLock;

use crate::render::Renderer;

/// Server clients, renderer, and operator selections for one console.
pub struct Session {
    gateway: Arc<RpcGateway>,
    jobs: JobsClient,
    workspaces: WorkspacesClient,
    renderer: Arc<dyn Renderer>,
    completion_timeout: Duration,
    module: RwLock<Option<String>>,
    workspace: RwLock<Option<String>>,
}

impl Session {
    /// Build a session over a running gateway.
    pub fn new(gateway: Arc<RpcGateway>, settings: &HelmSettings, renderer: Arc<dyn Renderer>) -> Self {
        let timeout = settings.rpc.call_timeout();
        Self {
            jobs: JobsClient::new(gateway.clone(), timeout)
                .with_concurrent_batch(settings.rpc.concurrent_batch),
            workspaces: WorkspacesClient::new(gateway.clone(), timeout),
            gateway,
            renderer,
            completion_timeout: settings.rpc.completion_timeout(),
            module: RwLock::new(None),
            workspace: RwLock::new(None),
        }
    }

    /// Job-control client.
    pub fn jobs(&self) -> &JobsClient {
        &self.jobs
    }

    /// Workspace client.
    pub fn workspaces(&self) -> &WorkspacesClient {
        &self.workspaces
    }

    /// Underlying gateway.
    pub fn gateway(&self) -> &Arc<RpcGateway> {
        &self.gateway
    }

    /// Where command results go.
    pub fn renderer(&self) -> &dyn Renderer {
        self.renderer.as_ref()
    }

    /// Bound applied to each completion provider call.
    pub fn completion_timeout(&self) -> Duration {
        self.completion_timeout
    }

    /// Module selected by the last `use`.
    pub fn current_module(&self) -> Option<String> {
        self.module.read().clone()
    }

    /// Record the selected module.
    pub fn set_current_module(&self, module: Option<String>) {
        *self.module.write() = module;
    }

    /// Workspace selected by the last `workspace switch`.
    pub fn current_workspace(&self) -> Option<String> {
        self.workspace.read().clone()
    }

    /// Record the selected workspace.
    pub fn set_current_workspace(&self, workspace: Option<String>) {
        *self.workspace.write() = workspace;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::RecordingRenderer;
    use helm_rpc::testing::{FakeServer, JobBoard};

    #[tokio::test]
    async fn selections_start_empty_and_update() {
        let (gateway, _server) = FakeServer::connect(JobBoard::default().responder());
        let session = Session::new(gateway, &HelmSettings::default(), Arc::new(RecordingRenderer::new()));

        assert_eq!(session.current_module(), None);
        session.set_current_module(Some("exploit/multi/handler".into()));
        assert_eq!(session.current_module().as_deref(), Some("exploit/multi/handler"));

        session.set_current_workspace(Some("red".into()));
        assert_eq!(session.current_workspace().as_deref(), Some("red"));
        assert_eq!(session.completion_timeout(), Duration::from_millis(500));
    }
}
