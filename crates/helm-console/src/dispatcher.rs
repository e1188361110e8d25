//! Resolve and run one input line against the active context.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::completion::CompletionEngine;
use crate::context::{ContextId, Invocation, Outcome};
use crate::errors::ConsoleError;
use crate::registry::ContextRegistry;
use crate::session::Session;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Running(ContextId),
    Ended,
}

/// Owns the registry and the active context.
///
/// Starts in [`ContextId::MAIN`]. The only way out is an
/// [`Outcome::EndSession`] returned from a Main command; every later
/// dispatch fails with [`ConsoleError::SessionEnded`].
pub struct Dispatcher {
    registry: ContextRegistry,
    completion: Arc<CompletionEngine>,
    state: State,
}

impl Dispatcher {
    /// Dispatcher over an assembled registry, starting in Main.
    pub fn new(registry: ContextRegistry) -> Result<Self, ConsoleError> {
        let completion = Arc::new(CompletionEngine::new(&registry, ContextId::MAIN)?);
        Ok(Self {
            registry,
            completion,
            state: State::Running(ContextId::MAIN),
        })
    }

    /// Active context, or `None` once the session ended.
    pub fn active(&self) -> Option<ContextId> {
        match self.state {
            State::Running(id) => Some(id),
            State::Ended => None,
        }
    }

    /// Whether the session ended.
    pub fn is_ended(&self) -> bool {
        self.state == State::Ended
    }

    /// Registry this dispatcher resolves against.
    pub fn registry(&self) -> &ContextRegistry {
        &self.registry
    }

    /// Completion engine tracking the active context.
    pub fn completion(&self) -> Arc<CompletionEngine> {
        Arc::clone(&self.completion)
    }

    /// Tokenize `line` on whitespace, run the named command, and apply the
    /// transition it asks for.
    ///
    /// A blank line does nothing. Handler errors come back wrapped in
    /// [`ConsoleError::Command`]; the active context is unchanged then.
    pub async fn dispatch(&mut self, line: &str, session: &Session) -> Result<(), ConsoleError> {
        let State::Running(active) = self.state else {
            return Err(ConsoleError::SessionEnded);
        };

        let tokens: Vec<String> = line.split_whitespace().map(str::to_owned).collect();
        let Some((name, args)) = tokens.split_first() else {
            return Ok(());
        };

        let context = self
            .registry
            .context(active)
            .ok_or(ConsoleError::UnknownContext { context: active })?;
        let command = context
            .resolve(name)
            .cloned()
            .ok_or_else(|| ConsoleError::UnknownCommand { token: name.clone() })?;

        debug!(%active, command = command.name(), args = args.len(), "dispatching");
        let outcome = command
            .handler
            .run(Invocation {
                args,
                session,
                context,
            })
            .await
            .map_err(|source| ConsoleError::Command {
                command: command.name().to_owned(),
                source,
            })?;

        self.apply(active, outcome)
    }

    fn apply(&mut self, active: ContextId, outcome: Outcome) -> Result<(), ConsoleError> {
        let next = match outcome {
            Outcome::Stay => return Ok(()),
            Outcome::Enter(target) => {
                if !self.registry.contains(target) {
                    return Err(ConsoleError::UnknownContext { context: target });
                }
                target
            }
            Outcome::Back => self.parent_of(active),
            Outcome::EndSession if active == ContextId::MAIN => {
                info!("session ended");
                self.state = State::Ended;
                return Ok(());
            }
            Outcome::EndSession => {
                warn!(%active, "end of session requested outside main, returning to parent");
                self.parent_of(active)
            }
        };

        self.completion.switch(next)?;
        self.state = State::Running(next);
        if next != active {
            info!(from = %active, to = %next, "context changed");
        }
        Ok(())
    }

    fn parent_of(&self, id: ContextId) -> ContextId {
        self.registry
            .context(id)
            .map_or(ContextId::MAIN, |ctx| ctx.parent())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Command, CommandHandler};
    use crate::errors::CommandError;
    use crate::render::RecordingRenderer;
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use helm_rpc::testing::{FakeServer, JobBoard};
    use helm_settings::HelmSettings;
    use parking_lot::Mutex;

    /// Records every argument list it is called with.
    #[derive(Clone, Default)]
    struct Recorder {
        calls: Arc<Mutex<Vec<Vec<String>>>>,
    }

    #[async_trait]
    impl CommandHandler for Recorder {
        async fn run(&self, invocation: Invocation<'_>) -> Result<Outcome, CommandError> {
            self.calls.lock().push(invocation.args.to_vec());
            Ok(Outcome::Stay)
        }
    }

    struct Returns(Outcome);

    #[async_trait]
    impl CommandHandler for Returns {
        async fn run(&self, _invocation: Invocation<'_>) -> Result<Outcome, CommandError> {
            Ok(self.0)
        }
    }

    struct Fails;

    #[async_trait]
    impl CommandHandler for Fails {
        async fn run(&self, _invocation: Invocation<'_>) -> Result<Outcome, CommandError> {
            Err(CommandError::usage("usage: fail"))
        }
    }

    fn session() -> (Session, FakeServer) {
        let (gateway, server) = FakeServer::connect(JobBoard::default().responder());
        let session = Session::new(gateway, &HelmSettings::default(), Arc::new(RecordingRenderer::new()));
        (session, server)
    }

    fn dispatcher(recorder: &Recorder) -> Dispatcher {
        let mut reg = ContextRegistry::new();
        reg.add_context(ContextId::MODULE, ContextId::MAIN).unwrap();
        reg.bind(ContextId::MAIN, Command::new("run", recorder.clone()).alias("r"))
            .unwrap();
        reg.bind(ContextId::MAIN, Command::new("use", Returns(Outcome::Enter(ContextId::MODULE))))
            .unwrap();
        reg.bind(ContextId::MAIN, Command::new("up", Returns(Outcome::Back))).unwrap();
        reg.bind(ContextId::MAIN, Command::new("nowhere", Returns(Outcome::Enter(ContextId::COMPILER))))
            .unwrap();
        reg.bind(ContextId::MAIN, Command::new("fail", Fails)).unwrap();
        reg.bind(ContextId::MAIN, Command::new("exit", Returns(Outcome::EndSession)))
            .unwrap();
        reg.bind(ContextId::MODULE, Command::new("back", Returns(Outcome::Back)))
            .unwrap();
        reg.bind(ContextId::MODULE, Command::new("quit", Returns(Outcome::EndSession)))
            .unwrap();
        Dispatcher::new(reg).unwrap()
    }

    #[tokio::test]
    async fn blank_lines_are_no_ops() {
        let (session, _server) = session();
        let recorder = Recorder::default();
        let mut d = dispatcher(&recorder);

        d.dispatch("", &session).await.unwrap();
        d.dispatch("   \t ", &session).await.unwrap();
        assert!(recorder.calls.lock().is_empty());
        assert_eq!(d.active(), Some(ContextId::MAIN));
    }

    #[tokio::test]
    async fn alias_gets_identical_arguments() {
        let (session, _server) = session();
        let recorder = Recorder::default();
        let mut d = dispatcher(&recorder);

        d.dispatch("run  a   b", &session).await.unwrap();
        d.dispatch("r a b", &session).await.unwrap();
        let calls = recorder.calls.lock().clone();
        assert_eq!(calls, vec![vec!["a", "b"], vec!["a", "b"]]);
    }

    #[tokio::test]
    async fn unknown_and_miscased_commands_are_rejected() {
        let (session, _server) = session();
        let mut d = dispatcher(&Recorder::default());

        assert_matches!(
            d.dispatch("jbos", &session).await,
            Err(ConsoleError::UnknownCommand { ref token }) if token == "jbos"
        );
        assert_matches!(d.dispatch("RUN", &session).await, Err(ConsoleError::UnknownCommand { .. }));
        assert_eq!(d.active(), Some(ContextId::MAIN));
    }

    #[tokio::test]
    async fn enter_and_back_follow_parents() {
        let (session, _server) = session();
        let mut d = dispatcher(&Recorder::default());

        d.dispatch("up", &session).await.unwrap();
        assert_eq!(d.active(), Some(ContextId::MAIN));

        d.dispatch("use", &session).await.unwrap();
        assert_eq!(d.active(), Some(ContextId::MODULE));
        assert!(d.completion().snapshot().child("back").is_some());
        assert_matches!(d.dispatch("run", &session).await, Err(ConsoleError::UnknownCommand { .. }));

        d.dispatch("back", &session).await.unwrap();
        assert_eq!(d.active(), Some(ContextId::MAIN));
        assert!(d.completion().snapshot().child("run").is_some());
    }

    #[tokio::test]
    async fn entering_unregistered_context_fails_in_place() {
        let (session, _server) = session();
        let mut d = dispatcher(&Recorder::default());
        assert_matches!(
            d.dispatch("nowhere", &session).await,
            Err(ConsoleError::UnknownContext { context: ContextId::COMPILER })
        );
        assert_eq!(d.active(), Some(ContextId::MAIN));
    }

    #[tokio::test]
    async fn handler_error_is_wrapped_and_non_fatal() {
        let (session, _server) = session();
        let recorder = Recorder::default();
        let mut d = dispatcher(&recorder);

        let err = d.dispatch("fail now", &session).await.unwrap_err();
        assert_matches!(err, ConsoleError::Command { ref command, .. } if command == "fail");
        d.dispatch("run", &session).await.unwrap();
        assert_eq!(recorder.calls.lock().len(), 1);
    }

    #[tokio::test]
    async fn end_session_only_from_main() {
        let (session, _server) = session();
        let mut d = dispatcher(&Recorder::default());

        d.dispatch("use", &session).await.unwrap();
        d.dispatch("quit", &session).await.unwrap();
        assert_eq!(d.active(), Some(ContextId::MAIN));

        d.dispatch("exit", &session).await.unwrap();
        assert!(d.is_ended());
        assert_eq!(d.active(), None);
        assert_matches!(d.dispatch("run", &session).await, Err(ConsoleError::SessionEnded));
        assert_matches!(d.dispatch("", &session).await, Err(ConsoleError::SessionEnded));
    }
}
