//! Context-sensitive completion.
//!
//! Each context gets a static tree built from its bindings: command names
//! and aliases at the first level, declared subcommands below. A node may
//! also carry a [`DynamicProvider`] whose candidates are fetched from the
//! server at completion time. Dynamic candidates are leaves.
//!
//! The engine keeps one tree active. [`CompletionEngine::switch`] replaces
//! it atomically; a request already running keeps the snapshot it started
//! with.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;

use crate::context::{Context, ContextId};
use crate::errors::{CommandError, ConsoleError};
use crate::registry::ContextRegistry;
use crate::session::Session;

/// Source of completion candidates computed at completion time.
#[async_trait]
pub trait DynamicProvider: Send + Sync {
    /// Current candidates. Errors and slow answers yield no candidates.
    async fn candidates(&self, session: &Session) -> Result<Vec<String>, CommandError>;
}

/// One node of a completion tree.
#[derive(Clone, Default)]
pub struct CompletionNode {
    label: String,
    children: BTreeMap<String, CompletionNode>,
    provider: Option<Arc<dyn DynamicProvider>>,
}

impl CompletionNode {
    fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Self::default()
        }
    }

    /// Label typed to reach this node; empty for the root.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Static child by exact label.
    pub fn child(&self, label: &str) -> Option<&CompletionNode> {
        self.children.get(label)
    }

    /// Static child labels, sorted.
    pub fn child_labels(&self) -> Vec<&str> {
        self.children.keys().map(String::as_str).collect()
    }

    /// Whether this node asks a provider for more candidates.
    pub fn is_dynamic(&self) -> bool {
        self.provider.is_some()
    }
}

/// Build the static completion tree for one context.
pub fn build_tree(context: &Context) -> CompletionNode {
    let mut root = CompletionNode::new("");
    for command in context.commands() {
        let mut node = CompletionNode::new(command.name());
        node.provider.clone_from(&command.provider);
        for sub in command.subcommands() {
            let mut child = CompletionNode::new(sub.name());
            child.provider.clone_from(&sub.provider);
            let _ = node.children.insert(sub.name().to_owned(), child);
        }
        for label in command.labels() {
            let mut entry = node.clone();
            entry.label = label.to_owned();
            let _ = root.children.insert(label.to_owned(), entry);
        }
    }
    root
}

/// Per-context completion trees with one active at a time.
pub struct CompletionEngine {
    trees: HashMap<ContextId, Arc<CompletionNode>>,
    active: RwLock<Arc<CompletionNode>>,
}

impl CompletionEngine {
    /// Build a tree for every registered context and activate `initial`.
    pub fn new(registry: &ContextRegistry, initial: ContextId) -> Result<Self, ConsoleError> {
        let trees: HashMap<ContextId, Arc<CompletionNode>> = registry
            .ids()
            .into_iter()
            .filter_map(|id| registry.context(id).map(|ctx| (id, Arc::new(build_tree(ctx)))))
            .collect();
        let active = trees
            .get(&initial)
            .cloned()
            .ok_or(ConsoleError::UnknownContext { context: initial })?;
        Ok(Self {
            trees,
            active: RwLock::new(active),
        })
    }

    /// Make `context`'s tree active.
    pub fn switch(&self, context: ContextId) -> Result<(), ConsoleError> {
        let tree = self
            .trees
            .get(&context)
            .cloned()
            .ok_or(ConsoleError::UnknownContext { context })?;
        *self.active.write() = tree;
        debug!(%context, "completion tree switched");
        Ok(())
    }

    /// The tree completions currently start from.
    pub fn snapshot(&self) -> Arc<CompletionNode> {
        self.active.read().clone()
    }

    /// Candidates for the next token of `line`, sorted and deduplicated.
    ///
    /// A line ending in whitespace completes a fresh token; otherwise the
    /// last token is treated as a prefix. Never fails: provider errors and
    /// timeouts contribute nothing.
    pub async fn complete(&self, line: &str, session: &Session) -> Vec<String> {
        let tree = self.snapshot();

        let mut tokens: Vec<&str> = line.split_whitespace().collect();
        let partial = if line.is_empty() || line.ends_with(char::is_whitespace) {
            ""
        } else {
            tokens.pop().unwrap_or_default()
        };

        let mut node = tree.as_ref();
        for token in tokens {
            match node.child(token) {
                Some(child) => node = child,
                None => return Vec::new(),
            }
        }

        let mut candidates: BTreeSet<String> = node
            .children
            .keys()
            .filter(|label| label.starts_with(partial))
            .cloned()
            .collect();

        if let Some(provider) = &node.provider {
            for label in fetch(provider.as_ref(), node.label(), session).await {
                if label.starts_with(partial) {
                    let _ = candidates.insert(label);
                }
            }
        }
        candidates.into_iter().collect()
    }
}

async fn fetch(provider: &dyn DynamicProvider, label: &str, session: &Session) -> Vec<String> {
    let timeout = session.completion_timeout();
    match tokio::time::timeout(timeout, provider.candidates(session)).await {
        Ok(Ok(labels)) => labels,
        Ok(Err(err)) => {
            debug!(node = label, error = %err, "completion provider failed");
            Vec::new()
        }
        Err(_elapsed) => {
            debug!(node = label, timeout_ms = timeout.as_millis(), "completion provider timed out");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Command, CommandHandler, Invocation, Outcome, Subcommand};
    use crate::render::RecordingRenderer;
    use helm_rpc::RpcError;
    use helm_rpc::testing::{FakeServer, JobBoard};
    use helm_settings::HelmSettings;
    use std::time::Duration;

    struct Noop;

    #[async_trait]
    impl CommandHandler for Noop {
        async fn run(&self, _invocation: Invocation<'_>) -> Result<Outcome, CommandError> {
            Ok(Outcome::Stay)
        }
    }

    struct Fixed(&'static [&'static str]);

    #[async_trait]
    impl DynamicProvider for Fixed {
        async fn candidates(&self, _session: &Session) -> Result<Vec<String>, CommandError> {
            Ok(self.0.iter().map(ToString::to_string).collect())
        }
    }

    struct Failing;

    #[async_trait]
    impl DynamicProvider for Failing {
        async fn candidates(&self, _session: &Session) -> Result<Vec<String>, CommandError> {
            Err(CommandError::Rpc(RpcError::Disconnected))
        }
    }

    struct Slow;

    #[async_trait]
    impl DynamicProvider for Slow {
        async fn candidates(&self, _session: &Session) -> Result<Vec<String>, CommandError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(vec!["late".into()])
        }
    }

    fn session() -> (Session, FakeServer) {
        let (gateway, server) = FakeServer::connect(JobBoard::default().responder());
        let session = Session::new(gateway, &HelmSettings::default(), Arc::new(RecordingRenderer::new()));
        (session, server)
    }

    fn registry() -> ContextRegistry {
        let mut reg = ContextRegistry::new();
        reg.add_context(ContextId::MODULE, ContextId::MAIN).unwrap();
        reg.bind(
            ContextId::MAIN,
            Command::new("jobs", Noop)
                .subcommand(Subcommand::new("kill").with_provider(Fixed(&["1", "2", "12"])))
                .subcommand(Subcommand::new("kill-all")),
        )
        .unwrap();
        reg.bind(ContextId::MAIN, Command::new("exit", Noop)).unwrap();
        reg.bind(ContextId::MAIN, Command::new("broken", Noop).with_provider(Failing))
            .unwrap();
        reg.bind(ContextId::MAIN, Command::new("slow", Noop).with_provider(Slow))
            .unwrap();
        reg.bind(ContextId::MODULE, Command::new("back", Noop).alias("exit"))
            .unwrap();
        reg.bind(ContextId::MODULE, Command::new("info", Noop)).unwrap();
        reg
    }

    #[test]
    fn tree_lists_names_aliases_and_subcommands() {
        let reg = registry();
        let tree = build_tree(reg.context(ContextId::MODULE).unwrap());
        assert_eq!(tree.child_labels(), vec!["back", "exit", "info"]);

        let main = build_tree(reg.context(ContextId::MAIN).unwrap());
        let jobs = main.child("jobs").unwrap();
        assert_eq!(jobs.child_labels(), vec!["kill", "kill-all"]);
        assert!(jobs.child("kill").unwrap().is_dynamic());
    }

    #[tokio::test]
    async fn completes_static_prefixes() {
        let (session, _server) = session();
        let engine = CompletionEngine::new(&registry(), ContextId::MAIN).unwrap();

        assert_eq!(engine.complete("", &session).await, vec!["broken", "exit", "jobs", "slow"]);
        assert_eq!(engine.complete("j", &session).await, vec!["jobs"]);
        assert_eq!(engine.complete("jobs k", &session).await, vec!["kill", "kill-all"]);
        assert!(engine.complete("nope ", &session).await.is_empty());
    }

    #[tokio::test]
    async fn dynamic_candidates_are_prefix_filtered_leaves() {
        let (session, _server) = session();
        let engine = CompletionEngine::new(&registry(), ContextId::MAIN).unwrap();

        assert_eq!(engine.complete("jobs kill ", &session).await, vec!["1", "12", "2"]);
        assert_eq!(engine.complete("jobs kill 1", &session).await, vec!["1", "12"]);
        assert!(engine.complete("jobs kill 1 ", &session).await.is_empty());
    }

    #[tokio::test]
    async fn failing_provider_yields_nothing() {
        let (session, _server) = session();
        let engine = CompletionEngine::new(&registry(), ContextId::MAIN).unwrap();
        assert!(engine.complete("broken ", &session).await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_provider_is_cut_off() {
        let (session, _server) = session();
        let engine = CompletionEngine::new(&registry(), ContextId::MAIN).unwrap();
        assert!(engine.complete("slow ", &session).await.is_empty());
    }

    #[tokio::test]
    async fn switch_replaces_tree_but_not_held_snapshots() {
        let (session, _server) = session();
        let engine = CompletionEngine::new(&registry(), ContextId::MAIN).unwrap();
        let before = engine.snapshot();

        engine.switch(ContextId::MODULE).unwrap();
        assert_eq!(engine.complete("", &session).await, vec!["back", "exit", "info"]);
        assert!(before.child("jobs").is_some());

        assert!(engine.switch(ContextId::COMPILER).is_err());
        assert_eq!(engine.snapshot().child_labels(), vec!["back", "exit", "info"]);
    }
}
