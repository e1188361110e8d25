//! Contexts, commands, and the handler contract.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::completion::DynamicProvider;
use crate::errors::{CommandError, ConsoleError};
use crate::session::Session;

/// Identifier of a console context.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(&'static str);

impl ContextId {
    /// Root context. Its parent is itself.
    pub const MAIN: Self = Self("main");
    /// Entered by `use <module>`.
    pub const MODULE: Self = Self("module");
    /// Entered by `compiler`.
    pub const COMPILER: Self = Self("compiler");

    /// Context with a custom name.
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    /// Context name.
    pub const fn name(self) -> &'static str {
        self.0
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Transition a handler asks for after it ran.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Remain in the active context.
    Stay,
    /// Make the given context active.
    Enter(ContextId),
    /// Return to the active context's parent.
    Back,
    /// End the session. Honored only in [`ContextId::MAIN`].
    EndSession,
}

/// What a handler receives for one dispatched line.
pub struct Invocation<'a> {
    /// Tokens after the command name, verbatim.
    pub args: &'a [String],
    /// Session state and server clients.
    pub session: &'a Session,
    /// The context the command was resolved in.
    pub context: &'a Context,
}

/// Behavior bound to a command name.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// Run the command.
    async fn run(&self, invocation: Invocation<'_>) -> Result<Outcome, CommandError>;
}

/// Named subcommand, used for help and completion.
#[derive(Clone)]
pub struct Subcommand {
    pub(crate) name: String,
    pub(crate) provider: Option<Arc<dyn DynamicProvider>>,
}

impl Subcommand {
    /// Subcommand with no dynamic arguments.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            provider: None,
        }
    }

    /// Complete this subcommand's argument from a live provider.
    #[must_use]
    pub fn with_provider(mut self, provider: impl DynamicProvider + 'static) -> Self {
        self.provider = Some(Arc::new(provider));
        self
    }

    /// Subcommand name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A command: a primary name, aliases, and one handler.
#[derive(Clone)]
pub struct Command {
    pub(crate) name: String,
    pub(crate) aliases: Vec<String>,
    pub(crate) subcommands: Vec<Subcommand>,
    pub(crate) provider: Option<Arc<dyn DynamicProvider>>,
    pub(crate) short_help: String,
    pub(crate) long_help: String,
    pub(crate) handler: Arc<dyn CommandHandler>,
}

impl Command {
    /// Command named `name` running `handler`.
    pub fn new(name: impl Into<String>, handler: impl CommandHandler + 'static) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            subcommands: Vec::new(),
            provider: None,
            short_help: String::new(),
            long_help: String::new(),
            handler: Arc::new(handler),
        }
    }

    /// Add an alias that runs the same handler.
    #[must_use]
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// Append a subcommand; order is kept for help and completion.
    #[must_use]
    pub fn subcommand(mut self, subcommand: Subcommand) -> Self {
        self.subcommands.push(subcommand);
        self
    }

    /// Complete the first argument from a live provider.
    #[must_use]
    pub fn with_provider(mut self, provider: impl DynamicProvider + 'static) -> Self {
        self.provider = Some(Arc::new(provider));
        self
    }

    /// One-line and full help text.
    #[must_use]
    pub fn help(mut self, short: impl Into<String>, long: impl Into<String>) -> Self {
        self.short_help = short.into();
        self.long_help = long.into();
        self
    }

    /// Primary name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Aliases in bind order.
    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    /// Subcommands in declaration order.
    pub fn subcommands(&self) -> &[Subcommand] {
        &self.subcommands
    }

    /// One-line help.
    pub fn short_help(&self) -> &str {
        &self.short_help
    }

    /// Full help, falling back to the one-line help.
    pub fn long_help(&self) -> &str {
        if self.long_help.is_empty() {
            &self.short_help
        } else {
            &self.long_help
        }
    }

    /// Primary name followed by aliases.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .finish_non_exhaustive()
    }
}

/// A named console mode and its command set.
pub struct Context {
    id: ContextId,
    parent: ContextId,
    commands: BTreeMap<String, Arc<Command>>,
    labels: HashMap<String, String>,
}

impl Context {
    pub(crate) fn new(id: ContextId, parent: ContextId) -> Self {
        Self {
            id,
            parent,
            commands: BTreeMap::new(),
            labels: HashMap::new(),
        }
    }

    /// Context id.
    pub fn id(&self) -> ContextId {
        self.id
    }

    /// Context `back` returns to.
    pub fn parent(&self) -> ContextId {
        self.parent
    }

    /// Resolve a name or alias, exact and case-sensitive.
    pub fn resolve(&self, token: &str) -> Option<&Arc<Command>> {
        self.labels
            .get(token)
            .and_then(|primary| self.commands.get(primary))
    }

    /// Commands sorted by primary name.
    pub fn commands(&self) -> impl Iterator<Item = &Arc<Command>> {
        self.commands.values()
    }

    /// Bind a command. Nothing changes unless every label is free.
    pub(crate) fn bind(&mut self, command: Command) -> Result<(), ConsoleError> {
        let mut seen: Vec<&str> = Vec::new();
        for label in command.labels() {
            if self.labels.contains_key(label) || seen.contains(&label) {
                return Err(ConsoleError::DuplicateCommand {
                    context: self.id,
                    name: label.to_owned(),
                });
            }
            seen.push(label);
        }

        for label in command.labels() {
            let _ = self.labels.insert(label.to_owned(), command.name.clone());
        }
        let _ = self.commands.insert(command.name.clone(), Arc::new(command));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    struct Noop;

    #[async_trait]
    impl CommandHandler for Noop {
        async fn run(&self, _invocation: Invocation<'_>) -> Result<Outcome, CommandError> {
            Ok(Outcome::Stay)
        }
    }

    #[test]
    fn resolves_name_and_alias_to_same_command() {
        let mut ctx = Context::new(ContextId::COMPILER, ContextId::MAIN);
        ctx.bind(Command::new("exit", Noop).alias("back").alias("main")).unwrap();

        let by_name = ctx.resolve("exit").unwrap();
        let by_alias = ctx.resolve("main").unwrap();
        assert!(Arc::ptr_eq(by_name, by_alias));
        assert!(ctx.resolve("Exit").is_none());
    }

    #[test]
    fn duplicate_alias_leaves_first_binding() {
        let mut ctx = Context::new(ContextId::MAIN, ContextId::MAIN);
        ctx.bind(Command::new("jobs", Noop).help("list jobs", "")).unwrap();

        let err = ctx.bind(Command::new("tasks", Noop).alias("jobs")).unwrap_err();
        assert_matches!(err, ConsoleError::DuplicateCommand { ref name, .. } if name == "jobs");
        assert!(ctx.resolve("tasks").is_none());
        assert_eq!(ctx.resolve("jobs").unwrap().short_help(), "list jobs");
    }

    #[test]
    fn alias_colliding_with_own_name_is_rejected() {
        let mut ctx = Context::new(ContextId::MAIN, ContextId::MAIN);
        let err = ctx.bind(Command::new("exit", Noop).alias("exit")).unwrap_err();
        assert_matches!(err, ConsoleError::DuplicateCommand { .. });
        assert_eq!(ctx.commands().count(), 0);
    }

    #[test]
    fn long_help_falls_back_to_short() {
        let cmd = Command::new("info", Noop).help("show module", "");
        assert_eq!(cmd.long_help(), "show module");
        let exit = Command::new("exit", Noop).alias("back");
        let labels: Vec<&str> = exit.labels().collect();
        assert_eq!(labels, vec!["exit", "back"]);
    }
}
