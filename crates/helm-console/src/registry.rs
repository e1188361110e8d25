//! Context registry: the rooted tree of contexts and their bindings.
//!
//! One registry is assembled at startup and then owned by the dispatcher.

use std::collections::HashMap;

use tracing::debug;

use crate::context::{Command, Context, ContextId};
use crate::errors::ConsoleError;

/// All contexts known to the console, rooted at [`ContextId::MAIN`].
pub struct ContextRegistry {
    contexts: HashMap<ContextId, Context>,
}

impl ContextRegistry {
    /// Registry holding only the Main context.
    pub fn new() -> Self {
        let mut contexts = HashMap::new();
        let _ = contexts.insert(ContextId::MAIN, Context::new(ContextId::MAIN, ContextId::MAIN));
        Self { contexts }
    }

    /// Register a context whose `back` target is `parent`.
    pub fn add_context(&mut self, id: ContextId, parent: ContextId) -> Result<(), ConsoleError> {
        if self.contexts.contains_key(&id) {
            return Err(ConsoleError::DuplicateContext { context: id });
        }
        if !self.contexts.contains_key(&parent) {
            return Err(ConsoleError::UnknownContext { context: parent });
        }
        let _ = self.contexts.insert(id, Context::new(id, parent));
        Ok(())
    }

    /// Bind `command` in `context`.
    ///
    /// Fails with [`ConsoleError::DuplicateCommand`] if the name or any alias
    /// already denotes a command there; the existing binding is untouched.
    pub fn bind(&mut self, context: ContextId, command: Command) -> Result<(), ConsoleError> {
        let ctx = self
            .contexts
            .get_mut(&context)
            .ok_or(ConsoleError::UnknownContext { context })?;
        let name = command.name.clone();
        ctx.bind(command)?;
        debug!(%context, command = %name, "bound command");
        Ok(())
    }

    /// Look up a context.
    pub fn context(&self, id: ContextId) -> Option<&Context> {
        self.contexts.get(&id)
    }

    /// Whether `id` is registered.
    pub fn contains(&self, id: ContextId) -> bool {
        self.contexts.contains_key(&id)
    }

    /// Registered context ids, sorted.
    pub fn ids(&self) -> Vec<ContextId> {
        let mut ids: Vec<ContextId> = self.contexts.keys().copied().collect();
        ids.sort();
        ids
    }
}

impl Default for ContextRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{CommandHandler, Invocation, Outcome};
    use crate::errors::CommandError;
    use assert_matches::assert_matches;
    use async_trait::async_trait;

    struct Noop;

    #[async_trait]
    impl CommandHandler for Noop {
        async fn run(&self, _invocation: Invocation<'_>) -> Result<Outcome, CommandError> {
            Ok(Outcome::Stay)
        }
    }

    #[test]
    fn main_is_its_own_parent() {
        let reg = ContextRegistry::new();
        let main = reg.context(ContextId::MAIN).unwrap();
        assert_eq!(main.parent(), ContextId::MAIN);
    }

    #[test]
    fn add_context_requires_known_parent() {
        let mut reg = ContextRegistry::new();
        reg.add_context(ContextId::MODULE, ContextId::MAIN).unwrap();
        assert_matches!(
            reg.add_context(ContextId::new("agent"), ContextId::new("nowhere")),
            Err(ConsoleError::UnknownContext { .. })
        );
        assert_matches!(
            reg.add_context(ContextId::MODULE, ContextId::MAIN),
            Err(ConsoleError::DuplicateContext { .. })
        );
        assert_eq!(reg.ids(), vec![ContextId::MAIN, ContextId::MODULE]);
    }

    #[test]
    fn same_name_in_different_contexts_is_allowed() {
        let mut reg = ContextRegistry::new();
        reg.add_context(ContextId::MODULE, ContextId::MAIN).unwrap();
        reg.bind(ContextId::MAIN, Command::new("jobs", Noop)).unwrap();
        reg.bind(ContextId::MODULE, Command::new("jobs", Noop)).unwrap();
    }

    #[test]
    fn duplicate_bind_rejected_first_intact() {
        let mut reg = ContextRegistry::new();
        reg.bind(ContextId::MAIN, Command::new("exit", Noop).help("end session", ""))
            .unwrap();

        let err = reg
            .bind(ContextId::MAIN, Command::new("exit", Noop).help("other", ""))
            .unwrap_err();
        assert_matches!(err, ConsoleError::DuplicateCommand { context: ContextId::MAIN, .. });

        let main = reg.context(ContextId::MAIN).unwrap();
        assert_eq!(main.resolve("exit").unwrap().short_help(), "end session");
    }

    #[test]
    fn bind_to_unknown_context_fails() {
        let mut reg = ContextRegistry::new();
        assert_matches!(
            reg.bind(ContextId::COMPILER, Command::new("exit", Noop)),
            Err(ConsoleError::UnknownContext { context: ContextId::COMPILER })
        );
    }
}
