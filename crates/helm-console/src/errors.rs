//! Console error types.

use helm_rpc::RpcError;

use crate::context::ContextId;

// ── Error code constants ────────────────────────────────────────────

/// A name or alias is already bound in the context.
pub const DUPLICATE_COMMAND: &str = "DUPLICATE_COMMAND";
/// A context id was registered twice.
pub const DUPLICATE_CONTEXT: &str = "DUPLICATE_CONTEXT";
/// The first token names no command in the active context.
pub const UNKNOWN_COMMAND: &str = "UNKNOWN_COMMAND";
/// A context id is not registered.
pub const UNKNOWN_CONTEXT: &str = "UNKNOWN_CONTEXT";
/// The session already ended.
pub const SESSION_ENDED: &str = "SESSION_ENDED";
/// Wrong or missing command arguments.
pub const INVALID_ARGUMENTS: &str = "INVALID_ARGUMENTS";
/// A named entity does not exist on the server.
pub const NOT_FOUND: &str = "NOT_FOUND";

/// Registry and dispatcher errors. None of them end the console.
#[derive(Debug, thiserror::Error)]
pub enum ConsoleError {
    /// Bind-time collision; the existing binding is untouched.
    #[error("command '{name}' is already bound in context {context}")]
    DuplicateCommand {
        /// Context the bind targeted.
        context: ContextId,
        /// Colliding name or alias.
        name: String,
    },

    /// The context was already registered.
    #[error("context {context} is already registered")]
    DuplicateContext {
        /// Colliding context.
        context: ContextId,
    },

    /// No command named `token` in the active context.
    #[error("unknown command: {token}")]
    UnknownCommand {
        /// Token as typed.
        token: String,
    },

    /// A bind or transition named a context that does not exist.
    #[error("unknown context: {context}")]
    UnknownContext {
        /// Missing context.
        context: ContextId,
    },

    /// Input arrived after the session ended.
    #[error("session has ended")]
    SessionEnded,

    /// A handler failed.
    #[error("{command}: {source}")]
    Command {
        /// Primary name of the command that failed.
        command: String,
        /// Handler error.
        #[source]
        source: CommandError,
    },
}

impl ConsoleError {
    /// Machine-readable error code for this variant.
    pub fn code(&self) -> &'static str {
        match self {
            Self::DuplicateCommand { .. } => DUPLICATE_COMMAND,
            Self::DuplicateContext { .. } => DUPLICATE_CONTEXT,
            Self::UnknownCommand { .. } => UNKNOWN_COMMAND,
            Self::UnknownContext { .. } => UNKNOWN_CONTEXT,
            Self::SessionEnded => SESSION_ENDED,
            Self::Command { source, .. } => source.code(),
        }
    }
}

/// Error returned by a command handler or completion provider.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// Arguments did not fit the command's usage.
    #[error("{usage}")]
    Usage {
        /// Usage text shown to the operator.
        usage: String,
    },

    /// A named entity the command needs does not exist.
    #[error("{message}")]
    NotFound {
        /// What was missing.
        message: String,
    },

    /// The server call failed.
    #[error(transparent)]
    Rpc(#[from] RpcError),
}

impl CommandError {
    /// Usage error with the given text.
    pub fn usage(usage: impl Into<String>) -> Self {
        Self::Usage {
            usage: usage.into(),
        }
    }

    /// Machine-readable error code for this variant.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Usage { .. } => INVALID_ARGUMENTS,
            Self::NotFound { .. } => NOT_FOUND,
            Self::Rpc(err) => err.code(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_error_code_passes_through() {
        let err = ConsoleError::Command {
            command: "jobs".into(),
            source: CommandError::Rpc(RpcError::Disconnected),
        };
        assert_eq!(err.code(), helm_rpc::errors::DISCONNECTED);
        assert_eq!(err.to_string(), "jobs: connection to server lost");
    }

    #[test]
    fn unknown_command_names_token() {
        let err = ConsoleError::UnknownCommand {
            token: "jbos".into(),
        };
        assert_eq!(err.to_string(), "unknown command: jbos");
        assert_eq!(err.code(), UNKNOWN_COMMAND);
    }

    #[test]
    fn duplicate_command_names_context() {
        let err = ConsoleError::DuplicateCommand {
            context: ContextId::MAIN,
            name: "exit".into(),
        };
        assert_eq!(err.to_string(), "command 'exit' is already bound in context main");
    }

    #[test]
    fn usage_displays_text() {
        assert_eq!(CommandError::usage("use <module>").to_string(), "use <module>");
        assert_eq!(CommandError::usage("x").code(), INVALID_ARGUMENTS);
    }
}
