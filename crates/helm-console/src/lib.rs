//! # helm-console
//!
//! Context-sensitive command routing for the Helm operator console.
//!
//! - [`registry`]: contexts (Main, Module, Compiler, ...) and their bindings
//! - [`dispatcher`]: runs one line in the active context and applies the
//!   transition the handler asks for
//! - [`completion`]: per-context completion trees with live candidates
//! - [`commands`]: built-in commands and [`commands::default_registry`]
//! - [`session`]: server clients and operator selections handed to handlers
//! - [`render`]: the output contract
//! - [`shell`]: the prompt/read/dispatch loop

#![deny(unsafe_code)]

pub mod commands;
pub mod completion;
pub mod context;
pub mod dispatcher;
pub mod errors;
pub mod registry;
pub mod render;
pub mod session;
pub mod shell;

pub use completion::{CompletionEngine, CompletionNode, DynamicProvider, build_tree};
pub use context::{Command, CommandHandler, Context, ContextId, Invocation, Outcome, Subcommand};
pub use dispatcher::Dispatcher;
pub use errors::{CommandError, ConsoleError};
pub use registry::ContextRegistry;
pub use render::{RecordingRenderer, Rendered, Renderer, TextRenderer};
pub use session::Session;
pub use shell::Shell;
