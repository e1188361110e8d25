//! Built-in commands and the default registry.
//!
//! | context | commands |
//! |---|---|
//! | main | `exit`, `help`, `jobs`, `use`, `compiler`, `workspace` |
//! | module | `back` (`exit`), `help`, `jobs`, `info` |
//! | compiler | `exit` (`back`, `main`), `help` |

pub mod help;
pub mod jobs;
pub mod navigation;
pub mod workspace;

use crate::context::ContextId;
use crate::errors::ConsoleError;
use crate::registry::ContextRegistry;

/// Assemble Main, Module, and Compiler with the built-in commands.
pub fn default_registry() -> Result<ContextRegistry, ConsoleError> {
    let mut reg = ContextRegistry::new();
    reg.add_context(ContextId::MODULE, ContextId::MAIN)?;
    reg.add_context(ContextId::COMPILER, ContextId::MAIN)?;

    reg.bind(ContextId::MAIN, navigation::exit_session())?;
    reg.bind(ContextId::MAIN, help::command())?;
    reg.bind(ContextId::MAIN, jobs::command())?;
    reg.bind(ContextId::MAIN, navigation::use_module())?;
    reg.bind(ContextId::MAIN, navigation::compiler())?;
    reg.bind(ContextId::MAIN, workspace::command())?;

    reg.bind(ContextId::MODULE, navigation::back())?;
    reg.bind(ContextId::MODULE, help::command())?;
    reg.bind(ContextId::MODULE, jobs::command())?;
    reg.bind(ContextId::MODULE, navigation::module_info())?;

    reg.bind(ContextId::COMPILER, navigation::leave_compiler())?;
    reg.bind(ContextId::COMPILER, help::command())?;

    Ok(reg)
}
