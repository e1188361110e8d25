//! Context navigation: `exit`, `back`, `use`, `compiler`, and `info`.

use async_trait::async_trait;
use tracing::info;

use crate::context::{Command, CommandHandler, ContextId, Invocation, Outcome};
use crate::errors::CommandError;

/// `exit` in Main: end the session.
pub fn exit_session() -> Command {
    Command::new("exit", Returns(Outcome::EndSession)).help("Exit the console", "")
}

/// `back` with alias `exit`: return to the parent context.
pub fn back() -> Command {
    Command::new("back", Returns(Outcome::Back))
        .alias("exit")
        .help("Return to the previous context", "")
}

/// Compiler's `exit` with aliases `back` and `main`.
pub fn leave_compiler() -> Command {
    Command::new("exit", Returns(Outcome::Back))
        .alias("back")
        .alias("main")
        .help("Leave the compiler and return to main", "")
}

/// `compiler`: enter the Compiler context.
pub fn compiler() -> Command {
    Command::new("compiler", Returns(Outcome::Enter(ContextId::COMPILER)))
        .help("Enter the compiler context", "")
}

/// `use <module>`: select a module and enter the Module context.
pub fn use_module() -> Command {
    Command::new("use", UseModule).help(
        "Select a module",
        "use <module>   record <module> as the current module and enter the module context",
    )
}

/// `info`: show the current module.
pub fn module_info() -> Command {
    Command::new("info", ModuleInfo).help("Show the current module", "")
}

struct Returns(Outcome);

#[async_trait]
impl CommandHandler for Returns {
    async fn run(&self, _invocation: Invocation<'_>) -> Result<Outcome, CommandError> {
        Ok(self.0)
    }
}

struct UseModule;

#[async_trait]
impl CommandHandler for UseModule {
    async fn run(&self, invocation: Invocation<'_>) -> Result<Outcome, CommandError> {
        let [module] = invocation.args else {
            return Err(CommandError::usage("usage: use <module>"));
        };
        info!(module = %module, "module selected");
        invocation.session.set_current_module(Some(module.clone()));
        Ok(Outcome::Enter(ContextId::MODULE))
    }
}

struct ModuleInfo;

#[async_trait]
impl CommandHandler for ModuleInfo {
    async fn run(&self, invocation: Invocation<'_>) -> Result<Outcome, CommandError> {
        let session = invocation.session;
        match session.current_module() {
            Some(module) => session.renderer().info(&format!("Module: {module}")),
            None => session.renderer().info("No module selected"),
        }
        Ok(Outcome::Stay)
    }
}
