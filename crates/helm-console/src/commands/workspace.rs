//! `workspace list` and `workspace switch <name>`.

use async_trait::async_trait;
use tracing::info;

use crate::completion::DynamicProvider;
use crate::context::{Command, CommandHandler, Invocation, Outcome, Subcommand};
use crate::errors::CommandError;
use crate::session::Session;

const USAGE: &str = "usage: workspace [list | switch <name>]";

/// Build the `workspace` command.
pub fn command() -> Command {
    Command::new("workspace", WorkspaceHandler)
        .subcommand(Subcommand::new("list"))
        .subcommand(Subcommand::new("switch").with_provider(WorkspaceNames))
        .help(
            "List or switch workspaces",
            "workspace list           list workspaces known to the server\n\
             workspace switch <name>  make <name> the current workspace",
        )
}

struct WorkspaceHandler;

#[async_trait]
impl CommandHandler for WorkspaceHandler {
    async fn run(&self, invocation: Invocation<'_>) -> Result<Outcome, CommandError> {
        let session = invocation.session;
        match invocation.args {
            [] => list(session).await?,
            [sub] if sub == "list" => list(session).await?,
            [sub, name] if sub == "switch" => switch(session, name).await?,
            _ => return Err(CommandError::usage(USAGE)),
        }
        Ok(Outcome::Stay)
    }
}

async fn list(session: &Session) -> Result<(), CommandError> {
    let names = session.workspaces().list_workspaces().await?;
    if names.is_empty() {
        session.renderer().info("No workspaces");
        return Ok(());
    }
    let current = session.current_workspace();
    for name in names {
        let mark = if current.as_deref() == Some(name.as_str()) { "*" } else { " " };
        session.renderer().info(&format!("{mark} {name}"));
    }
    Ok(())
}

async fn switch(session: &Session, name: &str) -> Result<(), CommandError> {
    let names = session.workspaces().list_workspaces().await?;
    if !names.iter().any(|known| known == name) {
        return Err(CommandError::NotFound {
            message: format!("no workspace named '{name}'"),
        });
    }
    session.set_current_workspace(Some(name.to_owned()));
    info!(workspace = name, "workspace switched");
    session.renderer().info(&format!("Switched to workspace {name}"));
    Ok(())
}

/// Live workspace names, for completing `workspace switch`.
pub struct WorkspaceNames;

#[async_trait]
impl DynamicProvider for WorkspaceNames {
    async fn candidates(&self, session: &Session) -> Result<Vec<String>, CommandError> {
        Ok(session.workspaces().list_workspaces().await?)
    }
}
