//! `help` and `help <command>`.

use async_trait::async_trait;

use crate::context::{Command, CommandHandler, Invocation, Outcome};
use crate::errors::CommandError;

/// Build the `help` command.
pub fn command() -> Command {
    Command::new("help", Help).help(
        "List commands, or show help for one",
        "help             list the commands of the current context\n\
         help <command>   show detailed help for <command>",
    )
}

struct Help;

#[async_trait]
impl CommandHandler for Help {
    async fn run(&self, invocation: Invocation<'_>) -> Result<Outcome, CommandError> {
        let renderer = invocation.session.renderer();
        match invocation.args {
            [] => {
                let width = invocation
                    .context
                    .commands()
                    .map(|cmd| cmd.name().len())
                    .max()
                    .unwrap_or(0);
                for cmd in invocation.context.commands() {
                    let mut line = format!("{:<width$}  {}", cmd.name(), cmd.short_help());
                    if !cmd.aliases().is_empty() {
                        line.push_str(&format!(" (aliases: {})", cmd.aliases().join(", ")));
                    }
                    renderer.info(line.trim_end());
                }
            }
            [name] => {
                let cmd = invocation.context.resolve(name).ok_or_else(|| CommandError::NotFound {
                    message: format!("no help for unknown command '{name}'"),
                })?;
                renderer.info(cmd.long_help());
                let subs: Vec<&str> = cmd.subcommands().iter().map(|sub| sub.name()).collect();
                if !subs.is_empty() {
                    renderer.info(&format!("subcommands: {}", subs.join(", ")));
                }
            }
            _ => return Err(CommandError::usage("usage: help [command]")),
        }
        Ok(Outcome::Stay)
    }
}
