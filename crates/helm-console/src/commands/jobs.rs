//! `jobs`: list, kill, and kill-all server-side jobs.

use async_trait::async_trait;
use helm_rpc::{JobId, JobListing, KillOutcome};
use tracing::debug;

use crate::completion::DynamicProvider;
use crate::context::{Command, CommandHandler, Invocation, Outcome, Subcommand};
use crate::errors::CommandError;
use crate::session::Session;

const USAGE: &str = "usage: jobs [kill <id>... | kill-all]";

/// Build the `jobs` command.
pub fn command() -> Command {
    Command::new("jobs", JobsHandler)
        .subcommand(Subcommand::new("kill").with_provider(JobIds))
        .subcommand(Subcommand::new("kill-all"))
        .help(
            "List, kill, or kill all active jobs",
            "jobs              list active jobs\n\
             jobs kill <id>... kill one or more jobs by id\n\
             jobs kill-all     kill every active job",
        )
}

struct JobsHandler;

#[async_trait]
impl CommandHandler for JobsHandler {
    async fn run(&self, invocation: Invocation<'_>) -> Result<Outcome, CommandError> {
        let session = invocation.session;
        match invocation.args.split_first() {
            None => list(session).await?,
            Some((sub, ids)) if sub == "kill" => kill(session, ids).await,
            Some((sub, rest)) if sub == "kill-all" && rest.is_empty() => kill_all(session).await?,
            Some(_) => return Err(CommandError::usage(USAGE)),
        }
        Ok(Outcome::Stay)
    }
}

async fn list(session: &Session) -> Result<(), CommandError> {
    let listing = session.jobs().list_jobs().await?;
    session.renderer().jobs(&listing);
    Ok(())
}

async fn kill(session: &Session, raw_ids: &[String]) {
    if raw_ids.is_empty() {
        session.renderer().info("Provide one or more Job IDs");
        return;
    }

    let mut outcomes = Vec::with_capacity(raw_ids.len());
    for raw in raw_ids {
        match raw.parse::<JobId>() {
            Ok(id) => outcomes.push(session.jobs().kill_job(id).await),
            Err(_) => {
                debug!(raw = %raw, "rejecting non-numeric job id");
                session.renderer().error(&format!("Invalid job ID: {raw}"));
            }
        }
    }
    if !outcomes.is_empty() {
        session.renderer().kill_outcomes(&outcomes);
    }
}

async fn kill_all(session: &Session) -> Result<(), CommandError> {
    let outcomes: Vec<KillOutcome> = session.jobs().kill_all_jobs().await?;
    if outcomes.is_empty() {
        session.renderer().jobs(&JobListing::NoActiveJobs);
    } else {
        session.renderer().kill_outcomes(&outcomes);
    }
    Ok(())
}

/// Live job ids, for completing `jobs kill`.
pub struct JobIds;

#[async_trait]
impl DynamicProvider for JobIds {
    async fn candidates(&self, session: &Session) -> Result<Vec<String>, CommandError> {
        let listing = session.jobs().list_jobs().await?;
        Ok(listing.ids().iter().map(ToString::to_string).collect())
    }
}
