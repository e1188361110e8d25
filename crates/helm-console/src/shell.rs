//! Line loop: prompt, read, dispatch, report, repeat.

use helm_settings::ConsoleSettings;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

use crate::dispatcher::Dispatcher;
use crate::errors::ConsoleError;
use crate::session::Session;

/// Drives a [`Dispatcher`] from a line-oriented input.
///
/// Errors are reported through the session's renderer and the loop keeps
/// going. It stops at end of input or when the session ends.
pub struct Shell {
    dispatcher: Dispatcher,
    session: Session,
    prompt: String,
    completion_suffix: String,
}

impl Shell {
    /// Shell over an assembled dispatcher and session.
    pub fn new(dispatcher: Dispatcher, session: Session, settings: &ConsoleSettings) -> Self {
        Self {
            dispatcher,
            session,
            prompt: settings.prompt.clone(),
            completion_suffix: settings.completion_suffix.clone(),
        }
    }

    /// The dispatcher.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// The session.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Prompt for the active context, e.g. `helm [module] > `.
    pub fn prompt(&self) -> String {
        match self.dispatcher.active() {
            Some(ctx) => format!("{} [{ctx}] > ", self.prompt),
            None => format!("{} > ", self.prompt),
        }
    }

    /// Handle one line; returns `false` once the session has ended.
    ///
    /// A line ending with the completion suffix prints the candidates for
    /// the text before it instead of running anything.
    pub async fn handle_line<W>(&mut self, line: &str, output: &mut W) -> std::io::Result<bool>
    where
        W: AsyncWrite + Unpin,
    {
        if let Some(prefix) = line.trim_end().strip_suffix(self.completion_suffix.as_str()) {
            let candidates = self
                .dispatcher
                .completion()
                .complete(prefix, &self.session)
                .await;
            debug!(prefix, count = candidates.len(), "completion query");
            output.write_all(candidates.join("  ").as_bytes()).await?;
            output.write_all(b"\n").await?;
            return Ok(true);
        }

        match self.dispatcher.dispatch(line, &self.session).await {
            Ok(()) => {}
            Err(ConsoleError::SessionEnded) => return Ok(false),
            Err(err) => {
                warn!(code = err.code(), error = %err, "command failed");
                self.session.renderer().error(&err.to_string());
            }
        }
        Ok(!self.dispatcher.is_ended())
    }

    /// Read lines from `input` until end of input or the session ends.
    pub async fn run<R, W>(&mut self, input: R, mut output: W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = input.lines();
        loop {
            output.write_all(self.prompt().as_bytes()).await?;
            output.flush().await?;

            let Some(line) = lines.next_line().await? else {
                debug!("end of input");
                break;
            };
            if !self.handle_line(&line, &mut output).await? {
                break;
            }
        }
        output.flush().await
    }
}
