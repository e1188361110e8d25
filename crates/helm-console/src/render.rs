//! Output contract between commands and the terminal.
//!
//! Commands never format output themselves; they hand typed results to a
//! [`Renderer`]. [`TextRenderer`] writes plain text, [`RecordingRenderer`]
//! keeps everything for assertions.

use std::io::{self, Write};

use helm_rpc::{JobListing, KillOutcome};
use parking_lot::Mutex;

/// Receives command results.
pub trait Renderer: Send + Sync {
    /// A job snapshot, or the explicit "no active jobs" state.
    fn jobs(&self, listing: &JobListing);
    /// Per-job kill outcomes, in the order they were attempted.
    fn kill_outcomes(&self, outcomes: &[KillOutcome]);
    /// An informational line.
    fn info(&self, message: &str);
    /// An error line.
    fn error(&self, message: &str);
}

/// Plain-text renderer over any writer.
pub struct TextRenderer {
    out: Mutex<Box<dyn Write + Send>>,
}

impl TextRenderer {
    /// Render into `out`.
    pub fn new(out: impl Write + Send + 'static) -> Self {
        Self {
            out: Mutex::new(Box::new(out)),
        }
    }

    /// Render to standard output.
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    fn write_lines(&self, lines: &[String]) {
        let mut out = self.out.lock();
        for line in lines {
            let _ = writeln!(out, "{line}");
        }
        let _ = out.flush();
    }
}

const JOB_HEADERS: [&str; 5] = ["ID", "Name", "Protocol", "Port", "Description"];

/// Format a job listing as aligned columns.
pub fn job_table(listing: &JobListing) -> Vec<String> {
    let JobListing::Active(jobs) = listing else {
        return vec!["No active jobs".to_string()];
    };

    let rows: Vec<[String; 5]> = jobs
        .values()
        .map(|job| {
            [
                job.id.to_string(),
                job.name.clone(),
                job.protocol.clone(),
                job.port.to_string(),
                job.description.clone(),
            ]
        })
        .collect();

    let mut widths = JOB_HEADERS.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let format_row = |cells: [&str; 5]| {
        let padded: Vec<String> = cells
            .iter()
            .zip(widths)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect();
        padded.join("  ").trim_end().to_string()
    };

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(format_row(JOB_HEADERS));
    lines.push(format_row(widths.map(|w| "-".repeat(w)).each_ref().map(String::as_str)));
    for row in &rows {
        lines.push(format_row(row.each_ref().map(String::as_str)));
    }
    lines
}

impl Renderer for TextRenderer {
    fn jobs(&self, listing: &JobListing) {
        self.write_lines(&job_table(listing));
    }

    fn kill_outcomes(&self, outcomes: &[KillOutcome]) {
        let lines: Vec<String> = outcomes
            .iter()
            .map(|outcome| {
                let mark = if outcome.success { "[+]" } else { "[-]" };
                format!("{mark} {}", outcome.message)
            })
            .collect();
        self.write_lines(&lines);
    }

    fn info(&self, message: &str) {
        self.write_lines(&[message.to_string()]);
    }

    fn error(&self, message: &str) {
        self.write_lines(&[format!("[!] {message}")]);
    }
}

/// One call made on a [`RecordingRenderer`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Rendered {
    /// [`Renderer::jobs`].
    Jobs(JobListing),
    /// [`Renderer::kill_outcomes`].
    Kills(Vec<KillOutcome>),
    /// [`Renderer::info`].
    Info(String),
    /// [`Renderer::error`].
    Error(String),
}

/// Renderer that keeps every call, for tests.
#[derive(Default)]
pub struct RecordingRenderer {
    calls: Mutex<Vec<Rendered>>,
}

impl RecordingRenderer {
    /// Empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything rendered so far.
    pub fn calls(&self) -> Vec<Rendered> {
        self.calls.lock().clone()
    }

    /// Everything rendered so far, clearing the record.
    pub fn take(&self) -> Vec<Rendered> {
        std::mem::take(&mut *self.calls.lock())
    }
}

impl Renderer for RecordingRenderer {
    fn jobs(&self, listing: &JobListing) {
        self.calls.lock().push(Rendered::Jobs(listing.clone()));
    }

    fn kill_outcomes(&self, outcomes: &[KillOutcome]) {
        self.calls.lock().push(Rendered::Kills(outcomes.to_vec()));
    }

    fn info(&self, message: &str) {
        self.calls.lock().push(Rendered::Info(message.to_string()));
    }

    fn error(&self, message: &str) {
        self.calls.lock().push(Rendered::Error(message.to_string()));
    }
}
