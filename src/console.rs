//! Terminal rendering of submission progress.

use crate::error::SubmitError;
use crate::submission::{Completion, ProgressReporter, ProgressUpdate, SubmitSummary};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

const RUNNING_TEMPLATE: &str = "{bar:40.blue/white} {pos:>3}% {msg}";
const FAILED_TEMPLATE: &str = "{bar:40.red/white} {pos:>3}% {msg}";

fn style(template: &str) -> ProgressStyle {
    ProgressStyle::with_template(template).unwrap_or_else(|_| ProgressStyle::default_bar())
}

/// Progress bar: blue while running, red when the submission fails.
pub struct ConsoleReporter {
    bar: ProgressBar,
}

impl ConsoleReporter {
    pub fn new() -> Self {
        let bar = ProgressBar::new(100);
        bar.set_style(style(RUNNING_TEMPLATE));
        Self { bar }
    }

    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for ConsoleReporter {
    fn report(&self, update: &ProgressUpdate) {
        self.bar.set_position(u64::from(update.percent()));
        self.bar
            .set_message(format!("{}  {}", update.status_line(), update.names_line()));
    }

    fn finish(&self, completion: &Completion) {
        self.bar.set_position(u64::from(completion.percent()));
        match completion {
            Completion::Success { .. } => {
                self.bar.finish_with_message(format!(
                    "{}  all files",
                    completion.status_line().green().bold()
                ));
            }
            Completion::Failure { .. } => {
                self.bar.set_style(style(FAILED_TEMPLATE));
                self.bar
                    .abandon_with_message(completion.status_line().red().bold().to_string());
            }
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
enum JsonOutcome {
    Success {
        batches: u32,
        attachments: usize,
    },
    Failure {
        message: String,
        detail: String,
        /// Pass to `--resume-from` to continue.
        confirmed: usize,
    },
}

/// Machine-readable outcome for `--json`.
pub fn json_outcome(
    result: &std::result::Result<SubmitSummary, SubmitError>,
    confirmed: usize,
) -> serde_json::Result<String> {
    let outcome = match result {
        Ok(summary) => JsonOutcome::Success {
            batches: summary.batches,
            attachments: summary.attachments,
        },
        Err(err) => JsonOutcome::Failure {
            message: err.user_message(),
            detail: err.to_string(),
            confirmed,
        },
    };
    serde_json::to_string_pretty(&outcome)
}
