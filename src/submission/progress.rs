//! Progress events emitted by a transfer session.
//!
//! The session never renders anything itself. It hands a [`ProgressUpdate`]
//! to a [`ProgressReporter`] on every phase change and a [`Completion`] once
//! the submission ends.

use serde::Serialize;

/// Stage of the current batch as shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Beginning,
    Initializing,
    ConnectionEstablished,
    RequestSent,
    AwaitingResponse,
    Successful,
    Failed,
}

impl BatchStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Beginning => "beginning",
            Self::Initializing => "initializing",
            Self::ConnectionEstablished => "connection established",
            Self::RequestSent => "request sent",
            Self::AwaitingResponse => "awaiting response",
            Self::Successful => "successful",
            Self::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressUpdate {
    pub sequence: u32,
    pub status: BatchStatus,
    /// First attachment in the batch, if any.
    pub first_name: Option<String>,
    /// Last attachment in the batch, only when it holds more than one.
    pub last_name: Option<String>,
    /// Attachments confirmed before this batch.
    pub completed: usize,
    pub total: usize,
}

impl ProgressUpdate {
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }

    /// Completion rounded up to a whole percent.
    pub fn percent(&self) -> u8 {
        percent_ceil(self.completed, self.total)
    }

    pub fn status_line(&self) -> String {
        format!("POST({}) {}", self.sequence, self.status.label())
    }

    pub fn names_line(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (None, _) => "Uploading document".to_string(),
            (Some(first), None) => format!("Uploading document + {first}"),
            (Some(first), Some(last)) => format!("Uploading document + {first} ... {last}"),
        }
    }
}

/// How the submission ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Completion {
    Success { batches: u32, attachments: usize },
    Failure { message: String, confirmed: usize },
}

impl Completion {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Terminal states always render as a full bar.
    pub fn percent(&self) -> u8 {
        100
    }

    pub fn status_line(&self) -> &str {
        match self {
            Self::Success { .. } => "success!",
            Self::Failure { message, .. } => message,
        }
    }
}

pub trait ProgressReporter: Send + Sync {
    fn report(&self, update: &ProgressUpdate);

    fn finish(&self, completion: &Completion);
}

/// Reporter that only logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ProgressReporter for TracingReporter {
    fn report(&self, update: &ProgressUpdate) {
        tracing::debug!(
            "{} [{}%] {}",
            update.status_line(),
            update.percent(),
            update.names_line()
        );
    }

    fn finish(&self, completion: &Completion) {
        match completion {
            Completion::Success { batches, .. } => {
                tracing::info!("Submission complete after {} batch(es)", batches)
            }
            Completion::Failure { message, .. } => tracing::warn!("Submission failed: {}", message),
        }
    }
}

/// `ceil(completed / total * 100)` without floating point; 0 when empty.
pub fn percent_ceil(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let completed = completed.min(total) as u64;
    let total = total as u64;
    ((completed * 100).div_ceil(total)) as u8
}

/// Human-readable part of a server error page.
///
/// Takes the text between the `>` closing the first `<body` tag and the
/// last `</body>`. Without a closing tag the rest of the page is used.
/// Without an opening tag the text starts after the first `>`, or at the
/// beginning when there is none.
pub fn extract_failure_message(response: &str) -> &str {
    let from = response.find("<body").map_or(0, |open| open + 1);
    let start = response[from..].find('>').map_or(0, |gt| from + gt + 1);
    let end = response.rfind("</body>").unwrap_or(response.len());
    if end < start {
        return "";
    }
    &response[start..end]
}
