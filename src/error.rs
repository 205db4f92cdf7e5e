use crate::submission::Phase;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SubmitError>;

/// Every variant is terminal for the session that raised it. Nothing is
/// retried; a caller that wants another attempt builds a new session,
/// optionally resuming from the last confirmed attachment index.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("Invalid batch plan: {0}")]
    Planning(String),

    #[error("Cannot encode '{name}': {reason}")]
    Encoding { name: String, reason: String },

    #[error("{} ({reason})", phase.failure_text())]
    Transport { phase: Phase, reason: String },

    #[error("Batch {sequence} rejected with status {status}: {message}")]
    ServerRejection {
        sequence: u32,
        status: u16,
        message: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Session already finished")]
    Finished,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SubmitError {
    pub fn encoding(name: impl Into<String>, reason: impl ToString) -> Self {
        Self::Encoding {
            name: name.into(),
            reason: reason.to_string(),
        }
    }

    /// Text shown to the user when a submission ends in failure.
    pub fn user_message(&self) -> String {
        match self {
            Self::Transport { phase, .. } => phase.failure_text().to_string(),
            Self::ServerRejection { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// Failures after which a new session resuming from the confirmed
    /// index can pick up the remaining attachments.
    pub fn is_resumable(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::ServerRejection { .. })
    }
}
