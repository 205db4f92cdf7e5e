//! Transfer session: drives one submission batch by batch.
//!
//! ```text
//!   Unsent --> Opened --> Sent --> HeadersReceived --> Done
//!     |          |          |             |
//!     +----------+----------+-------------+--> Done (transport failure)
//! ```
//!
//! A `201` on the final batch ends in `Done` with success; a `201` on any
//! other batch resets the phase to `Unsent` for the next one. Exactly one
//! request is in flight at a time.

use crate::error::{Result, SubmitError};
use crate::submission::attachment::{Attachment, Document};
use crate::submission::encoder::{encoder_for, EncodingChoice, FieldNames, PayloadEncoder};
use crate::submission::planner::{BatchPlanner, BatchWindow};
use crate::submission::progress::{
    extract_failure_message, BatchStatus, Completion, ProgressReporter, ProgressUpdate,
};
use crate::transport::{BatchRequest, BatchResponse, Transport};
use serde::Serialize;

/// Status code that accepts a batch.
pub const STATUS_CREATED: u16 = 201;

/// Request lifecycle of the current batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Unsent,
    Opened,
    Sent,
    HeadersReceived,
    Done,
}

impl Phase {
    /// What went wrong when a request dies in this phase.
    pub fn failure_text(&self) -> &'static str {
        match self {
            Self::Unsent | Self::Opened => "failed to establish connection to server",
            Self::Sent => "failed during transmission of data to server",
            Self::HeadersReceived | Self::Done => "failed to receive a response from the server",
        }
    }

    fn status(&self) -> BatchStatus {
        match self {
            Self::Unsent => BatchStatus::Initializing,
            Self::Opened => BatchStatus::ConnectionEstablished,
            Self::Sent => BatchStatus::RequestSent,
            Self::HeadersReceived => BatchStatus::AwaitingResponse,
            Self::Done => BatchStatus::Successful,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TransferState {
    pub sequence: u32,
    pub phase: Phase,
    pub window: BatchWindow,
}

/// Something the transport observed about the current request.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    Phase(Phase),
    Response(BatchResponse),
    TransportFailed(String),
}

/// What the session does after an event.
#[derive(Debug)]
pub enum Transition {
    /// Keep waiting on the current request.
    Waiting,
    /// The batch was accepted and another one is due.
    NextBatch,
    Completed,
    Failed(SubmitError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmitSummary {
    pub batches: u32,
    pub attachments: usize,
}

/// Settings a session is built from.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub target: String,
    pub headers: Vec<(String, String)>,
    pub planner: BatchPlanner,
    pub encoding: EncodingChoice,
    pub fields: FieldNames,
    /// First attachment to send; non-zero when resuming a failed submission.
    pub start_index: usize,
}

impl SessionOptions {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            headers: Vec::new(),
            planner: BatchPlanner::default(),
            encoding: EncodingChoice::Auto,
            fields: FieldNames::default(),
            start_index: 0,
        }
    }

    /// Start at `index`, typically [`TransferSession::confirmed`] of a
    /// session that failed.
    pub fn resume_from(mut self, index: usize) -> Self {
        self.start_index = index;
        self
    }
}

pub struct TransferSession<'a> {
    target: String,
    headers: Vec<(String, String)>,
    document: &'a Document,
    attachments: &'a [Attachment],
    planner: BatchPlanner,
    encoder: Box<dyn PayloadEncoder>,
    transport: &'a dyn Transport,
    reporter: &'a dyn ProgressReporter,
    state: TransferState,
}

impl<'a> TransferSession<'a> {
    /// The encoder is picked here, once, from the configured preference and
    /// the transport's capabilities.
    pub fn new(
        options: SessionOptions,
        document: &'a Document,
        attachments: &'a [Attachment],
        transport: &'a dyn Transport,
        reporter: &'a dyn ProgressReporter,
    ) -> Result<Self> {
        if options.start_index > attachments.len() {
            return Err(SubmitError::Planning(format!(
                "start index {} is past the last attachment ({})",
                options.start_index,
                attachments.len()
            )));
        }

        let kind = options
            .encoding
            .resolve(transport.supports_structured_multipart());
        let encoder = encoder_for(kind, options.fields);
        let window = options
            .planner
            .window(document, attachments, options.start_index);

        tracing::debug!(
            "Session for {} using {:?} encoding, first window {:?}",
            options.target,
            kind,
            window
        );

        Ok(Self {
            target: options.target,
            headers: options.headers,
            document,
            attachments,
            planner: options.planner,
            encoder,
            transport,
            reporter,
            state: TransferState {
                sequence: 1,
                phase: Phase::Unsent,
                window,
            },
        })
    }

    pub fn state(&self) -> &TransferState {
        &self.state
    }

    /// Attachments the server has acknowledged; resume from here.
    pub fn confirmed(&self) -> usize {
        self.state.window.start
    }

    pub fn encoder_kind(&self) -> crate::submission::encoder::EncodingKind {
        self.encoder.kind()
    }

    /// Apply one event to the state.
    pub fn transition(&mut self, event: SessionEvent) -> Transition {
        if self.state.phase == Phase::Done {
            return Transition::Failed(SubmitError::Finished);
        }

        match event {
            SessionEvent::Phase(phase) => {
                if phase > self.state.phase && phase != Phase::Done {
                    self.state.phase = phase;
                    self.report(phase.status());
                }
                Transition::Waiting
            }
            SessionEvent::Response(response) if response.status == STATUS_CREATED => {
                self.report(BatchStatus::Successful);

                let start = self.state.window.end;
                self.state.window = self.planner.window(self.document, self.attachments, start);
                self.state.sequence += 1;

                if self.state.window.is_empty() {
                    self.state.phase = Phase::Done;
                    Transition::Completed
                } else {
                    self.state.phase = Phase::Unsent;
                    Transition::NextBatch
                }
            }
            SessionEvent::Response(response) => {
                self.report(BatchStatus::Failed);
                self.state.phase = Phase::Done;

                // An empty page leaves the request in the awaiting-response
                // phase as far as the user is concerned.
                let message = if response.body.is_empty() {
                    Phase::HeadersReceived.failure_text().to_string()
                } else {
                    extract_failure_message(&response.body).to_string()
                };
                Transition::Failed(SubmitError::ServerRejection {
                    sequence: self.state.sequence,
                    status: response.status,
                    message,
                })
            }
            SessionEvent::TransportFailed(reason) => {
                let phase = self.state.phase;
                self.report(BatchStatus::Failed);
                self.state.phase = Phase::Done;
                Transition::Failed(SubmitError::Transport { phase, reason })
            }
        }
    }

    /// Encode and send the current window, feeding everything the transport
    /// reports through [`Self::transition`].
    pub async fn submit_batch(&mut self) -> Transition {
        let window = self.state.window;
        let payload = match self
            .encoder
            .encode(self.document, self.attachments, window)
            .await
        {
            Ok(payload) => payload,
            Err(e) => {
                self.state.phase = Phase::Done;
                return Transition::Failed(e);
            }
        };

        self.report(BatchStatus::Beginning);
        tracing::info!(
            "POST({}) attachments {}..{} of {}",
            self.state.sequence,
            window.start,
            window.end,
            self.attachments.len()
        );

        let transport = self.transport;
        let url = self.target.clone();
        let headers = self.headers.clone();
        let request = BatchRequest {
            url: &url,
            headers: &headers,
            payload,
        };
        let result = transport
            .post(request, &mut |phase| {
                self.transition(SessionEvent::Phase(phase));
            })
            .await;

        match result {
            Ok(response) => self.transition(SessionEvent::Response(response)),
            Err(e) => {
                tracing::warn!("POST({}) transport error: {:#}", self.state.sequence, e);
                self.transition(SessionEvent::TransportFailed(format!("{:#}", e)))
            }
        }
    }

    /// Run batches until every attachment is delivered or one fails.
    pub async fn run(&mut self) -> Result<SubmitSummary> {
        if self.state.phase == Phase::Done {
            return Err(SubmitError::Finished);
        }

        let first_sequence = self.state.sequence;
        let first_start = self.state.window.start;
        loop {
            match self.submit_batch().await {
                Transition::NextBatch | Transition::Waiting => continue,
                Transition::Completed => {
                    let summary = SubmitSummary {
                        batches: self.state.sequence - first_sequence,
                        attachments: self.attachments.len() - first_start,
                    };
                    self.reporter.finish(&Completion::Success {
                        batches: summary.batches,
                        attachments: summary.attachments,
                    });
                    return Ok(summary);
                }
                Transition::Failed(err) => {
                    self.reporter.finish(&Completion::Failure {
                        message: err.user_message(),
                        confirmed: self.confirmed(),
                    });
                    return Err(err);
                }
            }
        }
    }

    fn report(&self, status: BatchStatus) {
        let window = self.state.window;
        let batch = &self.attachments[window.start..window.end];
        let first_name = batch.first().map(|a| a.name().to_string());
        let last_name = if batch.len() > 1 {
            batch.last().map(|a| a.name().to_string())
        } else {
            None
        };

        self.reporter.report(&ProgressUpdate {
            sequence: self.state.sequence,
            status,
            first_name,
            last_name,
            completed: window.start,
            total: self.attachments.len(),
        });
    }
}
