//! Chunked multipart submission.
//!
//! One document plus an ordered list of attachments is delivered as a
//! sequence of multipart POSTs, each kept under a size ceiling.
//!
//! # Architecture
//!
//! ```text
//! +-----------+     +-----------+     +-----------+     +-----------+
//! |  Planner  | --> |  Encoder  | --> |  Session  | --> | Transport |
//! | (window)  |     | (body)    |     | (states)  |     | (POST)    |
//! +-----------+     +-----------+     +-----------+     +-----------+
//!                                           |
//!                                           v
//!                                     +-----------+
//!                                     | Reporter  |
//!                                     +-----------+
//! ```
//!
//! Every batch repeats the document, carries the next run of attachments
//! that fits under the ceiling, and adds an `*isIncomplete*` field while
//! attachments remain. A `201 Created` moves the window forward; anything
//! else ends the submission.

pub mod attachment;
pub mod encoder;
pub mod mime;
pub mod planner;
pub mod progress;
pub mod session;

pub use attachment::{Attachment, ByteLength, Content, Document};
pub use encoder::{
    EncodedPayload, EncodingChoice, EncodingKind, FieldNames, FormPart, ManualEncoder, PartBody,
    Payload, PayloadEncoder, StructuredEncoder, INCOMPLETE_FIELD, INCOMPLETE_VALUE,
};
pub use planner::{plan_batch, BatchPlanner, BatchWindow, DEFAULT_CEILING};
pub use progress::{
    extract_failure_message, BatchStatus, Completion, ProgressReporter, ProgressUpdate,
    TracingReporter,
};
pub use session::{
    Phase, SessionEvent, SessionOptions, SubmitSummary, TransferSession, TransferState,
    Transition, STATUS_CREATED,
};
