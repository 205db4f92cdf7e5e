//! batchpost - chunked multipart submission client.
//!
//! Uploads one document and its attachments as a sequence of size-bounded
//! multipart POSTs, marking every batch but the last as incomplete.

pub mod cli;
pub mod config;
pub mod console;
pub mod error;
pub mod submission;
pub mod transport;

pub use error::{Result, SubmitError};
