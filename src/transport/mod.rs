//! Transports carry one encoded batch to the server and report how far the
//! request got.
//!
//! A transport never retries and never interprets the status code; the
//! session decides what a response means.

pub mod http;

use crate::submission::encoder::EncodedPayload;
use crate::submission::Phase;
use async_trait::async_trait;

pub use http::HttpTransport;

/// One POST request for one batch.
#[derive(Debug, Clone)]
pub struct BatchRequest<'a> {
    pub url: &'a str,
    /// Caller-supplied headers, sent verbatim (cookies and the like).
    pub headers: &'a [(String, String)],
    pub payload: EncodedPayload,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchResponse {
    pub status: u16,
    pub body: String,
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Whether the transport can build multipart bodies from form parts.
    fn supports_structured_multipart(&self) -> bool;

    /// Send the request, calling `on_phase` as the request moves through
    /// `Opened`, `Sent` and `HeadersReceived`.
    ///
    /// An `Err` means no complete response arrived; the caller attributes it
    /// to the last phase reported.
    async fn post(
        &self,
        request: BatchRequest<'_>,
        on_phase: &mut (dyn FnMut(Phase) + Send),
    ) -> anyhow::Result<BatchResponse>;
}
