//! Multipart encoding of one batch.
//!
//! Both encoders emit the same parts in the same order:
//!
//! ```text
//! <document field>    document bytes           (every batch)
//! <attachment field>  attachment[start]        \
//! ...                                          | the batch window
//! <attachment field>  attachment[end - 1]      /
//! *isIncomplete*      "yes"                    (only if end < len)
//! ```
//!
//! The structured encoder hands that part list to the transport's own
//! multipart builder. The manual encoder writes the boundary-delimited body
//! itself and supplies the matching `Content-Type` header.

use crate::error::Result;
use crate::submission::attachment::{Attachment, Document};
use crate::submission::mime;
use crate::submission::planner::BatchWindow;
use async_trait::async_trait;
use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI64, Ordering};

/// Field that tells the server more batches follow for this submission.
pub const INCOMPLETE_FIELD: &str = "*isIncomplete*";
pub const INCOMPLETE_VALUE: &str = "yes";

/// Prefix of manual boundaries; a millisecond timestamp is appended.
pub const BOUNDARY_PREFIX: &str = "------multipartformboundary";

const CRLF: &[u8] = b"\r\n";
const DASHDASH: &[u8] = b"--";

/// Form field names used for the document and its attachments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldNames {
    pub document: String,
    pub attachment: String,
}

impl Default for FieldNames {
    fn default() -> Self {
        Self {
            document: "xml_submission_file".to_string(),
            attachment: "mediaFiles".to_string(),
        }
    }
}

/// Body of a single form part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartBody {
    File {
        file_name: String,
        mime: &'static str,
        data: Bytes,
    },
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormPart {
    pub name: String,
    pub body: PartBody,
}

impl FormPart {
    pub fn is_incomplete_marker(&self) -> bool {
        self.name == INCOMPLETE_FIELD
    }
}

#[derive(Debug, Clone)]
pub enum Payload {
    /// Parts for the transport's native multipart builder.
    Structured(Vec<FormPart>),
    /// A complete `multipart/form-data` body.
    Raw(Bytes),
}

#[derive(Debug, Clone)]
pub struct EncodedPayload {
    pub payload: Payload,
    /// Header the request must carry; `None` when the transport owns the
    /// boundary.
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodingKind {
    Structured,
    Manual,
}

/// Encoding preference from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum EncodingChoice {
    /// Structured when the transport supports it, manual otherwise
    #[default]
    Auto,
    Structured,
    Manual,
}

impl EncodingChoice {
    pub fn resolve(self, structured_supported: bool) -> EncodingKind {
        match self {
            Self::Auto if structured_supported => EncodingKind::Structured,
            Self::Auto => EncodingKind::Manual,
            Self::Structured => EncodingKind::Structured,
            Self::Manual => EncodingKind::Manual,
        }
    }
}

#[async_trait]
pub trait PayloadEncoder: Send + Sync {
    fn kind(&self) -> EncodingKind;

    async fn encode(
        &self,
        document: &Document,
        attachments: &[Attachment],
        window: BatchWindow,
    ) -> Result<EncodedPayload>;
}

pub fn encoder_for(kind: EncodingKind, fields: FieldNames) -> Box<dyn PayloadEncoder> {
    match kind {
        EncodingKind::Structured => Box::new(StructuredEncoder::new(fields)),
        EncodingKind::Manual => Box::new(ManualEncoder::new(fields)),
    }
}

/// Read the document and the windowed attachments into ordered form parts.
/// Any unreadable file fails here, before a request exists.
pub async fn collect_parts(
    fields: &FieldNames,
    document: &Document,
    attachments: &[Attachment],
    window: BatchWindow,
) -> Result<Vec<FormPart>> {
    let mut parts = Vec::with_capacity(window.len() + 2);
    parts.push(file_part(&fields.document, document).await?);

    let end = window.end.min(attachments.len());
    for attachment in &attachments[window.start.min(end)..end] {
        parts.push(file_part(&fields.attachment, attachment).await?);
    }

    if window.is_partial(attachments.len()) {
        parts.push(FormPart {
            name: INCOMPLETE_FIELD.to_string(),
            body: PartBody::Text(INCOMPLETE_VALUE.to_string()),
        });
    }

    Ok(parts)
}

async fn file_part(field: &str, file: &Attachment) -> Result<FormPart> {
    Ok(FormPart {
        name: field.to_string(),
        body: PartBody::File {
            file_name: file.name().to_string(),
            mime: mime::mime_type(file.name()),
            data: file.read().await?,
        },
    })
}

// =============================================================================
// Structured
// =============================================================================

pub struct StructuredEncoder {
    fields: FieldNames,
}

impl StructuredEncoder {
    pub fn new(fields: FieldNames) -> Self {
        Self { fields }
    }
}

#[async_trait]
impl PayloadEncoder for StructuredEncoder {
    fn kind(&self) -> EncodingKind {
        EncodingKind::Structured
    }

    async fn encode(
        &self,
        document: &Document,
        attachments: &[Attachment],
        window: BatchWindow,
    ) -> Result<EncodedPayload> {
        let parts = collect_parts(&self.fields, document, attachments, window).await?;
        Ok(EncodedPayload {
            payload: Payload::Structured(parts),
            content_type: None,
        })
    }
}

// =============================================================================
// Manual
// =============================================================================

pub struct ManualEncoder {
    fields: FieldNames,
}

impl ManualEncoder {
    pub fn new(fields: FieldNames) -> Self {
        Self { fields }
    }

    /// Serialize parts under `boundary`.
    ///
    /// Layout: `\r\n--B` opens the body; each part is
    /// `\r\n<headers>\r\n\r\n<data>\r\n--B`; `--\r\n` closes it.
    pub fn write_body(boundary: &str, parts: &[FormPart]) -> Bytes {
        let capacity = parts
            .iter()
            .map(|p| match &p.body {
                PartBody::File { data, file_name, .. } => data.len() + file_name.len() + 128,
                PartBody::Text(text) => text.len() + 64,
            })
            .sum::<usize>()
            + boundary.len() * (parts.len() + 1)
            + 16;
        let mut buf = BytesMut::with_capacity(capacity);

        buf.put_slice(CRLF);
        buf.put_slice(DASHDASH);
        buf.put_slice(boundary.as_bytes());

        for part in parts {
            buf.put_slice(CRLF);
            buf.put_slice(b"Content-Disposition: form-data; name=\"");
            buf.put_slice(part.name.as_bytes());
            buf.put_u8(b'"');

            let data: &[u8] = match &part.body {
                PartBody::File {
                    file_name,
                    mime,
                    data,
                } => {
                    if !file_name.is_empty() {
                        buf.put_slice(b"; filename=\"");
                        buf.put_slice(file_name.as_bytes());
                        buf.put_u8(b'"');
                    }
                    buf.put_slice(CRLF);
                    buf.put_slice(b"Content-Type: ");
                    buf.put_slice(mime.as_bytes());
                    data
                }
                PartBody::Text(text) => text.as_bytes(),
            };

            buf.put_slice(CRLF);
            buf.put_slice(CRLF);
            buf.put_slice(data);

            buf.put_slice(CRLF);
            buf.put_slice(DASHDASH);
            buf.put_slice(boundary.as_bytes());
        }

        buf.put_slice(DASHDASH);
        buf.put_slice(CRLF);
        buf.freeze()
    }
}

/// A boundary token unique within this process, derived from the clock.
pub fn next_boundary() -> String {
    static LAST: AtomicI64 = AtomicI64::new(0);

    let now = chrono::Utc::now().timestamp_millis();
    let mut prev = LAST.load(Ordering::Relaxed);
    loop {
        let candidate = now.max(prev + 1);
        match LAST.compare_exchange_weak(prev, candidate, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => return format!("{BOUNDARY_PREFIX}{candidate}"),
            Err(actual) => prev = actual,
        }
    }
}

#[async_trait]
impl PayloadEncoder for ManualEncoder {
    fn kind(&self) -> EncodingKind {
        EncodingKind::Manual
    }

    async fn encode(
        &self,
        document: &Document,
        attachments: &[Attachment],
        window: BatchWindow,
    ) -> Result<EncodedPayload> {
        let parts = collect_parts(&self.fields, document, attachments, window).await?;
        let boundary = next_boundary();
        let body = Self::write_body(&boundary, &parts);

        Ok(EncodedPayload {
            payload: Payload::Raw(body),
            content_type: Some(format!("multipart/form-data; boundary={boundary}")),
        })
    }
}
