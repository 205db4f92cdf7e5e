//! Files taking part in a submission.
//!
//! An [`Attachment`] is enumerated once (name + length) and read lazily when
//! the batch containing it is encoded. The session only ever borrows the
//! caller's list.

use crate::error::{Result, SubmitError};
use bytes::Bytes;
use std::path::{Path, PathBuf};

/// Where an attachment's bytes come from.
#[derive(Debug, Clone)]
pub enum Content {
    File(PathBuf),
    Memory(Bytes),
}

/// A named binary blob with a known length.
#[derive(Debug, Clone)]
pub struct Attachment {
    name: String,
    len: u64,
    content: Content,
}

/// The primary file of a submission has the same shape as an attachment.
pub type Document = Attachment;

/// Anything the batch planner can measure.
pub trait ByteLength {
    fn byte_len(&self) -> u64;
}

impl ByteLength for Attachment {
    fn byte_len(&self) -> u64 {
        self.len
    }
}

impl ByteLength for u64 {
    fn byte_len(&self) -> u64 {
        *self
    }
}

impl Attachment {
    /// Enumerate a file on disk. Its length is captured now; a file that
    /// changes size before it is sent is reported as an encoding error.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let meta = tokio::fs::metadata(path)
            .await
            .map_err(|e| SubmitError::encoding(path.display().to_string(), e))?;
        if !meta.is_file() {
            return Err(SubmitError::encoding(
                path.display().to_string(),
                "not a regular file",
            ));
        }

        Ok(Self {
            name,
            len: meta.len(),
            content: Content::File(path.to_path_buf()),
        })
    }

    pub fn from_bytes(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        let data = data.into();
        Self {
            name: name.into(),
            len: data.len() as u64,
            content: Content::Memory(data),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn content(&self) -> &Content {
        &self.content
    }

    /// Load the full content for encoding.
    pub async fn read(&self) -> Result<Bytes> {
        let data = match &self.content {
            Content::Memory(bytes) => bytes.clone(),
            Content::File(path) => tokio::fs::read(path)
                .await
                .map(Bytes::from)
                .map_err(|e| SubmitError::encoding(&self.name, e))?,
        };

        if data.len() as u64 != self.len {
            return Err(SubmitError::encoding(
                &self.name,
                format!(
                    "length changed since it was enumerated ({} -> {} bytes)",
                    self.len,
                    data.len()
                ),
            ));
        }

        Ok(data)
    }
}
