//! HTTP transport backed by `reqwest`.
//!
//! reqwest does not expose socket events, so request bodies are handed to it
//! as tracked streams. The first piece taken reports `Sent`; the last piece
//! of the last tracked body reports `HeadersReceived`.

use super::{BatchRequest, BatchResponse, Transport};
use crate::submission::encoder::{FormPart, PartBody, Payload};
use crate::submission::Phase;
use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Size of the pieces a tracked body is handed over in.
const BODY_CHUNK: usize = 64 * 1024;

pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// `timeout` bounds a whole request; `None` leaves it to the OS.
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("Failed to build HTTP client")?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

pub fn header_map(headers: &[(String, String)]) -> Result<HeaderMap> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .with_context(|| format!("Invalid header name '{}'", name))?;
        let value = HeaderValue::from_str(value)
            .with_context(|| format!("Invalid value for header '{}'", name))?;
        map.append(name, value);
    }
    Ok(map)
}

/// Caller headers for a multipart request. The encoding owns
/// `Content-Type`, so a caller-supplied one is dropped.
fn request_headers(headers: &[(String, String)]) -> Result<HeaderMap> {
    let mut map = header_map(headers)?;
    if map.remove(CONTENT_TYPE).is_some() {
        tracing::debug!("Dropping caller Content-Type in favour of the multipart one");
    }
    Ok(map)
}

/// Turns body progress into phase reports on a channel.
#[derive(Clone)]
struct BodyTracker {
    phases: mpsc::UnboundedSender<Phase>,
    pending: Arc<AtomicUsize>,
}

impl BodyTracker {
    /// `bodies` is how many tracked bodies make up the request.
    fn new(phases: mpsc::UnboundedSender<Phase>, bodies: usize) -> Self {
        Self {
            phases,
            pending: Arc::new(AtomicUsize::new(bodies)),
        }
    }

    fn started(&self) {
        let _ = self.phases.send(Phase::Sent);
    }

    fn finished(&self) {
        if self.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            let _ = self.phases.send(Phase::HeadersReceived);
        }
    }

    fn stream(
        &self,
        data: Bytes,
    ) -> impl Stream<Item = std::result::Result<Bytes, std::io::Error>> + Send + 'static {
        let initial: Option<(Bytes, BodyTracker, bool)> = Some((data, self.clone(), false));
        futures::stream::unfold(initial, |state| async move {
            let Some((mut rest, tracker, started)) = state else {
                return None;
            };
            if !started {
                tracker.started();
            }
            let piece = rest.split_to(rest.len().min(BODY_CHUNK));
            if rest.is_empty() {
                tracker.finished();
                return Some((Ok::<Bytes, std::io::Error>(piece), None));
            }
            Some((Ok(piece), Some((rest, tracker, true))))
        })
    }

    fn body(&self, data: Bytes) -> Body {
        Body::wrap_stream(self.stream(data))
    }
}

fn form_from_parts(parts: Vec<FormPart>, tracker: &BodyTracker) -> Result<Form> {
    let mut form = Form::new();
    for part in parts {
        form = match part.body {
            PartBody::File {
                file_name,
                mime,
                data,
            } => {
                let len = data.len() as u64;
                let mut p = Part::stream_with_length(tracker.body(data), len)
                    .mime_str(mime)
                    .with_context(|| format!("Invalid MIME type '{}'", mime))?;
                if !file_name.is_empty() {
                    p = p.file_name(file_name);
                }
                form.part(part.name, p)
            }
            PartBody::Text(text) => form.text(part.name, text),
        };
    }
    Ok(form)
}

#[async_trait]
impl Transport for HttpTransport {
    fn supports_structured_multipart(&self) -> bool {
        true
    }

    async fn post(
        &self,
        request: BatchRequest<'_>,
        on_phase: &mut (dyn FnMut(Phase) + Send),
    ) -> Result<BatchResponse> {
        let mut builder = self
            .client
            .post(request.url)
            .headers(request_headers(request.headers)?);

        if let Some(content_type) = &request.payload.content_type {
            builder = builder.header(CONTENT_TYPE, content_type);
        }

        let (phase_tx, mut phase_rx) = mpsc::unbounded_channel();
        builder = match request.payload.payload {
            Payload::Structured(parts) => {
                let files = parts
                    .iter()
                    .filter(|p| matches!(p.body, PartBody::File { .. }))
                    .count();
                let tracker = BodyTracker::new(phase_tx, files);
                builder.multipart(form_from_parts(parts, &tracker)?)
            }
            Payload::Raw(body) => {
                let tracker = BodyTracker::new(phase_tx, 1);
                builder
                    .header(CONTENT_LENGTH, body.len())
                    .body(tracker.body(body))
            }
        };

        on_phase(Phase::Opened);
        let send = builder.send();
        tokio::pin!(send);
        let sent = loop {
            tokio::select! {
                Some(phase) = phase_rx.recv() => on_phase(phase),
                result = &mut send => break result,
            }
        };
        while let Ok(phase) = phase_rx.try_recv() {
            on_phase(phase);
        }

        // Failures are attributed to whatever the body tracking reached.
        let response = sent.context("POST failed")?;
        on_phase(Phase::Sent);
        on_phase(Phase::HeadersReceived);

        let status = response.status().as_u16();
        tracing::debug!("Response status {} from {}", status, request.url);

        let body = response
            .text()
            .await
            .context("Failed to read response body")?;

        Ok(BatchResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_map_keeps_duplicates() {
        let headers = vec![
            ("Cookie".to_string(), "a=1".to_string()),
            ("Cookie".to_string(), "b=2".to_string()),
            ("X-OpenRosa-Version".to_string(), "1.0".to_string()),
        ];
        let map = header_map(&headers).unwrap();
        assert_eq!(map.get_all("cookie").iter().count(), 2);
        assert_eq!(map.get("x-openrosa-version").unwrap(), "1.0");
    }

    #[test]
    fn test_header_map_rejects_bad_names() {
        let headers = vec![("Bad Header".to_string(), "v".to_string())];
        assert!(header_map(&headers).is_err());
    }

    #[test]
    fn test_form_from_parts() {
        let parts = vec![
            FormPart {
                name: "xml_submission_file".to_string(),
                body: PartBody::File {
                    file_name: "form.xml".to_string(),
                    mime: "application/xml",
                    data: bytes::Bytes::from_static(b"<d/>"),
                },
            },
            FormPart {
                name: "*isIncomplete*".to_string(),
                body: PartBody::Text("yes".to_string()),
            },
        ];
        let (tx, _rx) = mpsc::unbounded_channel();
        let form = form_from_parts(parts, &BodyTracker::new(tx, 1)).unwrap();
        assert!(!form.boundary().is_empty());
    }

    #[test]
    fn test_caller_content_type_dropped() {
        let headers = vec![
            ("Content-Type".to_string(), "text/xml".to_string()),
            ("Cookie".to_string(), "a=1".to_string()),
        ];
        let map = request_headers(&headers).unwrap();
        assert!(map.get(CONTENT_TYPE).is_none());
        assert_eq!(map.get("cookie").unwrap(), "a=1");
    }

    #[tokio::test]
    async fn test_tracked_bodies_report_start_and_end() {
        use futures::StreamExt;

        let (tx, mut rx) = mpsc::unbounded_channel();
        let tracker = BodyTracker::new(tx, 2);

        let pieces: Vec<_> = tracker
            .stream(Bytes::from(vec![7u8; BODY_CHUNK * 2 + 1]))
            .collect()
            .await;
        assert_eq!(pieces.len(), 3);
        assert_eq!(pieces[2].as_ref().unwrap().len(), 1);
        assert_eq!(rx.try_recv().unwrap(), Phase::Sent);
        assert!(rx.try_recv().is_err());

        let pieces: Vec<_> = tracker.stream(Bytes::new()).collect().await;
        assert_eq!(pieces.len(), 1);
        assert_eq!(rx.try_recv().unwrap(), Phase::Sent);
        assert_eq!(rx.try_recv().unwrap(), Phase::HeadersReceived);
        assert!(rx.try_recv().is_err());
    }
}
