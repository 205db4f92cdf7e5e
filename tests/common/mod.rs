#![allow(dead_code)]

use axum::body::Body;
use axum::extract::{DefaultBodyLimit, FromRequest, Multipart, Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::Router;
use bytes::Bytes;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;

/// One request as the test server saw it.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub headers: HeaderMap,
    pub body: Bytes,
    parts: Result<Vec<ParsedPart>, String>,
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Parts as decoded by axum's multipart extractor.
    pub fn parts(&self) -> Vec<ParsedPart> {
        self.parts.clone().expect("body is valid multipart/form-data")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPart {
    pub name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

#[derive(Clone, Default)]
pub struct TestServer {
    pub url: String,
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
    replies: Arc<Mutex<VecDeque<(u16, String)>>>,
}

impl TestServer {
    /// Serve `POST /submission`, answering with `replies` in order and `201`
    /// once they run out.
    pub async fn start(replies: Vec<(u16, &str)>) -> Self {
        let mut server = TestServer {
            replies: Arc::new(Mutex::new(
                replies
                    .into_iter()
                    .map(|(status, body)| (status, body.to_string()))
                    .collect(),
            )),
            ..Default::default()
        };

        let app = Router::new()
            .route("/submission", post(submit))
            .layer(DefaultBodyLimit::disable())
            .with_state(server.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        server.url = format!("http://{}/submission", addr);
        server
    }

    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

async fn decode_parts(headers: &HeaderMap, body: Bytes) -> Result<Vec<ParsedPart>, String> {
    let mut request = Request::new(Body::from(body));
    *request.headers_mut() = headers.clone();

    let mut multipart = Multipart::from_request(request, &())
        .await
        .map_err(|e| e.body_text())?;

    let mut parts = Vec::new();
    while let Some(field) = multipart.next_field().await.map_err(|e| e.body_text())? {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await.map_err(|e| e.body_text())?;
        parts.push(ParsedPart {
            name,
            file_name,
            content_type,
            data: data.to_vec(),
        });
    }
    Ok(parts)
}

async fn submit(State(server): State<TestServer>, request: Request) -> (StatusCode, String) {
    let (head, body) = request.into_parts();
    let body = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    let parts = decode_parts(&head.headers, body.clone()).await;

    server.requests.lock().unwrap().push(CapturedRequest {
        headers: head.headers,
        body,
        parts,
    });
    let (status, text) = server
        .replies
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or((201, String::new()));
    (StatusCode::from_u16(status).unwrap(), text)
}

/// A URL nothing listens on.
pub async fn closed_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}/submission", addr)
}

/// A URL whose server reads every request to the end and never answers.
pub async fn silent_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = vec![0u8; 64 * 1024];
                while let Ok(n) = socket.read(&mut buf).await {
                    if n == 0 {
                        break;
                    }
                }
            });
        }
    });
    format!("http://{}/submission", addr)
}
