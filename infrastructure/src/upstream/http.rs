//! HTTP upstream provider.
//!
//! POSTs the forward-request payload as JSON to the configured endpoint and
//! exposes the response body as a raw byte stream.

use async_trait::async_trait;
use relay_application::{UpstreamError, UpstreamProvider, UpstreamStream};
use relay_domain::{RelayPayload, preview};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Placeholder replaced by the payload's routing session.
pub const SESSION_PLACEHOLDER: &str = "{session_id}";

/// Longest error body echoed back to the Coordinator.
const MAX_ERROR_BODY: usize = 512;

#[derive(Error, Debug)]
pub enum HttpUpstreamError {
    #[error("Invalid header '{0}'")]
    InvalidHeader(String),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

pub struct HttpUpstreamProvider {
    client: reqwest::Client,
    endpoint: String,
    headers: HeaderMap,
}

impl HttpUpstreamProvider {
    pub fn new(
        endpoint: impl Into<String>,
        headers: &BTreeMap<String, String>,
        connect_timeout: Duration,
    ) -> Result<Self, HttpUpstreamError> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            headers: build_headers(headers)?,
        })
    }

    /// The request URL for `payload`.
    pub fn resolve_endpoint(&self, payload: &RelayPayload) -> String {
        self.endpoint
            .replace(SESSION_PLACEHOLDER, payload.routing_session().unwrap_or_default())
    }
}

fn build_headers(headers: &BTreeMap<String, String>) -> Result<HeaderMap, HttpUpstreamError> {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| HttpUpstreamError::InvalidHeader(name.clone()))?;
        let header_value = HeaderValue::from_str(value)
            .map_err(|_| HttpUpstreamError::InvalidHeader(name.clone()))?;
        map.insert(header_name, header_value);
    }
    Ok(map)
}

fn request_error(e: reqwest::Error) -> UpstreamError {
    if e.is_builder() {
        UpstreamError::Rejected(e.to_string())
    } else {
        UpstreamError::Connect(e.to_string())
    }
}

#[async_trait]
impl UpstreamProvider for HttpUpstreamProvider {
    async fn open(&self, payload: &RelayPayload) -> Result<Box<dyn UpstreamStream>, UpstreamError> {
        let url = self.resolve_endpoint(payload);
        debug!("Upstream: POST {}", url);

        let response = self
            .client
            .post(&url)
            .headers(self.headers.clone())
            .json(payload)
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body: preview(body.trim(), MAX_ERROR_BODY),
            });
        }

        Ok(Box::new(HttpUpstreamStream { response }))
    }
}

struct HttpUpstreamStream {
    response: reqwest::Response,
}

#[async_trait]
impl UpstreamStream for HttpUpstreamStream {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, UpstreamError> {
        self.response
            .chunk()
            .await
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()))
            .map_err(|e| UpstreamError::Interrupted(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_domain::MessageTemplate;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn payload() -> RelayPayload {
        RelayPayload {
            message_templates: vec![MessageTemplate {
                role: "user".into(),
                content: "hello".into(),
                ..Default::default()
            }],
            session_id: Some("sess-42".into()),
            ..Default::default()
        }
    }

    /// Read a full request (head plus `Content-Length` body).
    async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
        let mut data = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            data.extend_from_slice(&buf[..n]);

            let text = String::from_utf8_lossy(&data).into_owned();
            if let Some(head_end) = text.find("\r\n\r\n") {
                let content_length = text[..head_end]
                    .lines()
                    .find_map(|l| {
                        let (name, value) = l.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if data.len() >= head_end + 4 + content_length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&data).into_owned()
    }

    /// Serve one canned HTTP response and return the raw request.
    async fn serve_once(response: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            request
        });
        (format!("http://{addr}/stream/{{session_id}}"), handle)
    }

    #[test]
    fn resolves_session_placeholder() {
        let provider = HttpUpstreamProvider::new(
            "https://provider.test/stream/{session_id}",
            &BTreeMap::new(),
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(
            provider.resolve_endpoint(&payload()),
            "https://provider.test/stream/sess-42"
        );
    }

    #[test]
    fn rejects_invalid_header() {
        let mut headers = BTreeMap::new();
        headers.insert("bad header".to_string(), "x".to_string());
        let result = HttpUpstreamProvider::new("http://x", &headers, Duration::from_secs(5));
        assert!(matches!(result, Err(HttpUpstreamError::InvalidHeader(h)) if h == "bad header"));
    }

    #[tokio::test]
    async fn streams_successful_body() {
        let (endpoint, server) = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 12\r\nConnection: close\r\n\r\na0:\"hello\"\n\n",
        )
        .await;
        let mut headers = BTreeMap::new();
        headers.insert("x-relay-token".to_string(), "secret".to_string());
        let provider = HttpUpstreamProvider::new(endpoint, &headers, Duration::from_secs(5)).unwrap();

        let mut stream = provider.open(&payload()).await.unwrap();
        let mut body = Vec::new();
        while let Some(chunk) = stream.next_chunk().await.unwrap() {
            body.extend(chunk);
        }
        assert_eq!(body, b"a0:\"hello\"\n\n");

        let request = server.await.unwrap().to_ascii_lowercase();
        assert!(request.starts_with("post /stream/sess-42 "));
        assert!(request.contains("x-relay-token: secret"));
    }

    #[tokio::test]
    async fn maps_error_status() {
        let (endpoint, _server) = serve_once(
            "HTTP/1.1 503 Service Unavailable\r\nContent-Length: 4\r\nConnection: close\r\n\r\nbusy",
        )
        .await;
        let provider =
            HttpUpstreamProvider::new(endpoint, &BTreeMap::new(), Duration::from_secs(5)).unwrap();

        match provider.open(&payload()).await {
            Err(err @ UpstreamError::Status { status: 503, .. }) => {
                assert!(err.is_transient());
                assert!(err.to_string().contains("busy"));
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("expected an error status"),
        }
    }

    #[tokio::test]
    async fn connection_refused_is_transient() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let provider = HttpUpstreamProvider::new(
            format!("http://{addr}/"),
            &BTreeMap::new(),
            Duration::from_secs(5),
        )
        .unwrap();

        let err = provider.open(&payload()).await.err().unwrap();
        assert!(matches!(err, UpstreamError::Connect(_)));
        assert!(err.is_transient());
    }
}
