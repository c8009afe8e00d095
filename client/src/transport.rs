//! The transport seam between the deterministic core and real I/O.
//!
//! Operations never talk to the network themselves; they hand an
//! [`HttpRequest`] to whatever [`Transport`] the caller passed in. The
//! bundled implementation for [`reqwest::Client`] covers production use,
//! while tests inject scripted transports that replay canned responses.

use async_trait::async_trait;
use tracing::debug;

use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Errors a transport hands back instead of a response.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The transport noticed the operation was canceled. Normalized to
    /// [`crate::ApiError::Canceled`] so cancellation looks the same no
    /// matter which layer detected it first.
    #[error("request canceled in transport")]
    Canceled,

    /// The request could not be delivered or the response could not be
    /// read. The source error is passed through untouched.
    #[error("transport failure: {0}")]
    Failure(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Carries one request to the server and returns its response.
///
/// Implementations own connection management, timeouts and retries; the
/// client neither pools nor retries on its own. A transport is shared by
/// reference across concurrent operations, so it must be `Send + Sync`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Production transport. The caller configures the [`reqwest::Client`]
/// (pooling, timeouts, proxies) and passes it to each operation.
#[async_trait]
impl Transport for reqwest::Client {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let HttpRequest { method, url, headers, body } = request;
        let method = match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        };
        debug!(%method, %url, "dispatching request");
        let mut builder = self.request(method, url);
        for (name, value) in &headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = body {
            builder = builder.body(body);
        }
        let response = builder
            .send()
            .await
            .map_err(|err| TransportError::Failure(Box::new(err)))?;
        let status = response.status().as_u16();
        let response_headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response
            .text()
            .await
            .map_err(|err| TransportError::Failure(Box::new(err)))?;
        debug!(status, "response received");
        Ok(HttpResponse { status, headers: response_headers, body })
    }
}
