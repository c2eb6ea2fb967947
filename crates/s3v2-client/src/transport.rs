//! HTTP transport abstraction.
//!
//! The client never opens connections itself. A [`Transport`] takes a
//! [`SignedRequest`] plus a [`Body`] and performs the exchange;
//! [`ReqwestTransport`] is the production implementation. Connection pooling,
//! TLS and timeouts are configured on the underlying `reqwest::Client`.

use std::fmt;
use std::io;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use http::{HeaderMap, Method, StatusCode};
use tracing::{debug, warn};

use crate::error::ClientResult;
use crate::request::SignedRequest;

/// Stream of body chunks for streaming uploads.
pub type ByteStream = BoxStream<'static, io::Result<Bytes>>;

/// Request body.
pub enum Body {
    /// No body.
    Empty,
    /// A fully buffered body.
    Bytes(Bytes),
    /// Chunks piped into the open request as they are produced.
    Stream(ByteStream),
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("Empty"),
            Self::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(Bytes::from(bytes))
    }
}

/// Response of an exchange. The status code is not interpreted.
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl Response {
    /// Create a response from its parts.
    #[must_use]
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// HTTP status code.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Response headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Response body; empty for `HEAD`.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Take the response body.
    #[must_use]
    pub fn into_body(self) -> Bytes {
        self.body
    }
}

/// Performs signed HTTP exchanges.
#[async_trait]
pub trait Transport: fmt::Debug + Send + Sync {
    /// Send `request` with `body` and wait for the full response.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Transport`](crate::ClientError::Transport) when
    /// the exchange fails, including when a streaming body yields an error.
    async fn send(&self, request: SignedRequest, body: Body) -> ClientResult<Response>;
}

/// [`Transport`] backed by a `reqwest` client.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Create a transport with a default `reqwest` client.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transport around a preconfigured `reqwest` client (timeouts,
    /// proxies, DNS overrides).
    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: SignedRequest, body: Body) -> ClientResult<Response> {
        let (verb, url, headers) = request.into_parts();

        debug!(verb = %verb, url = %url, body = ?body, "Sending request");

        let builder = self
            .client
            .request(Method::from(verb), &url)
            .headers(headers);
        let builder = match body {
            Body::Empty => builder,
            Body::Bytes(bytes) => builder.body(bytes),
            Body::Stream(stream) => builder.body(reqwest::Body::wrap_stream(stream)),
        };

        let response = builder.send().await.inspect_err(|e| {
            warn!(verb = %verb, url = %url, error = %e, "Request failed");
        })?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        debug!(verb = %verb, url = %url, status = %status, "Received response");

        Ok(Response::new(status, headers, body))
    }
}
