//! Error types for the s3v2 client.

use s3v2_auth::AuthError;

/// Boxed error produced by a [`Transport`](crate::transport::Transport).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors returned by client construction and request operations.
///
/// HTTP status codes are never turned into errors: a `403` or `404` response
/// is a successful exchange and comes back as a [`Response`](crate::Response).
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Missing credentials, empty bucket name, invalid endpoint or verb.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// An object key the request URL cannot carry unchanged.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// A header name or value that cannot be sent on the wire.
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// The underlying connection or HTTP exchange failed.
    #[error("transport error: {0}")]
    Transport(#[source] BoxError),

    /// The upload source (file or stream) failed while being read.
    #[error("upload source error: {0}")]
    Source(#[from] std::io::Error),
}

impl From<AuthError> for ClientError {
    fn from(err: AuthError) -> Self {
        Self::Configuration(err.to_string())
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(Box::new(err))
    }
}

/// Convenience result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;
