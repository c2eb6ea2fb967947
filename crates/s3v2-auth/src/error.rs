//! Error types for SigV2 signing.

/// Errors raised while setting up request signing.
///
/// Signing itself cannot fail: HMAC-SHA1 accepts keys of any length and the
/// string-to-sign is plain UTF-8. The only failure mode is incomplete
/// credentials, which is caught when [`Credentials`](crate::Credentials) are
/// constructed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// A required credential component is empty or absent.
    #[error("aws \"{0}\" required")]
    MissingCredential(&'static str),
}
