//! Endpoint contexts: how a key maps to a host, a signed resource and a
//! request path.
//!
//! Two addressing modes share one interface:
//!
//! | Context | Host | Signed resource | Wire path |
//! |---------|------|-----------------|-----------|
//! | [`ClientContext`] | `endpoint` | `/key` | `/key` |
//! | [`BucketContext`] | `bucket.endpoint` | `/bucket/key` | `/key` |
//!
//! The bucket context signs the bucket-qualified resource even though the
//! bucket only travels in the `Host` header; the server charges the signature
//! against the bucket-qualified resource.

use std::fmt;

use s3v2_auth::canonical::encode_path;

use crate::error::{ClientError, ClientResult};

/// URL scheme used for requests and public URLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scheme {
    /// Plain HTTP.
    #[default]
    Http,
    /// HTTP over TLS.
    Https,
}

impl Scheme {
    /// Pick the scheme for a `secure` configuration flag.
    #[must_use]
    pub fn from_secure(secure: bool) -> Self {
        if secure { Self::Https } else { Self::Http }
    }

    /// The scheme as it appears in a URL.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalize an object key into a request path.
///
/// An empty key, `"/"`, or a run of slashes becomes `"/"`; this is the path of
/// bucket-level operations (create, remove, list). Any other key gets its
/// leading slashes collapsed into one and each segment percent-encoded.
///
/// # Examples
///
/// ```
/// use s3v2_client::endpoint::normalize_key;
///
/// assert_eq!(normalize_key(""), "/");
/// assert_eq!(normalize_key("/"), "/");
/// assert_eq!(normalize_key("test/user.json"), "/test/user.json");
/// assert_eq!(normalize_key("//test/user.json"), "/test/user.json");
/// ```
#[must_use]
pub fn normalize_key(key: &str) -> String {
    let trimmed = key.trim_start_matches('/');
    if trimmed.is_empty() {
        return "/".to_owned();
    }
    encode_path(&format!("/{trimmed}"))
}

/// Check that `key` reaches the server as written.
///
/// URL parsers resolve `.` and `..` segments (also when spelled `%2e`) before
/// the request is sent, so the server would see a different path than the one
/// that was signed. Such keys are rejected.
///
/// # Errors
///
/// Returns [`ClientError::InvalidKey`] if a segment of `key` is a dot segment.
///
/// # Examples
///
/// ```
/// use s3v2_client::endpoint::validate_key;
///
/// assert!(validate_key("/photos/v1.2/a.jpg").is_ok());
/// assert!(validate_key("/photos/../secret.txt").is_err());
/// ```
pub fn validate_key(key: &str) -> ClientResult<()> {
    let has_dot_segment = key.split('/').any(|segment| {
        let segment = segment.to_ascii_lowercase().replace("%2e", ".");
        segment == "." || segment == ".."
    });
    if has_dot_segment {
        return Err(ClientError::InvalidKey(format!(
            "{key:?} contains a \".\" or \"..\" path segment"
        )));
    }
    Ok(())
}

/// Addressing mode of a request.
///
/// Implemented by [`ClientContext`] (service-level requests) and
/// [`BucketContext`] (virtual-hosted bucket requests). The request builder
/// only talks to this trait.
pub trait EndpointContext: fmt::Debug + Send + Sync {
    /// Host the request is sent to; also the `Host` header value.
    fn endpoint_host(&self) -> &str;

    /// Scheme for the request URL.
    fn scheme(&self) -> Scheme;

    /// Resource path covered by the signature.
    fn canonical_resource(&self, key: &str) -> String;

    /// Path sent on the HTTP request line.
    fn wire_path(&self, key: &str) -> String {
        normalize_key(key)
    }

    /// Public URL of `key`, without any query string.
    fn url(&self, key: &str) -> String {
        format!(
            "{}://{}{}",
            self.scheme(),
            self.endpoint_host(),
            self.wire_path(key)
        )
    }
}

/// Service-level context: requests go straight to the configured endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientContext {
    endpoint: String,
    scheme: Scheme,
}

impl ClientContext {
    /// Create a context for `endpoint` (`host[:port]`).
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Configuration`] if `endpoint` is not a valid
    /// URI authority.
    pub fn new(endpoint: impl Into<String>, scheme: Scheme) -> ClientResult<Self> {
        let endpoint = endpoint.into();
        if endpoint.is_empty() {
            return Err(ClientError::Configuration("endpoint is required".to_owned()));
        }
        endpoint
            .parse::<http::uri::Authority>()
            .map_err(|e| ClientError::Configuration(format!("invalid endpoint {endpoint:?}: {e}")))?;

        Ok(Self { endpoint, scheme })
    }
}

impl EndpointContext for ClientContext {
    fn endpoint_host(&self) -> &str {
        &self.endpoint
    }

    fn scheme(&self) -> Scheme {
        self.scheme
    }

    fn canonical_resource(&self, key: &str) -> String {
        normalize_key(key)
    }
}

/// Bucket context: virtual-hosted addressing under a parent endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketContext {
    bucket: String,
    host: String,
    scheme: Scheme,
}

impl BucketContext {
    /// Create a context for `bucket` hosted under `parent`'s endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Configuration`] if `bucket` is empty.
    pub fn new(bucket: impl Into<String>, parent: &ClientContext) -> ClientResult<Self> {
        let bucket = bucket.into();
        if bucket.is_empty() {
            return Err(ClientError::Configuration("bucket name is required".to_owned()));
        }

        let host = format!("{bucket}.{}", parent.endpoint_host());
        Ok(Self {
            bucket,
            host,
            scheme: parent.scheme(),
        })
    }

    /// The bucket name.
    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

impl EndpointContext for BucketContext {
    fn endpoint_host(&self) -> &str {
        &self.host
    }

    fn scheme(&self) -> Scheme {
        self.scheme
    }

    fn canonical_resource(&self, key: &str) -> String {
        format!("/{}{}", self.bucket, normalize_key(key))
    }
}
