//! Client configuration.
//!
//! Provides [`ClientConfig`], the immutable value every request build reads
//! from. Values can be assembled with the typed builder or loaded from
//! environment variables.

use std::fmt;

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

/// Default service endpoint.
pub const DEFAULT_ENDPOINT: &str = "s3.amazonaws.com";

/// Canned ACL applied to `PUT` requests unless the caller sends `x-amz-acl`.
pub const DEFAULT_ACL: &str = "public-read";

/// Configuration for a [`Client`](crate::Client).
///
/// Credentials are optional here so that a partially filled configuration can
/// be represented; [`Client::new`](crate::Client::new) rejects it if either
/// component is missing.
///
/// # Examples
///
/// ```
/// use s3v2_client::config::ClientConfig;
///
/// let config = ClientConfig::builder()
///     .access_key("foobar".into())
///     .secret_key("baz".into())
///     .endpoint("s3-eu-west-1.amazonaws.com".into())
///     .build();
/// assert_eq!(config.endpoint, "s3-eu-west-1.amazonaws.com");
/// assert!(!config.secure);
/// ```
#[derive(Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    /// Access key ID.
    #[builder(default, setter(strip_option))]
    #[serde(default)]
    pub access_key: Option<String>,

    /// Secret access key. Never serialized.
    #[builder(default, setter(strip_option))]
    #[serde(default, skip_serializing)]
    pub secret_key: Option<String>,

    /// Service endpoint as `host[:port]` (e.g. `"s3.amazonaws.com"`).
    #[builder(default = String::from(DEFAULT_ENDPOINT))]
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Whether URLs use `https` instead of `http`.
    #[builder(default = false)]
    #[serde(default)]
    pub secure: bool,

    /// Canned ACL sent with `PUT` requests by default.
    #[builder(default = String::from(DEFAULT_ACL))]
    #[serde(default = "default_acl")]
    pub default_acl: String,

    /// Log level filter string (e.g. `"info"`, `"debug"`).
    #[builder(default = String::from("info"))]
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            access_key: None,
            secret_key: None,
            endpoint: default_endpoint(),
            secure: false,
            default_acl: default_acl(),
            log_level: default_log_level(),
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("access_key", &self.access_key)
            .field("secret_key", &self.secret_key.as_ref().map(|_| "<redacted>"))
            .field("endpoint", &self.endpoint)
            .field("secure", &self.secure)
            .field("default_acl", &self.default_acl)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Reads the following environment variables (falling back to defaults):
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `S3_ACCESS_KEY`, then `AWS_ACCESS_KEY_ID` | *(unset)* |
    /// | `S3_SECRET_KEY`, then `AWS_SECRET_ACCESS_KEY` | *(unset)* |
    /// | `S3_ENDPOINT` | `s3.amazonaws.com` |
    /// | `S3_SECURE` | `false` |
    /// | `S3_DEFAULT_ACL` | `public-read` |
    /// | `LOG_LEVEL` | `info` |
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        config.access_key = std::env::var("S3_ACCESS_KEY")
            .or_else(|_| std::env::var("AWS_ACCESS_KEY_ID"))
            .ok();
        config.secret_key = std::env::var("S3_SECRET_KEY")
            .or_else(|_| std::env::var("AWS_SECRET_ACCESS_KEY"))
            .ok();

        if let Ok(v) = std::env::var("S3_ENDPOINT") {
            config.endpoint = v;
        }
        if let Ok(v) = std::env::var("S3_SECURE") {
            config.secure = parse_bool(&v);
        }
        if let Ok(v) = std::env::var("S3_DEFAULT_ACL") {
            config.default_acl = v;
        }
        if let Ok(v) = std::env::var("LOG_LEVEL") {
            config.log_level = v;
        }

        config
    }
}

fn default_endpoint() -> String {
    String::from(DEFAULT_ENDPOINT)
}

fn default_acl() -> String {
    String::from(DEFAULT_ACL)
}

fn default_log_level() -> String {
    String::from("info")
}

/// Parse a string as a boolean, accepting `"1"` and `"true"` (case-insensitive).
fn parse_bool(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}
