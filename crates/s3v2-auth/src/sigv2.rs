//! AWS Signature Version 2 string-to-sign and signatures.
//!
//! SigV2 signs with HMAC-SHA1. The `Authorization` header has the format:
//!
//! ```text
//! AWS <AWSAccessKeyId>:<Signature>
//! ```
//!
//! Where `Signature = Base64(HMAC-SHA1(SecretKey, StringToSign))` and, for
//! header-based authentication:
//!
//! ```text
//! StringToSign = HTTP-Verb + "\n" +
//!                Content-MD5 + "\n" +
//!                Content-Type + "\n" +
//!                Date + "\n" +
//!                CanonicalizedAmzHeaders +
//!                CanonicalizedResource
//! ```
//!
//! Query-string authentication (presigned URLs) replaces the `Date` line with
//! the expiry epoch and drops everything optional:
//!
//! ```text
//! StringToSign = HTTP-Verb + "\n\n\n" + Expires + "\n" + CanonicalizedResource
//! ```

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, KeyInit, Mac};
use sha1::Sha1;
use tracing::debug;

use crate::credentials::Credentials;

type HmacSha1 = Hmac<Sha1>;

/// Scheme prefix of a SigV2 `Authorization` header value.
pub const AUTHORIZATION_SCHEME: &str = "AWS";

/// Inputs of the header-based string-to-sign.
///
/// Optional fields that are absent on the request are passed as `""`; they
/// still contribute their line, so the result always has exactly four
/// newlines plus one per canonicalized amz header.
#[derive(Debug, Clone, Copy)]
pub struct HeaderStringToSign<'a> {
    /// HTTP verb, e.g. `PUT`.
    pub verb: &'a str,
    /// Value of `Content-MD5`, or empty.
    pub content_md5: &'a str,
    /// Value of `Content-Type`, or empty.
    pub content_type: &'a str,
    /// Value of the `Date` header.
    pub date: &'a str,
    /// Output of [`canonicalize_amz_headers`](crate::canonical::canonicalize_amz_headers).
    pub canonical_headers: &'a str,
    /// Canonicalized resource path.
    pub resource: &'a str,
}

impl HeaderStringToSign<'_> {
    /// Assemble the string-to-sign.
    ///
    /// # Examples
    ///
    /// ```
    /// use s3v2_auth::HeaderStringToSign;
    ///
    /// let sts = HeaderStringToSign {
    ///     verb: "GET",
    ///     content_md5: "",
    ///     content_type: "",
    ///     date: "Tue, 27 Mar 2007 19:36:42 +0000",
    ///     canonical_headers: "",
    ///     resource: "/johnsmith/photos/puppy.jpg",
    /// }
    /// .build();
    /// assert_eq!(sts, "GET\n\n\nTue, 27 Mar 2007 19:36:42 +0000\n/johnsmith/photos/puppy.jpg");
    /// ```
    #[must_use]
    pub fn build(&self) -> String {
        let Self {
            verb,
            content_md5,
            content_type,
            date,
            canonical_headers,
            resource,
        } = self;
        format!("{verb}\n{content_md5}\n{content_type}\n{date}\n{canonical_headers}{resource}")
    }
}

/// Build the query-string-auth string-to-sign used by presigned URLs.
///
/// No amz headers are included and the `Content-MD5`/`Content-Type` lines are
/// always empty.
///
/// # Examples
///
/// ```
/// use s3v2_auth::sigv2::build_query_string_to_sign;
///
/// let sts = build_query_string_to_sign("GET", 1_175_139_620, "/johnsmith/photos/puppy.jpg");
/// assert_eq!(sts, "GET\n\n\n1175139620\n/johnsmith/photos/puppy.jpg");
/// ```
#[must_use]
pub fn build_query_string_to_sign(verb: &str, expires: i64, resource: &str) -> String {
    format!("{verb}\n\n\n{expires}\n{resource}")
}

/// Compute the SigV2 signature: `Base64(HMAC-SHA1(secret, string_to_sign))`.
///
/// The standard base64 alphabet is used without line wrapping, so the result
/// is a single token of 28 characters.
#[must_use]
pub fn compute_signature(credentials: &Credentials, string_to_sign: &str) -> String {
    let mut mac = HmacSha1::new_from_slice(credentials.secret_key().as_bytes())
        .expect("HMAC can accept any key length");
    mac.update(string_to_sign.as_bytes());
    let result = mac.finalize().into_bytes();
    BASE64.encode(result)
}

/// Sign `string_to_sign` and format the `Authorization` header value
/// `AWS <access_key>:<signature>`.
#[must_use]
pub fn authorization_header(credentials: &Credentials, string_to_sign: &str) -> String {
    debug!(string_to_sign = ?string_to_sign, "Signing SigV2 string to sign");

    let signature = compute_signature(credentials, string_to_sign);
    format!(
        "{AUTHORIZATION_SCHEME} {}:{signature}",
        credentials.access_key()
    )
}
