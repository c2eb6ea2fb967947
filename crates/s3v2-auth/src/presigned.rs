//! Query-string authentication for presigned URLs.
//!
//! A presigned URL carries its authentication in three query parameters:
//!
//! - `Expires` - Expiry as whole seconds since the Unix epoch
//! - `AWSAccessKeyId` - The signing access key
//! - `Signature` - The percent-escaped base64 signature
//!
//! There is no server-side state behind a presigned URL. It stays valid until
//! the server's clock passes `Expires`.

use tracing::debug;

use crate::canonical::escape_query_value;
use crate::credentials::Credentials;
use crate::sigv2::{build_query_string_to_sign, compute_signature};

/// Signature parameters of a presigned URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresignedQuery {
    /// Expiry, in whole seconds since the Unix epoch.
    pub expires: i64,
    /// The access key ID that produced the signature.
    pub access_key_id: String,
    /// The base64 signature, not yet escaped.
    pub signature: String,
}

impl PresignedQuery {
    /// Render the query string (without the leading `?`).
    ///
    /// `Expires` and `AWSAccessKeyId` are URL-safe already and are emitted
    /// verbatim; the signature is percent-escaped.
    ///
    /// # Examples
    ///
    /// ```
    /// use s3v2_auth::PresignedQuery;
    ///
    /// let query = PresignedQuery {
    ///     expires: 1_700_000_000,
    ///     access_key_id: "AK".to_owned(),
    ///     signature: "ab+c/d=".to_owned(),
    /// };
    /// assert_eq!(
    ///     query.to_query_string(),
    ///     "Expires=1700000000&AWSAccessKeyId=AK&Signature=ab%2Bc%2Fd%3D"
    /// );
    /// ```
    #[must_use]
    pub fn to_query_string(&self) -> String {
        format!(
            "Expires={}&AWSAccessKeyId={}&Signature={}",
            self.expires,
            self.access_key_id,
            escape_query_value(&self.signature)
        )
    }
}

/// Sign `resource` for query-string authentication until `expires`.
#[must_use]
pub fn presign(credentials: &Credentials, verb: &str, resource: &str, expires: i64) -> PresignedQuery {
    let string_to_sign = build_query_string_to_sign(verb, expires, resource);

    debug!(string_to_sign = ?string_to_sign, "Built SigV2 query string to sign");

    PresignedQuery {
        expires,
        access_key_id: credentials.access_key().to_owned(),
        signature: compute_signature(credentials, &string_to_sign),
    }
}
