//! Canonical forms consumed by the SigV2 string-to-sign.
//!
//! Two pieces of the string-to-sign need normalizing before they can be
//! signed:
//!
//! ```text
//! CanonicalizedAmzHeaders = for each x-amz-* header, sorted by lower-cased name:
//!                               lowercase(name) + ":" + trim(value) + "\n"
//! CanonicalizedResource   = [ "/" + bucket ] + percent-encoded request path
//! ```
//!
//! The resource prefix is the caller's business (see the endpoint contexts in
//! `s3v2-client`); this module only provides the path encoding shared by the
//! signed resource and the wire path, so the two never disagree.

use std::collections::BTreeMap;

use percent_encoding::{
    AsciiSet, NON_ALPHANUMERIC, percent_decode_str, percent_encode, utf8_percent_encode,
};

/// Prefix that marks a header as part of the canonicalized amz headers.
pub const AMZ_HEADER_PREFIX: &str = "x-amz-";

/// Characters that must be percent-encoded in path segments and query values.
///
/// Everything except RFC 3986 unreserved characters (A-Z, a-z, 0-9, `-`, `_`,
/// `.`, `~`). In particular `+`, `/` and `=` from base64 signatures are
/// always escaped when used as a query value.
const URI_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Build the CanonicalizedAmzHeaders string from a request's headers.
///
/// Only headers whose name starts with `x-amz-` (compared case-insensitively)
/// are selected. Names are lower-cased, values trimmed, and the result sorted
/// by name. A name that appears more than once has its values joined with
/// `,` in input order. Each header is emitted as `name:value\n`; when no
/// header matches the result is empty.
///
/// # Examples
///
/// ```
/// use s3v2_auth::canonical::canonicalize_amz_headers;
///
/// let canonical = canonicalize_amz_headers([
///     ("X-Amz-Meta-Owner", "alice"),
///     ("Content-Type", "text/plain"),
///     ("x-amz-acl", "public-read"),
/// ]);
/// assert_eq!(canonical, "x-amz-acl:public-read\nx-amz-meta-owner:alice\n");
/// ```
#[must_use]
pub fn canonicalize_amz_headers<'a, I>(headers: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut amz_headers: BTreeMap<String, Vec<&str>> = BTreeMap::new();

    for (name, value) in headers {
        let lower_name = name.to_ascii_lowercase();
        if lower_name.starts_with(AMZ_HEADER_PREFIX) {
            amz_headers.entry(lower_name).or_default().push(value.trim());
        }
    }

    let mut result = String::new();
    for (name, values) in &amz_headers {
        result.push_str(name);
        result.push(':');
        result.push_str(&values.join(","));
        result.push('\n');
    }

    result
}

/// Percent-encode each segment of a `/`-separated path.
///
/// Slashes are preserved. Segments are decoded to raw bytes before encoding
/// so an already encoded path comes out unchanged rather than double-encoded.
/// Escapes that do not form valid UTF-8 (such as `%FF`) keep their bytes.
///
/// # Examples
///
/// ```
/// use s3v2_auth::canonical::encode_path;
///
/// assert_eq!(encode_path("/test/user.json"), "/test/user.json");
/// assert_eq!(encode_path("/hello world.txt"), "/hello%20world.txt");
/// assert_eq!(encode_path("/hello%20world.txt"), "/hello%20world.txt");
/// assert_eq!(encode_path("/raw%FF.bin"), "/raw%FF.bin");
/// ```
#[must_use]
pub fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            let decoded: Vec<u8> = percent_decode_str(segment).collect();
            percent_encode(&decoded, URI_ENCODE_SET).to_string()
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Percent-encode a value for use in a query string.
///
/// # Examples
///
/// ```
/// use s3v2_auth::canonical::escape_query_value;
///
/// assert_eq!(escape_query_value("a+b/c="), "a%2Bb%2Fc%3D");
/// ```
#[must_use]
pub fn escape_query_value(value: &str) -> String {
    utf8_percent_encode(value, URI_ENCODE_SET).to_string()
}
