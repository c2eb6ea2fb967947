//! Signed request assembly.
//!
//! [`RequestBuilder`] turns `(verb, context, key, headers)` into a
//! [`SignedRequest`]:
//!
//! 1. Default headers are laid down: `Date` and `Host`, plus `Expect` and
//!    `x-amz-acl` for `PUT`.
//! 2. Caller headers are merged over the defaults (case-insensitive, last
//!    merge wins).
//! 3. The SigV2 string-to-sign is built from the merged headers and the
//!    context's canonical resource, signed, and attached as `Authorization`.
//!
//! Building performs no I/O. A request is never reused: each build stamps its
//! own `Date`.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use http::header::{AUTHORIZATION, CONTENT_TYPE, DATE, EXPECT, HOST};
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use s3v2_auth::canonical::{canonicalize_amz_headers, escape_query_value};
use s3v2_auth::{Credentials, HeaderStringToSign, authorization_header};
use tracing::debug;

use crate::endpoint::{EndpointContext, validate_key};
use crate::error::{ClientError, ClientResult};
use crate::utils::http_date;

/// Canned ACL header.
pub const X_AMZ_ACL: HeaderName = HeaderName::from_static("x-amz-acl");

/// Alternate request date; when present the `Date` line is signed empty.
pub const X_AMZ_DATE: HeaderName = HeaderName::from_static("x-amz-date");

/// `Content-MD5` header (not among `http`'s named constants).
pub const CONTENT_MD5: HeaderName = HeaderName::from_static("content-md5");

/// HTTP verbs the client issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    /// `GET`
    Get,
    /// `PUT`
    Put,
    /// `HEAD`
    Head,
    /// `DELETE`
    Delete,
}

impl Verb {
    /// The verb as it appears on the request line and in the string-to-sign.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Put => "PUT",
            Self::Head => "HEAD",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verb {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "PUT" => Ok(Self::Put),
            "HEAD" => Ok(Self::Head),
            "DELETE" => Ok(Self::Delete),
            _ => Err(ClientError::Configuration(format!(
                "unsupported HTTP verb: {s:?}"
            ))),
        }
    }
}

impl From<Verb> for Method {
    fn from(verb: Verb) -> Self {
        match verb {
            Verb::Get => Method::GET,
            Verb::Put => Method::PUT,
            Verb::Head => Method::HEAD,
            Verb::Delete => Method::DELETE,
        }
    }
}

/// A request with its `Authorization` header attached, ready to send.
#[derive(Debug, Clone)]
pub struct SignedRequest {
    verb: Verb,
    url: String,
    headers: HeaderMap,
    string_to_sign: String,
}

impl SignedRequest {
    /// HTTP verb.
    #[must_use]
    pub fn verb(&self) -> Verb {
        self.verb
    }

    /// Full request URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Merged headers, including `Authorization`.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The exact string that was signed.
    #[must_use]
    pub fn string_to_sign(&self) -> &str {
        &self.string_to_sign
    }

    /// Append query parameters to the URL.
    ///
    /// Plain query parameters are not part of a SigV2 canonical resource, so
    /// the signature stays valid. Values are percent-escaped.
    #[must_use]
    pub fn with_query<'a, I>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        for (name, value) in params {
            let separator = if self.url.contains('?') { '&' } else { '?' };
            self.url.push(separator);
            self.url.push_str(name);
            self.url.push('=');
            self.url.push_str(&escape_query_value(value));
        }
        self
    }

    /// Split into verb, URL and headers for a transport.
    #[must_use]
    pub fn into_parts(self) -> (Verb, String, HeaderMap) {
        (self.verb, self.url, self.headers)
    }
}

/// Builds [`SignedRequest`]s from borrowed, immutable client state.
#[derive(Debug, Clone, Copy)]
pub struct RequestBuilder<'a> {
    credentials: &'a Credentials,
    default_acl: &'a str,
}

impl<'a> RequestBuilder<'a> {
    /// Create a builder signing with `credentials`; `PUT` requests get
    /// `default_acl` unless the caller sends `x-amz-acl`.
    #[must_use]
    pub fn new(credentials: &'a Credentials, default_acl: &'a str) -> Self {
        Self {
            credentials,
            default_acl,
        }
    }

    /// Build a signed request stamped with the current time.
    pub fn build(
        &self,
        verb: Verb,
        context: &dyn EndpointContext,
        key: &str,
        headers: &HeaderMap,
    ) -> ClientResult<SignedRequest> {
        self.build_at(verb, context, key, headers, Utc::now())
    }

    /// Build a signed request stamped with `now`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidKey`] for keys with `.` or `..`
    /// segments, or [`ClientError::InvalidHeader`] for header values that
    /// cannot be signed.
    pub fn build_at(
        &self,
        verb: Verb,
        context: &dyn EndpointContext,
        key: &str,
        headers: &HeaderMap,
        now: DateTime<Utc>,
    ) -> ClientResult<SignedRequest> {
        validate_key(key)?;

        let mut merged = HeaderMap::new();
        merged.insert(DATE, header_value(&http_date(now))?);
        merged.insert(HOST, header_value(context.endpoint_host())?);
        if verb == Verb::Put {
            merged.insert(EXPECT, HeaderValue::from_static("100-continue"));
            merged.insert(X_AMZ_ACL, header_value(self.default_acl)?);
        }
        merged.extend(headers.clone());

        let resource = context.canonical_resource(key);
        let string_to_sign = build_string_to_sign(verb, &merged, &resource)?;
        let authorization = authorization_header(self.credentials, &string_to_sign);
        merged.insert(AUTHORIZATION, header_value(&authorization)?);

        let url = context.url(key);
        debug!(verb = %verb, url = %url, resource = %resource, "Built signed request");

        Ok(SignedRequest {
            verb,
            url,
            headers: merged,
            string_to_sign,
        })
    }
}

/// Build the header-auth string-to-sign from merged request headers.
///
/// When `x-amz-date` is present it travels in the canonical amz headers and
/// the `Date` line is left empty.
fn build_string_to_sign(verb: Verb, headers: &HeaderMap, resource: &str) -> ClientResult<String> {
    let pairs = headers
        .iter()
        .map(|(name, value)| header_text(name, value).map(|text| (name.as_str(), text)))
        .collect::<ClientResult<Vec<_>>>()?;
    let canonical_headers = canonicalize_amz_headers(pairs);
    let date = if headers.contains_key(X_AMZ_DATE) {
        ""
    } else {
        optional_header(headers, &DATE)?
    };

    Ok(HeaderStringToSign {
        verb: verb.as_str(),
        content_md5: optional_header(headers, &CONTENT_MD5)?,
        content_type: optional_header(headers, &CONTENT_TYPE)?,
        date,
        canonical_headers: &canonical_headers,
        resource,
    }
    .build())
}

/// Value of `name`, or `""` when the request doesn't carry it.
fn optional_header<'h>(headers: &'h HeaderMap, name: &HeaderName) -> ClientResult<&'h str> {
    headers
        .get(name)
        .map_or(Ok(""), |value| header_text(name, value))
}

/// A header value as UTF-8 text, which is what gets signed.
fn header_text<'v>(name: &HeaderName, value: &'v HeaderValue) -> ClientResult<&'v str> {
    std::str::from_utf8(value.as_bytes())
        .map_err(|_| ClientError::InvalidHeader(format!("{name}: value is not valid UTF-8")))
}

fn header_value(value: &str) -> ClientResult<HeaderValue> {
    HeaderValue::from_str(value).map_err(|e| ClientError::InvalidHeader(format!("{value:?}: {e}")))
}
