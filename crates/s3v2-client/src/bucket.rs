//! Bucket handle and the object CRUD surface.

use std::io;
use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::{Stream, StreamExt, TryStreamExt};
use http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use typed_builder::TypedBuilder;

use crate::client::Client;
use crate::endpoint::{BucketContext, EndpointContext};
use crate::error::{ClientError, ClientResult};
use crate::transport::{Body, Response};
use crate::utils::content_type_for;

/// Query options for [`Bucket::list`].
///
/// These travel as plain query parameters and are not part of the signed
/// resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct ListOptions {
    /// Only keys starting with this prefix.
    #[builder(default, setter(strip_option, into))]
    #[serde(default)]
    pub prefix: Option<String>,
    /// Start listing after this key.
    #[builder(default, setter(strip_option, into))]
    #[serde(default)]
    pub marker: Option<String>,
    /// Upper bound on returned keys.
    #[builder(default, setter(strip_option))]
    #[serde(default)]
    pub max_keys: Option<u32>,
    /// Group keys sharing a prefix up to this delimiter.
    #[builder(default, setter(strip_option, into))]
    #[serde(default)]
    pub delimiter: Option<String>,
}

impl ListOptions {
    /// Query parameters in S3 wire names, in a fixed order.
    #[must_use]
    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(prefix) = &self.prefix {
            params.push(("prefix", prefix.clone()));
        }
        if let Some(marker) = &self.marker {
            params.push(("marker", marker.clone()));
        }
        if let Some(max_keys) = self.max_keys {
            params.push(("max-keys", max_keys.to_string()));
        }
        if let Some(delimiter) = &self.delimiter {
            params.push(("delimiter", delimiter.clone()));
        }
        params
    }
}

/// A bucket on the service, addressed virtual-host style.
///
/// Obtained from [`Client::bucket`]. Every operation builds a fresh signed
/// request; the handle itself holds no mutable state.
#[derive(Debug, Clone)]
pub struct Bucket {
    client: Client,
    context: BucketContext,
}

impl Bucket {
    pub(crate) fn new(client: Client, context: BucketContext) -> Self {
        Self { client, context }
    }

    /// The bucket name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.context.bucket()
    }

    /// The bucket's endpoint context.
    #[must_use]
    pub fn context(&self) -> &BucketContext {
        &self.context
    }

    /// The client this bucket belongs to.
    #[must_use]
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Upload the file at `src` to `key`.
    ///
    /// The whole file is read into memory first. `Content-Length` and a
    /// `Content-Type` guessed from the file extension are sent unless
    /// `headers` overrides them.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Source`] if the file cannot be read, or a
    /// transport error.
    pub async fn put_file(
        &self,
        src: impl AsRef<Path>,
        key: &str,
        headers: &HeaderMap,
    ) -> ClientResult<Response> {
        let src = src.as_ref();
        let data = tokio::fs::read(src).await?;
        debug!(path = %src.display(), key, size = data.len(), "Read upload source");

        let mut merged = HeaderMap::new();
        merged.insert(CONTENT_LENGTH, HeaderValue::from(data.len()));
        merged.insert(CONTENT_TYPE, header_from_mime(&content_type_for(src))?);
        merged.extend(headers.clone());

        let request = self.client.put(&self.context, key, &merged)?;
        self.client.send(request, Body::Bytes(Bytes::from(data))).await
    }

    /// Upload an in-memory buffer to `key`.
    ///
    /// Only `Content-Length` is defaulted; pass `Content-Type` in `headers`.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the exchange fails.
    pub async fn put_bytes(
        &self,
        bytes: impl Into<Bytes>,
        key: &str,
        headers: &HeaderMap,
    ) -> ClientResult<Response> {
        let bytes = bytes.into();

        let mut merged = HeaderMap::new();
        merged.insert(CONTENT_LENGTH, HeaderValue::from(bytes.len()));
        merged.extend(headers.clone());

        let request = self.client.put(&self.context, key, &merged)?;
        self.client.send(request, Body::Bytes(bytes)).await
    }

    /// Upload a stream of chunks to `key` without buffering it.
    ///
    /// `content_length` must be the exact total size. `Content-Type` defaults
    /// to `application/octet-stream`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Source`] if `stream` yields an error (this takes
    /// precedence over the transport failure it causes), or a transport
    /// error.
    pub async fn put_stream<S>(
        &self,
        stream: S,
        content_length: u64,
        key: &str,
        headers: &HeaderMap,
    ) -> ClientResult<Response>
    where
        S: Stream<Item = io::Result<Bytes>> + Send + 'static,
    {
        let mut merged = HeaderMap::new();
        merged.insert(CONTENT_LENGTH, HeaderValue::from(content_length));
        merged.insert(
            CONTENT_TYPE,
            header_from_mime(&mime::APPLICATION_OCTET_STREAM)?,
        );
        merged.extend(headers.clone());

        let request = self.client.put(&self.context, key, &merged)?;

        let source_error: Arc<Mutex<Option<io::Error>>> = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&source_error);
        let body = stream
            .map_err(move |e| {
                warn!(error = %e, "Upload stream failed");
                let forwarded = io::Error::new(e.kind(), e.to_string());
                *slot.lock() = Some(e);
                forwarded
            })
            .boxed();

        let result = self.client.send(request, Body::Stream(body)).await;
        if let Some(e) = source_error.lock().take() {
            return Err(ClientError::Source(e));
        }
        result
    }

    /// Download `key`.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the exchange fails.
    pub async fn get_file(&self, key: &str, headers: &HeaderMap) -> ClientResult<Response> {
        let request = self.client.get(&self.context, key, headers)?;
        self.client.send(request, Body::Empty).await
    }

    /// Fetch the metadata of `key`.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the exchange fails.
    pub async fn head_file(&self, key: &str, headers: &HeaderMap) -> ClientResult<Response> {
        let request = self.client.head(&self.context, key, headers)?;
        self.client.send(request, Body::Empty).await
    }

    /// Delete `key`.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the exchange fails.
    pub async fn delete_file(&self, key: &str, headers: &HeaderMap) -> ClientResult<Response> {
        let request = self.client.delete(&self.context, key, headers)?;
        self.client.send(request, Body::Empty).await
    }

    /// Create the bucket (`PUT /`).
    ///
    /// # Errors
    ///
    /// Returns a transport error if the exchange fails.
    pub async fn create(&self, headers: &HeaderMap) -> ClientResult<Response> {
        let request = self.client.put(&self.context, "/", headers)?;
        self.client.send(request, Body::Empty).await
    }

    /// Remove the bucket (`DELETE /`).
    ///
    /// # Errors
    ///
    /// Returns a transport error if the exchange fails.
    pub async fn remove(&self, headers: &HeaderMap) -> ClientResult<Response> {
        let request = self.client.delete(&self.context, "/", headers)?;
        self.client.send(request, Body::Empty).await
    }

    /// List objects under `key` (usually `"/"`).
    ///
    /// The raw response is returned; the XML body is not parsed.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the exchange fails.
    pub async fn list(
        &self,
        key: &str,
        options: &ListOptions,
        headers: &HeaderMap,
    ) -> ClientResult<Response> {
        let params = options.query_params();
        let request = self
            .client
            .get(&self.context, key, headers)?
            .with_query(params.iter().map(|(name, value)| (*name, value.as_str())));
        self.client.send(request, Body::Empty).await
    }

    /// Public URL of `key` in this bucket.
    #[must_use]
    pub fn url(&self, key: &str) -> String {
        self.context.url(key)
    }

    /// Presigned `GET` URL for `key`, valid until `expiration`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidKey`] for keys with `.` or `..` segments.
    pub fn signed_url(&self, key: &str, expiration: DateTime<Utc>) -> ClientResult<String> {
        self.client.signed_url(&self.context, key, expiration)
    }
}

fn header_from_mime(mime: &mime::Mime) -> ClientResult<HeaderValue> {
    HeaderValue::from_str(mime.as_ref())
        .map_err(|e| ClientError::InvalidHeader(format!("{mime}: {e}")))
}
