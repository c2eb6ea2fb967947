//! The service-level client handle.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use http::HeaderMap;
use s3v2_auth::{Credentials, presign};
use tracing::{debug, info, warn};

use crate::bucket::Bucket;
use crate::config::ClientConfig;
use crate::endpoint::{BucketContext, ClientContext, EndpointContext, Scheme, validate_key};
use crate::error::ClientResult;
use crate::request::{RequestBuilder, SignedRequest, Verb};
use crate::transport::{Body, ReqwestTransport, Response, Transport};

/// Client for a SigV2 S3-compatible service.
///
/// Configuration and credentials are validated once at construction and
/// never change afterwards. Cloning is cheap; clones share the same state and
/// transport, so concurrent requests need no coordination.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    config: ClientConfig,
    credentials: Credentials,
    context: ClientContext,
    transport: Arc<dyn Transport>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.inner.config)
            .field("context", &self.inner.context)
            .field("transport", &self.inner.transport)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Create a client that sends requests with `reqwest`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Configuration`](crate::ClientError::Configuration)
    /// if a credential is missing or the endpoint is invalid.
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        Self::with_transport(config, Arc::new(ReqwestTransport::new()))
    }

    /// Create a client that sends requests through `transport`.
    ///
    /// # Errors
    ///
    /// Same as [`Client::new`].
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> ClientResult<Self> {
        let credentials =
            Credentials::from_parts(config.access_key.clone(), config.secret_key.clone())?;
        let context = ClientContext::new(config.endpoint.clone(), Scheme::from_secure(config.secure))?;

        info!(
            endpoint = %config.endpoint,
            secure = config.secure,
            default_acl = %config.default_acl,
            "Configured s3v2 client"
        );

        Ok(Self {
            inner: Arc::new(ClientInner {
                config,
                credentials,
                context,
                transport,
            }),
        })
    }

    /// Create a client from environment variables (see
    /// [`ClientConfig::from_env`]).
    ///
    /// # Errors
    ///
    /// Same as [`Client::new`].
    pub fn from_env() -> ClientResult<Self> {
        Self::new(ClientConfig::from_env())
    }

    /// The configuration this client was built from.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// The access key ID requests are signed with.
    #[must_use]
    pub fn access_key(&self) -> &str {
        self.inner.credentials.access_key()
    }

    /// The service-level endpoint context.
    #[must_use]
    pub fn context(&self) -> &ClientContext {
        &self.inner.context
    }

    /// A handle on `name`, addressed as a virtual-hosted bucket.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Configuration`](crate::ClientError::Configuration)
    /// if `name` is empty.
    pub fn bucket(&self, name: impl Into<String>) -> ClientResult<Bucket> {
        let context = BucketContext::new(name, &self.inner.context)?;
        Ok(Bucket::new(self.clone(), context))
    }

    fn builder(&self) -> RequestBuilder<'_> {
        RequestBuilder::new(&self.inner.credentials, &self.inner.config.default_acl)
    }

    /// Build a signed request without sending it.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidHeader`](crate::ClientError::InvalidHeader)
    /// if a header value cannot be signed or sent.
    pub fn request(
        &self,
        verb: Verb,
        context: &dyn EndpointContext,
        key: &str,
        headers: &HeaderMap,
    ) -> ClientResult<SignedRequest> {
        self.builder().build(verb, context, key, headers)
    }

    /// Build a signed `PUT` request.
    ///
    /// # Errors
    ///
    /// See [`Client::request`].
    pub fn put(
        &self,
        context: &dyn EndpointContext,
        key: &str,
        headers: &HeaderMap,
    ) -> ClientResult<SignedRequest> {
        self.request(Verb::Put, context, key, headers)
    }

    /// Build a signed `GET` request.
    ///
    /// # Errors
    ///
    /// See [`Client::request`].
    pub fn get(
        &self,
        context: &dyn EndpointContext,
        key: &str,
        headers: &HeaderMap,
    ) -> ClientResult<SignedRequest> {
        self.request(Verb::Get, context, key, headers)
    }

    /// Build a signed `HEAD` request.
    ///
    /// # Errors
    ///
    /// See [`Client::request`].
    pub fn head(
        &self,
        context: &dyn EndpointContext,
        key: &str,
        headers: &HeaderMap,
    ) -> ClientResult<SignedRequest> {
        self.request(Verb::Head, context, key, headers)
    }

    /// Build a signed `DELETE` request.
    ///
    /// # Errors
    ///
    /// See [`Client::request`].
    pub fn delete(
        &self,
        context: &dyn EndpointContext,
        key: &str,
        headers: &HeaderMap,
    ) -> ClientResult<SignedRequest> {
        self.request(Verb::Delete, context, key, headers)
    }

    /// Send a signed request through the configured transport.
    ///
    /// The response status is not interpreted.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Transport`](crate::ClientError::Transport) when
    /// the exchange fails.
    pub async fn send(&self, request: SignedRequest, body: Body) -> ClientResult<Response> {
        let verb = request.verb();
        let url = request.url().to_owned();

        let response = self
            .inner
            .transport
            .send(request, body)
            .await
            .inspect_err(|e| warn!(verb = %verb, url = %url, error = %e, "Request failed"))?;

        debug!(verb = %verb, url = %url, status = %response.status(), "Request completed");
        Ok(response)
    }

    /// List the buckets owned by the credentials (`GET /` on the service).
    ///
    /// The raw response is returned; the XML body is not parsed.
    ///
    /// # Errors
    ///
    /// See [`Client::request`] and [`Client::send`].
    pub async fn list_buckets(&self, headers: &HeaderMap) -> ClientResult<Response> {
        let request = self.get(&self.inner.context, "/", headers)?;
        self.send(request, Body::Empty).await
    }

    /// Public URL of `key` on the service endpoint.
    #[must_use]
    pub fn url(&self, key: &str) -> String {
        self.inner.context.url(key)
    }

    /// Presigned `GET` URL for `key`, valid until `expiration`.
    ///
    /// Pure computation: nothing is sent.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidKey`](crate::ClientError::InvalidKey) for
    /// keys with `.` or `..` segments.
    pub fn signed_url(
        &self,
        context: &dyn EndpointContext,
        key: &str,
        expiration: DateTime<Utc>,
    ) -> ClientResult<String> {
        validate_key(key)?;

        let resource = context.canonical_resource(key);
        let query = presign(
            &self.inner.credentials,
            Verb::Get.as_str(),
            &resource,
            expiration.timestamp(),
        );
        Ok(format!("{}?{}", context.url(key), query.to_query_string()))
    }
}
