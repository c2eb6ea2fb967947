//! Integration tests for the s3v2 client.
//!
//! Two kinds of tests live here:
//!
//! - Wire tests (`test_wire`) run against an in-process HTTP server that
//!   records every request and re-derives its signature. They always run.
//! - Live tests (`test_bucket`, `test_object`) need an S3-compatible service
//!   that accepts Signature V2 with virtual-hosted buckets. They are marked
//!   `#[ignore]` so they don't run during normal `cargo test`.
//!
//! Run the live tests with:
//! ```text
//! S3_ENDPOINT=s3.localhost.localstack.cloud:4566 cargo test -p s3v2-integration -- --ignored
//! ```

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::{Arc, Once};

use bytes::Bytes;
use http::{HeaderMap, Method, Request, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use parking_lot::Mutex;
use s3v2_client::{Client, ClientConfig, ReqwestTransport};
use tokio::net::TcpListener;
use tracing::warn;

static INIT: Once = Once::new();

/// Initialize tracing (once).
fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// Access key the wire server expects.
pub const WIRE_ACCESS_KEY: &str = "AK";

/// Secret key the wire server expects.
pub const WIRE_SECRET_KEY: &str = "secret";

/// Host name the wire server answers for; buckets live under it.
pub const WIRE_DOMAIN: &str = "s3.test";

/// Create a client for the live service configured through the environment.
///
/// Falls back to LocalStack defaults when variables are unset.
#[must_use]
pub fn live_client() -> Client {
    init_tracing();

    let mut config = ClientConfig::from_env();
    if std::env::var("S3_ENDPOINT").is_err() {
        config.endpoint = "s3.localhost.localstack.cloud:4566".to_owned();
    }
    config.access_key.get_or_insert_with(|| "test".to_owned());
    config.secret_key.get_or_insert_with(|| "test".to_owned());

    Client::new(config).unwrap_or_else(|e| panic!("invalid live client configuration: {e}"))
}

/// Generate a unique bucket name for a test.
#[must_use]
pub fn test_bucket_name(prefix: &str) -> String {
    let id = uuid::Uuid::new_v4().to_string()[..8].to_owned();
    format!("test-{prefix}-{id}")
}

/// Delete the given keys, then the bucket. Errors are ignored.
pub async fn cleanup_bucket(client: &Client, bucket: &str, keys: &[&str]) {
    let Ok(bucket) = client.bucket(bucket) else {
        return;
    };
    for key in keys {
        let _ = bucket.delete_file(key, &HeaderMap::new()).await;
    }
    let _ = bucket.remove(&HeaderMap::new()).await;
}

/// A request as the wire server received it.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    /// HTTP method.
    pub method: Method,
    /// Request path, without the query.
    pub path: String,
    /// Raw query string, if any.
    pub query: Option<String>,
    /// All request headers.
    pub headers: HeaderMap,
    /// The collected body.
    pub body: Bytes,
}

impl CapturedRequest {
    /// Host header value.
    #[must_use]
    pub fn host(&self) -> &str {
        self.headers
            .get(http::header::HOST)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
    }

    /// Resource the signature covers: `/bucket` + path for bucket hosts,
    /// the bare path for the service host.
    #[must_use]
    pub fn signed_resource(&self) -> String {
        let host = self.host().split(':').next().unwrap_or_default();
        match host.strip_suffix(&format!(".{WIRE_DOMAIN}")) {
            Some(bucket) => format!("/{bucket}{}", self.path),
            None => self.path.clone(),
        }
    }
}

/// In-process HTTP server that records requests.
///
/// Paths starting with `/missing` answer `404`; everything else answers `200`
/// with body `ok`.
#[derive(Debug)]
pub struct WireServer {
    addr: SocketAddr,
    captured: Arc<Mutex<Vec<CapturedRequest>>>,
}

impl WireServer {
    /// Bind to an ephemeral local port and start serving.
    pub async fn start() -> Self {
        init_tracing();

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .unwrap_or_else(|e| panic!("cannot bind wire server: {e}"));
        let addr = listener
            .local_addr()
            .unwrap_or_else(|e| panic!("wire server has no address: {e}"));
        let captured = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&captured);
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    continue;
                };
                let sink = Arc::clone(&sink);
                let service = service_fn(move |req: Request<Incoming>| {
                    let sink = Arc::clone(&sink);
                    async move { Ok::<_, Infallible>(record(req, &sink).await) }
                });
                tokio::spawn(async move {
                    if let Err(e) = hyper::server::conn::http1::Builder::new()
                        .serve_connection(TokioIo::new(stream), service)
                        .await
                    {
                        warn!(error = %e, "wire server connection error");
                    }
                });
            }
        });

        Self { addr, captured }
    }

    /// Endpoint to configure clients with (`s3.test:<port>`).
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("{WIRE_DOMAIN}:{}", self.addr.port())
    }

    /// A client whose DNS resolves the service host and the given bucket
    /// hosts to this server.
    #[must_use]
    pub fn client(&self, buckets: &[&str]) -> Client {
        let http = self.http_client(buckets);
        let config = ClientConfig::builder()
            .access_key(WIRE_ACCESS_KEY.into())
            .secret_key(WIRE_SECRET_KEY.into())
            .endpoint(self.endpoint())
            .build();
        Client::with_transport(config, Arc::new(ReqwestTransport::with_client(http)))
            .unwrap_or_else(|e| panic!("invalid wire client configuration: {e}"))
    }

    /// A plain `reqwest` client resolving the same hosts to this server.
    #[must_use]
    pub fn http_client(&self, buckets: &[&str]) -> reqwest::Client {
        let mut builder = reqwest::Client::builder()
            .no_proxy()
            .resolve(WIRE_DOMAIN, self.addr);
        for bucket in buckets {
            builder = builder.resolve(&format!("{bucket}.{WIRE_DOMAIN}"), self.addr);
        }
        builder
            .build()
            .unwrap_or_else(|e| panic!("cannot build reqwest client: {e}"))
    }

    /// Requests received so far.
    #[must_use]
    pub fn captured(&self) -> Vec<CapturedRequest> {
        self.captured.lock().clone()
    }
}

async fn record(
    req: Request<Incoming>,
    sink: &Mutex<Vec<CapturedRequest>>,
) -> http::Response<Full<Bytes>> {
    let (parts, body) = req.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!(error = %e, "wire server failed to read body");
            Bytes::new()
        }
    };

    let path = parts.uri.path().to_owned();
    let status = if path.starts_with("/missing") {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::OK
    };

    sink.lock().push(CapturedRequest {
        method: parts.method,
        path,
        query: parts.uri.query().map(ToOwned::to_owned),
        headers: parts.headers,
        body,
    });

    let mut response = http::Response::new(Full::new(Bytes::from_static(b"ok")));
    *response.status_mut() = status;
    response
}

mod test_wire;
