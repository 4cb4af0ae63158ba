//! Outbound dispatch to the primary and secondary backends.
//!
//! Every backend gets its own [`Upstream`]: a resolved [`Backend`] plus a
//! dedicated hyper client whose connector is bounded by the backend's
//! timeout. Each request to a backend runs as a *lane* in its own task:
//!
//! - the primary lane is awaited and its result relayed to the caller;
//! - secondary lanes are detached. They report only through the log and
//!   the handler never waits for them.
//!
//! A lane's result, including a panic inside it, is turned into a
//! [`DispatchError`] by the lane's completion handler, so one failing
//! backend cannot affect the others or the process.
//!
//! **Shutdown behavior:** secondary lanes may be cancelled by the Tokio
//! runtime during shutdown before completing.

use std::time::{Duration, Instant};

use axum::http::header::CONNECTION;
use axum::http::{HeaderMap, HeaderValue, Request, StatusCode, Version};
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use tokio::task::JoinError;

use super::clone::RequestClone;
use super::headers::strip_hop_by_hop;
use super::target::{self, Backend};

pub type HttpsConnector = hyper_rustls::HttpsConnector<HttpConnector>;
pub type HttpClient = Client<HttpsConnector, Full<Bytes>>;

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("failed to build request: {0}")]
    Build(#[from] axum::http::Error),

    #[error("failed to connect: {source}")]
    Connect {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("failed to send request: {source}")]
    Send {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("failed to read response: {source}")]
    Read {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("lane panicked: {0}")]
    Panicked(String),
}

impl From<hyper_util::client::legacy::Error> for DispatchError {
    fn from(e: hyper_util::client::legacy::Error) -> Self {
        if e.is_connect() {
            Self::Connect {
                source: Box::new(e),
            }
        } else {
            Self::Send {
                source: Box::new(e),
            }
        }
    }
}

impl From<JoinError> for DispatchError {
    fn from(e: JoinError) -> Self {
        if e.is_panic() {
            let payload = e.into_panic();
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic payload".into());
            Self::Panicked(message)
        } else {
            Self::Panicked(e.to_string())
        }
    }
}

/// A fully read upstream response.
#[derive(Debug, Clone)]
pub struct DispatchResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Options shared by every lane of a request.
#[derive(Debug, Clone, Copy, Default)]
pub struct LaneOptions {
    pub close_connections: bool,
    pub debug: bool,
}

#[must_use]
pub fn build_http_client(connect_timeout: Duration, close_connections: bool) -> HttpClient {
    // When multiple rustls crypto providers are compiled in (axum-server pulls
    // in `aws-lc-rs`), rustls cannot auto-detect which one to use. Explicitly
    // install `ring` as the default provider.
    let _ = rustls::crypto::ring::default_provider().install_default();

    let mut http = HttpConnector::new();
    http.enforce_http(false);
    http.set_connect_timeout(Some(connect_timeout));

    let https = hyper_rustls::HttpsConnectorBuilder::new()
        .with_webpki_roots()
        .https_or_http()
        .enable_http1()
        .wrap_connector(http);

    let mut builder = Client::builder(TokioExecutor::new());
    builder.pool_idle_timeout(Duration::from_secs(30));
    if close_connections {
        builder.pool_max_idle_per_host(0);
    }
    builder.build(https)
}

/// One backend and the client used to reach it.
#[derive(Clone)]
pub struct Upstream {
    pub backend: Backend,
    client: HttpClient,
}

impl Upstream {
    #[must_use]
    pub fn new(backend: Backend, close_connections: bool) -> Self {
        let client = build_http_client(backend.timeout, close_connections);
        Self { backend, client }
    }

    /// Send an already resolved clone and read the whole response.
    ///
    /// The backend's timeout bounds the full exchange: send, response head
    /// and body.
    pub async fn send(
        &self,
        clone: RequestClone,
        close_connection: bool,
    ) -> Result<DispatchResponse, DispatchError> {
        let request = outbound_request(clone, close_connection)?;

        let exchange = async {
            let response = self.client.request(request).await?;
            let (parts, body) = response.into_parts();
            let body = body
                .collect()
                .await
                .map_err(|e| DispatchError::Read {
                    source: Box::new(e),
                })?
                .to_bytes();
            Ok::<_, DispatchError>(DispatchResponse {
                status: parts.status,
                headers: parts.headers,
                body,
            })
        };

        tokio::time::timeout(self.backend.timeout, exchange)
            .await
            .map_err(|_| DispatchError::Timeout(self.backend.timeout))?
    }
}

impl std::fmt::Debug for Upstream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Upstream")
            .field("backend", &self.backend)
            .finish_non_exhaustive()
    }
}

/// Turn a resolved clone into an HTTP/1.1 request for the outbound leg.
fn outbound_request(
    clone: RequestClone,
    close_connection: bool,
) -> Result<Request<Full<Bytes>>, DispatchError> {
    let mut headers = clone.headers;
    strip_hop_by_hop(&mut headers);
    if close_connection {
        headers.insert(CONNECTION, HeaderValue::from_static("close"));
    }

    let mut request = Request::builder()
        .method(clone.method)
        .uri(clone.uri)
        .version(Version::HTTP_11)
        .body(Full::new(clone.body))?;
    *request.headers_mut() = headers;
    Ok(request)
}

/// Resolve the clone against the lane's backend and perform the exchange.
async fn run_lane(
    upstream: Upstream,
    mut clone: RequestClone,
    close_connection: bool,
) -> Result<DispatchResponse, DispatchError> {
    target::resolve(&mut clone, &upstream.backend)?;
    upstream.send(clone, close_connection).await
}

/// Run `lane` in its own task so a panic surfaces as a [`DispatchError`].
async fn isolate<F>(lane: F) -> Result<DispatchResponse, DispatchError>
where
    F: std::future::Future<Output = Result<DispatchResponse, DispatchError>> + Send + 'static,
{
    match tokio::spawn(lane).await {
        Ok(result) => result,
        Err(join_err) => Err(join_err.into()),
    }
}

/// Dispatch to the primary backend and wait for its response.
#[allow(clippy::cast_possible_truncation)]
pub async fn dispatch_primary(
    upstream: &Upstream,
    clone: RequestClone,
    options: LaneOptions,
) -> Result<DispatchResponse, DispatchError> {
    let request_line = clone.request_line();
    let origin = upstream.backend.origin();
    let start = Instant::now();

    let result = isolate(run_lane(upstream.clone(), clone, options.close_connections)).await;
    let latency_ms = start.elapsed().as_millis() as u64;

    match &result {
        Ok(response) => {
            let status = response.status.as_u16();
            tracing::info!(
                lane = "A",
                backend = %origin,
                status,
                latency_ms,
                "| A | \"{request_line}\" {status}"
            );
        }
        Err(e) => {
            tracing::error!(
                lane = "A",
                backend = %origin,
                error = %e,
                latency_ms,
                "primary request failed: \"{request_line}\""
            );
        }
    }

    result
}

/// Fire-and-forget dispatch to one secondary backend.
///
/// The spawned task owns its clone and client handle end to end. Failures
/// are logged only when `options.debug` is set.
#[allow(clippy::cast_possible_truncation)]
pub fn spawn_secondary(
    index: usize,
    upstream: Upstream,
    clone: RequestClone,
    options: LaneOptions,
) {
    let request_line = clone.request_line();
    let origin = upstream.backend.origin();

    tokio::spawn(async move {
        let start = Instant::now();
        let result = isolate(run_lane(upstream, clone, options.close_connections)).await;
        let latency_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(response) => {
                let status = response.status.as_u16();
                tracing::info!(
                    lane = "B",
                    secondary = index,
                    backend = %origin,
                    status,
                    latency_ms,
                    "| B | \"{request_line}\" {status}"
                );
            }
            Err(e) if options.debug => {
                tracing::warn!(
                    lane = "B",
                    secondary = index,
                    backend = %origin,
                    error = %e,
                    latency_ms,
                    "secondary request failed: \"{request_line}\""
                );
            }
            Err(_) => {}
        }
    });
}
