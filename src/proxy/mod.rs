//! Traffic duplication and dual dispatch.
//!
//! The [`forward_handler`] function is the Axum fallback that receives
//! every request and hands it to the [`MirrorEngine`]. The engine enriches
//! forwarding headers, decides whether secondaries see the request,
//! clones it, and dispatches the clones. Submodules handle request
//! duplication ([`clone`]), backend addressing ([`target`]), sampling
//! ([`sampling`]), method eligibility ([`filter`]), header handling
//! ([`headers`]), outbound lanes ([`dispatch`]) and the response relay
//! ([`relay`]).

pub mod clone;
pub mod dispatch;
pub mod filter;
pub mod headers;
pub mod relay;
pub mod sampling;
pub mod target;

use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::Method;
use axum::response::Response;

use crate::config::model::Config;
use crate::error::ShadowteeError;
use crate::server::AppState;
use clone::BodyTooLarge;
use dispatch::{DispatchError, DispatchResponse, LaneOptions, Upstream};
use filter::MethodFilter;
use sampling::{RandomSource, Sampler};
use target::Backend;

/// What happened to one inbound request.
#[derive(Debug)]
pub struct MirrorOutcome {
    /// Number of secondary lanes spawned.
    pub mirrored: usize,
    pub primary: Result<DispatchResponse, DispatchError>,
}

/// Immutable per-process dispatch state built from the config at startup.
#[derive(Debug)]
pub struct MirrorEngine {
    primary: Upstream,
    secondaries: Vec<Upstream>,
    sampler: Sampler,
    methods: MethodFilter,
    forward_client_ip: bool,
    lane_options: LaneOptions,
}

impl MirrorEngine {
    pub fn from_config(
        config: &Config,
        random: Arc<dyn RandomSource>,
    ) -> Result<Self, ShadowteeError> {
        let close_connections = config.defaults.close_connections;

        let primary = Backend::from_config(&config.primary, config.primary_timeout())?;
        let secondaries = config
            .secondaries
            .iter()
            .map(|b| {
                Backend::from_config(b, config.secondary_timeout(b))
                    .map(|backend| Upstream::new(backend, close_connections))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            primary: Upstream::new(primary, close_connections),
            secondaries,
            sampler: Sampler::new(config.mirror.percent, random),
            methods: MethodFilter::new(config.mirror.methods.as_deref())?,
            forward_client_ip: config.defaults.forward_client_ip,
            lane_options: LaneOptions {
                close_connections,
                debug: config.debug,
            },
        })
    }

    #[must_use]
    pub const fn primary(&self) -> &Backend {
        &self.primary.backend
    }

    pub fn secondaries(&self) -> impl Iterator<Item = &Backend> {
        self.secondaries.iter().map(|u| &u.backend)
    }

    #[must_use]
    pub const fn sampler(&self) -> &Sampler {
        &self.sampler
    }

    #[must_use]
    pub const fn close_connections(&self) -> bool {
        self.lane_options.close_connections
    }

    /// Whether secondaries receive a request with this method.
    ///
    /// The sampler draw happens only for eligible methods, once per call.
    #[must_use]
    pub fn should_mirror(&self, method: &Method) -> bool {
        !self.secondaries.is_empty()
            && self.methods.eligible(method.as_str())
            && self.sampler.should_mirror()
    }

    /// Mirror `request` to the eligible secondaries and return the primary's outcome.
    ///
    /// The body is read in full before any lane starts; a body over the
    /// size limit dispatches nothing. Secondary lanes are spawned before
    /// the primary is dispatched and are never awaited.
    pub async fn handle(
        &self,
        request: Request,
        remote_addr: &str,
    ) -> Result<MirrorOutcome, BodyTooLarge> {
        let (mut parts, body) = request.into_parts();
        let body = clone::read_body(body).await?;

        if self.forward_client_ip {
            headers::enrich_forwarded_headers(&mut parts.headers, remote_addr);
        }

        let mirror = self.should_mirror(&parts.method);
        let mirrored = if mirror { self.secondaries.len() } else { 0 };

        let mut clones = clone::clone_request(&parts, &body, 1 + mirrored);
        let primary_clone = clones.swap_remove(0);

        for (index, (upstream, clone)) in self.secondaries.iter().zip(clones).enumerate() {
            dispatch::spawn_secondary(index, upstream.clone(), clone, self.lane_options);
        }

        let primary = dispatch::dispatch_primary(&self.primary, primary_clone, self.lane_options).await;

        Ok(MirrorOutcome { mirrored, primary })
    }
}

pub async fn forward_handler(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let engine = &state.engine;
    let request_line = format!("{} {}", request.method(), request.uri());

    let outcome = match engine.handle(request, &addr.to_string()).await {
        Ok(outcome) => outcome,
        Err(e) => {
            state.stats.rejected.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(client = %addr, error = %e, "rejected \"{request_line}\"");
            return relay::body_too_large(engine.close_connections());
        }
    };

    if outcome.mirrored > 0 {
        state.stats.mirrored.fetch_add(1, Ordering::Relaxed);
    }

    match outcome.primary {
        Ok(response) => {
            state.stats.forwarded.fetch_add(1, Ordering::Relaxed);
            relay::relay(response, engine.close_connections())
        }
        Err(_) => {
            state.stats.failed.fetch_add(1, Ordering::Relaxed);
            relay::primary_unavailable(engine.close_connections())
        }
    }
}
