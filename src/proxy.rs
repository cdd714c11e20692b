//! Proxy façade: endpoint table, HTTP router wiring, and lifecycle.
//!
//! [`Proxy`] owns the routing table and the knobs a deployment configures
//! before serving: the default header set answered on OPTIONS preflights,
//! the post-processing hook, the request-ID generator, and the three log
//! sinks. Everything is frozen when [`Proxy::serve`] snapshots the façade
//! into the shared handler state, so the hot path takes no locks.

use std::collections::HashMap;
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::extract::{ConnectInfo, RawPathParams, Request};
use axum::response::Response;
use axum::routing::{MethodFilter, MethodRouter};
use http::header::{HeaderName, HeaderValue};
use http::request::Parts;
use http::{HeaderMap, Method, StatusCode};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;

use crate::bridge;
use crate::bus::BusClient;
use crate::config::ProxyConfig;
use crate::endpoint::Endpoint;
use crate::error::{BoxError, Error};
use crate::sink::{LogSink, TracingSink};
use crate::wire;

/// Post-processing hook invoked after the bridge has written the status and
/// any bus-originated headers, before the handler returns.
///
/// Receives the response header map, the original request parts, and the
/// decoded reply (`None` on timeouts, on decode failures, and for OPTIONS
/// preflights). Hooks are additive: they may set further headers but cannot
/// change the status or body.
pub type ResponseHook = Arc<dyn Fn(&mut HeaderMap, &Parts, Option<&wire::Response>) + Send + Sync>;

/// Pluggable request-ID source. Must be side-effect free and safe for
/// concurrent use. The default yields fresh UUID v4 strings.
pub type IdGenerator = Arc<dyn Fn() -> String + Send + Sync>;

/// Configuration callback applied in order during [`Proxy::new`].
pub type ProxyOption = Box<dyn FnOnce(&mut Proxy) -> Result<(), BoxError>>;

/// Immutable view of the façade shared with every handler task.
pub(crate) struct ProxyState {
    pub(crate) bus: Arc<dyn BusClient>,
    pub(crate) headers: HashMap<String, String>,
    pub(crate) hook: Option<ResponseHook>,
    pub(crate) get_id: IdGenerator,
    pub(crate) access: Arc<dyn LogSink>,
    pub(crate) debug: Arc<dyn LogSink>,
    pub(crate) requests: Arc<dyn LogSink>,
    pub(crate) config: ProxyConfig,
}

/// HTTP-to-bus proxy.
///
/// Construct with [`Proxy::new`], register endpoints with
/// [`Proxy::handle`], then call [`Proxy::serve`]. The public fields may be
/// mutated freely between construction and serving, typically from
/// functional options.
pub struct Proxy {
    addr: String,
    bus: Arc<dyn BusClient>,
    endpoints: HashMap<(Method, String), Endpoint>,

    /// Default header set merged into OPTIONS preflight responses. May be
    /// empty.
    pub headers: HashMap<String, String>,
    /// Optional post-processing hook, run for every rendered outcome of a
    /// registered route.
    pub hook: Option<ResponseHook>,
    /// Request-ID generator.
    pub get_id: IdGenerator,
    /// Access sink: one entry per bridged request, before the publish.
    pub access: Arc<dyn LogSink>,
    /// Debug sink: diagnostics for read and decode failures.
    pub debug: Arc<dyn LogSink>,
    /// Request sink: one terminal summary line per request, 404s included.
    pub requests: Arc<dyn LogSink>,

    config: ProxyConfig,
    shutdown: CancellationToken,
    force: CancellationToken,
    done: CancellationToken,
    bound: OnceLock<SocketAddr>,
}

impl std::fmt::Debug for Proxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Proxy")
            .field("addr", &self.addr)
            .field("endpoints", &self.endpoints)
            .field("headers", &self.headers)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Proxy {
    /// Create a proxy bound to `addr` once served, bridging to `bus`.
    ///
    /// Each option runs in registration order and may mutate the façade.
    ///
    /// # Errors
    ///
    /// [`Error::NoService`] when `bus` is `None`; [`Error::FuncOpts`] when
    /// an option fails, carrying the underlying message verbatim.
    pub fn new(
        addr: impl Into<String>,
        bus: Option<Arc<dyn BusClient>>,
        options: Vec<ProxyOption>,
    ) -> Result<Self, Error> {
        let bus = bus.ok_or(Error::NoService)?;

        let mut proxy = Self {
            addr: addr.into(),
            bus,
            endpoints: HashMap::new(),
            headers: HashMap::new(),
            hook: None,
            get_id: Arc::new(|| Uuid::new_v4().to_string()),
            access: Arc::new(TracingSink::access()),
            debug: Arc::new(TracingSink::debug()),
            requests: Arc::new(TracingSink::requests()),
            config: ProxyConfig::from_env(),
            shutdown: CancellationToken::new(),
            force: CancellationToken::new(),
            done: CancellationToken::new(),
            bound: OnceLock::new(),
        };

        for option in options {
            option(&mut proxy).map_err(Error::FuncOpts)?;
        }

        Ok(proxy)
    }

    /// The address the proxy serves on.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// The bus client bridged requests are published through.
    pub fn bus(&self) -> &Arc<dyn BusClient> {
        &self.bus
    }

    /// The socket address actually bound, available once [`Proxy::serve`]
    /// has bound the listener.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.bound.get().copied()
    }

    /// Register an endpoint.
    ///
    /// # Errors
    ///
    /// [`Error::DuplicateEndpoint`] when the method and path pair is
    /// already registered; [`Error::UnsupportedMethod`] when the HTTP
    /// router cannot dispatch the method.
    pub fn handle(&mut self, endpoint: Endpoint) -> Result<(), Error> {
        if MethodFilter::try_from(endpoint.method.clone()).is_err() {
            return Err(Error::UnsupportedMethod(endpoint.method));
        }

        let key = (endpoint.method.clone(), endpoint.path.clone());
        if self.endpoints.contains_key(&key) {
            return Err(Error::DuplicateEndpoint {
                method: key.0,
                path: key.1,
            });
        }

        self.endpoints.insert(key, endpoint);
        Ok(())
    }

    /// Serve HTTP until stopped.
    ///
    /// Installs one bridge handler per registered endpoint, an OPTIONS
    /// preflight handler per registered path, and the catch-all 404
    /// handler, then blocks until [`Proxy::stop`] shuts the listener down.
    pub async fn serve(&self) -> std::io::Result<()> {
        let app = self.router();
        let listener = TcpListener::bind(&self.addr).await?;
        let local = listener.local_addr()?;
        let _ = self.bound.set(local);
        info!(addr = %local, "mrpcproxy listening");

        let shutdown = self.shutdown.clone();
        let serving = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .into_future();

        let result = tokio::select! {
            result = serving => result,
            () = self.force.cancelled() => Ok(()),
        };

        info!(addr = %local, "mrpcproxy stopped");
        self.done.cancel();
        result
    }

    /// Gracefully stop serving.
    ///
    /// New connections are refused immediately; in-flight handlers get up
    /// to `deadline` to finish, then the listener and its connections are
    /// torn down. After this returns, client connects fail at the
    /// transport layer.
    pub async fn stop(&self, deadline: Duration) {
        self.shutdown.cancel();
        if self.bound.get().is_none() {
            return;
        }

        if tokio::time::timeout(deadline, self.done.cancelled())
            .await
            .is_err()
        {
            self.force.cancel();
            self.done.cancelled().await;
        }
    }

    /// Build the HTTP router from the endpoint table.
    pub(crate) fn router(&self) -> Router {
        let state = Arc::new(self.snapshot());

        let mut by_path: HashMap<&str, Vec<&Endpoint>> = HashMap::new();
        for endpoint in self.endpoints.values() {
            by_path
                .entry(endpoint.path.as_str())
                .or_default()
                .push(endpoint);
        }

        let mut app = Router::new();
        for (path, endpoints) in by_path {
            let mut methods = MethodRouter::new();
            for endpoint in endpoints {
                // The preflight handler below owns OPTIONS on every
                // registered path; an OPTIONS endpoint is shadowed by it.
                if endpoint.method == Method::OPTIONS {
                    continue;
                }
                let Ok(filter) = MethodFilter::try_from(endpoint.method.clone()) else {
                    continue;
                };

                let st = state.clone();
                let endpoint = Arc::new(endpoint.clone());
                methods = methods.on(
                    filter,
                    move |ConnectInfo(peer): ConnectInfo<SocketAddr>,
                          params: RawPathParams,
                          request: Request| {
                        let st = st.clone();
                        let endpoint = endpoint.clone();
                        async move {
                            let mut pairs = Vec::new();
                            for (key, value) in &params {
                                pairs.push((key.to_owned(), value.to_owned()));
                            }
                            bridge::dispatch(&st, &endpoint, &peer.to_string(), &pairs, request)
                                .await
                        }
                    },
                );
            }

            let st = state.clone();
            methods = methods.options(move |request: Request| {
                let st = st.clone();
                async move { preflight(&st, request) }
            });

            app = app.route(path, methods);
        }

        let st = state.clone();
        app.fallback(move |request: Request| {
            let st = st.clone();
            async move { not_found(&st, request) }
        })
    }

    fn snapshot(&self) -> ProxyState {
        ProxyState {
            bus: self.bus.clone(),
            headers: self.headers.clone(),
            hook: self.hook.clone(),
            get_id: self.get_id.clone(),
            access: self.access.clone(),
            debug: self.debug.clone(),
            requests: self.requests.clone(),
            config: self.config.clone(),
        }
    }
}

/// Answer an OPTIONS preflight: 200 with the default header set merged in,
/// then the hook.
fn preflight(state: &ProxyState, request: Request) -> Response {
    let (parts, _body) = request.into_parts();

    let mut response = Response::new(Body::empty());
    for (name, value) in &state.headers {
        let Ok(name) = HeaderName::try_from(name.as_str()) else {
            continue;
        };
        let Ok(value) = HeaderValue::try_from(value.as_str()) else {
            continue;
        };
        response.headers_mut().append(name, value);
    }

    if let Some(hook) = &state.hook {
        hook(response.headers_mut(), &parts, None);
    }

    response
}

/// Catch-all for unregistered routes. Logs the summary line; the hook does
/// not run here.
fn not_found(state: &ProxyState, request: Request) -> Response {
    state.requests.printf(format_args!(
        "404 - {}:{}",
        request.method(),
        request.uri().path()
    ));

    let mut response = Response::new(Body::empty());
    *response.status_mut() = StatusCode::NOT_FOUND;
    response
}
