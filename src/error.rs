//! Error types for proxy construction and endpoint registration.

use http::Method;
use thiserror::Error;

/// Boxed error type carried by functional options.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors surfaced by [`Proxy::new`](crate::Proxy::new) and
/// [`Proxy::handle`](crate::Proxy::handle).
///
/// Construction fails with exactly two kinds: [`Error::NoService`] when no
/// bus client is supplied, and [`Error::FuncOpts`] when a functional option
/// reports failure. The remaining variants come from endpoint registration.
#[derive(Debug, Error)]
pub enum Error {
    /// No bus client was supplied at construction.
    #[error("mrpc service not provided")]
    NoService,

    /// A functional option failed while configuring the proxy.
    ///
    /// The message carries the underlying error verbatim.
    #[error("error executing functional option: {0}")]
    FuncOpts(#[source] BoxError),

    /// An endpoint was already registered for this method and path pair.
    #[error("endpoint already registered for {method} {path}")]
    DuplicateEndpoint { method: Method, path: String },

    /// The endpoint's HTTP method cannot be routed.
    #[error("unsupported HTTP method {0}")]
    UnsupportedMethod(Method),
}
