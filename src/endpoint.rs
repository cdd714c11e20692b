//! Endpoint bindings between HTTP routes and bus topics.

use http::Method;

/// A configured binding from an HTTP route to a bus topic.
///
/// Endpoints are immutable once registered with
/// [`Proxy::handle`](crate::Proxy::handle). The path uses the HTTP router's
/// pattern syntax and may contain named parameters (e.g. `/users/{id}`);
/// matched parameters are merged into the published request's query
/// parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Bus destination the bridged request is published on.
    pub topic: String,
    /// HTTP method the endpoint answers.
    pub method: Method,
    /// HTTP path pattern the endpoint answers.
    pub path: String,
    /// Reply deadline in seconds. Zero selects the proxy default (1 second).
    pub timeout_secs: u64,
}

impl Endpoint {
    /// Create a new endpoint binding.
    pub fn new(
        topic: impl Into<String>,
        method: Method,
        path: impl Into<String>,
        timeout_secs: u64,
    ) -> Self {
        Self {
            topic: topic.into(),
            method,
            path: path.into(),
            timeout_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_fields() {
        let ep = Endpoint::new("service.a", Method::GET, "/a", 0);
        assert_eq!(ep.topic, "service.a");
        assert_eq!(ep.method, Method::GET);
        assert_eq!(ep.path, "/a");
        assert_eq!(ep.timeout_secs, 0);
    }
}
