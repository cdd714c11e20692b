//! Runtime defaults for the proxy, overridable via environment variables.

use std::time::Duration;

/// Tunable defaults applied to every bridged request.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Deadline for a bus call when the endpoint registers a timeout of zero.
    pub call_timeout: Duration,

    /// Maximum request body size in bytes. Bodies exceeding the limit fail
    /// the read stage before anything is published.
    pub body_limit: usize,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(1),
            body_limit: 2 * 1024 * 1024, // 2 MiB
        }
    }
}

impl ProxyConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// # Environment Variables
    ///
    /// - `MRPCPROXY_CALL_TIMEOUT_SECS` (default: 1)
    /// - `MRPCPROXY_BODY_LIMIT` (default: 2097152 = 2 MiB)
    ///
    /// Unparseable values fall back to the defaults.
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            call_timeout: std::env::var("MRPCPROXY_CALL_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(default.call_timeout),

            body_limit: std::env::var("MRPCPROXY_BODY_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.body_limit),
        }
    }
}
