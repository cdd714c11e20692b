//! Line-oriented log sinks observed by the bridge.
//!
//! The proxy logs through three independent sinks with distinct
//! responsibilities: `access` receives one entry per bridged request before
//! it is published, `debug` receives diagnostics for read and decode
//! failures, and `requests` receives one terminal summary line per request,
//! 404s included. Each sink is a small capability injected into the proxy
//! and must be safe for concurrent line-granular use.

use std::fmt;

use tracing::{debug, info};

/// A line-oriented logging destination.
pub trait LogSink: Send + Sync {
    /// Print a message followed by a newline.
    fn println(&self, msg: &str);

    /// Print a formatted string verbatim.
    fn printf(&self, args: fmt::Arguments<'_>);
}

/// Log level a [`TracingSink`] emits at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SinkLevel {
    Info,
    Debug,
}

/// Default sink routing lines through `tracing` events.
///
/// Every event carries a `stream` field naming the sink so the three
/// streams stay distinguishable in structured output.
#[derive(Debug, Clone)]
pub struct TracingSink {
    stream: &'static str,
    level: SinkLevel,
}

impl TracingSink {
    /// Sink for per-request access entries.
    pub fn access() -> Self {
        Self {
            stream: "access",
            level: SinkLevel::Info,
        }
    }

    /// Sink for read and decode failure diagnostics.
    pub fn debug() -> Self {
        Self {
            stream: "debug",
            level: SinkLevel::Debug,
        }
    }

    /// Sink for terminal per-request summaries.
    pub fn requests() -> Self {
        Self {
            stream: "requests",
            level: SinkLevel::Info,
        }
    }
}

impl LogSink for TracingSink {
    fn println(&self, msg: &str) {
        match self.level {
            SinkLevel::Info => info!(stream = self.stream, "{}", msg.trim_end_matches('\n')),
            SinkLevel::Debug => debug!(stream = self.stream, "{}", msg.trim_end_matches('\n')),
        }
    }

    fn printf(&self, args: fmt::Arguments<'_>) {
        match self.level {
            SinkLevel::Info => info!(stream = self.stream, "{}", args),
            SinkLevel::Debug => debug!(stream = self.stream, "{}", args),
        }
    }
}
