//! Shared fixtures for the integration suite.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use http::header::{HeaderName, HeaderValue};
use mrpcproxy::{LogSink, ResponseHook};

/// In-memory sink recording exactly what it receives: `println` stores the
/// message with a trailing newline, `printf` stores the formatted string
/// as is.
#[derive(Debug, Default, Clone)]
pub struct CaptureSink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl CaptureSink {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<String> {
        self.lines.lock().unwrap().last().cloned()
    }
}

impl LogSink for CaptureSink {
    fn println(&self, msg: &str) {
        self.lines.lock().unwrap().push(format!("{msg}\n"));
    }

    fn printf(&self, args: std::fmt::Arguments<'_>) {
        self.lines.lock().unwrap().push(args.to_string());
    }
}

/// Hook used across the suite: marks every rendered outcome.
pub fn test_hook() -> ResponseHook {
    Arc::new(|headers, _parts, _reply| {
        headers.insert(
            HeaderName::from_static("x-test-handler-header"),
            HeaderValue::from_static("OK"),
        );
    })
}

/// Install a subscriber once so failures come with log context.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_test_writer()
        .try_init();
}
