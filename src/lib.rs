//! mrpcproxy - HTTP gateway for MRPC pub/sub service fabrics.
//!
//! The proxy accepts HTTP requests on a public listener, translates each
//! one into a request message published on a named topic of the fabric,
//! awaits the correlated reply, and renders that reply back to the HTTP
//! client. Routing is a table of endpoint bindings from `(method, path)`
//! pairs to topics, each with its own reply deadline.
//!
//! # Bridged Request Lifecycle
//!
//! ```text
//! HTTP client ──► router ──► bridge ──► encode ──► publish on topic
//!                                                        │
//!                             reply within deadline ◄────┤
//!                             408 on expiry              │
//!                             500 on malformed reply ◄───┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use http::Method;
//! use mrpcproxy::{BusClient, Endpoint, MemoryBus, Proxy};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let bus = Arc::new(MemoryBus::new());
//! bus.handle_fn("service.greeter", |reply, _payload| async move {
//!     let response = mrpcproxy::wire::Response {
//!         code: 200,
//!         msg: b"hello".to_vec(),
//!         headers: Default::default(),
//!     };
//!     reply.write(response.to_bytes().unwrap());
//! });
//!
//! let mut proxy = Proxy::new(
//!     "127.0.0.1:8001",
//!     Some(bus as Arc<dyn BusClient>),
//!     Vec::new(),
//! )?;
//! proxy.handle(Endpoint::new("service.greeter", Method::GET, "/hello", 0))?;
//! proxy.serve().await?;
//! # Ok(())
//! # }
//! ```

mod bridge;

pub mod bus;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod mem;
pub mod proxy;
pub mod sink;
pub mod wire;

pub use bus::{BusClient, BusError};
pub use config::ProxyConfig;
pub use endpoint::Endpoint;
pub use error::{BoxError, Error};
pub use mem::{MemoryBus, ReplyWriter};
pub use proxy::{IdGenerator, Proxy, ProxyOption, ResponseHook};
pub use sink::{LogSink, TracingSink};
