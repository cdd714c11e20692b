//! In-process bus fabric.
//!
//! [`MemoryBus`] implements the [`BusClient`] port against a topic-handler
//! registry living in the same process. It exists for tests, examples, and
//! single-binary deployments where a networked fabric would be overkill.
//! Delivery semantics mirror the real fabric: a topic with no handler, or a
//! handler that never writes, produces no reply at all, and the first write
//! wins when a handler replies more than once.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, RwLock};

use bytes::Bytes;
use tokio::sync::oneshot;

use crate::bus::{BusClient, BusError};

type TopicFuture = Pin<Box<dyn Future<Output = ()> + Send>>;
type TopicHandler = Arc<dyn Fn(ReplyWriter, Bytes) -> TopicFuture + Send + Sync>;

/// Single-use reply channel handed to topic handlers.
///
/// The first [`write`](ReplyWriter::write) delivers the reply; subsequent
/// writes are discarded and report `false`.
#[derive(Clone)]
pub struct ReplyWriter {
    tx: Arc<Mutex<Option<oneshot::Sender<Bytes>>>>,
}

impl ReplyWriter {
    fn new(tx: oneshot::Sender<Bytes>) -> Self {
        Self {
            tx: Arc::new(Mutex::new(Some(tx))),
        }
    }

    /// Deliver the reply payload. Returns whether this write was the one
    /// that got delivered.
    pub fn write(&self, payload: impl Into<Bytes>) -> bool {
        let sender = self.tx.lock().unwrap().take();
        match sender {
            Some(tx) => tx.send(payload.into()).is_ok(),
            None => false,
        }
    }
}

/// An in-process implementation of the bus fabric.
#[derive(Default)]
pub struct MemoryBus {
    topics: RwLock<HashMap<String, TopicHandler>>,
}

impl MemoryBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an async handler for `topic`, replacing any previous one.
    ///
    /// The handler runs on its own task per delivery and may reply through
    /// the provided [`ReplyWriter`], or not at all.
    pub fn handle_fn<F, Fut>(&self, topic: impl Into<String>, handler: F)
    where
        F: Fn(ReplyWriter, Bytes) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handler: TopicHandler = Arc::new(move |writer, payload| Box::pin(handler(writer, payload)));
        self.topics
            .write()
            .unwrap()
            .insert(topic.into(), handler);
    }
}

#[async_trait::async_trait]
impl BusClient for MemoryBus {
    async fn call(&self, topic: &str, payload: Bytes) -> Result<Bytes, BusError> {
        let handler = self.topics.read().unwrap().get(topic).cloned();

        let Some(handler) = handler else {
            // Nobody subscribed: the message goes nowhere and no reply will
            // ever arrive. The caller's deadline decides the outcome.
            return std::future::pending().await;
        };

        let (tx, rx) = oneshot::channel();
        tokio::spawn(handler(ReplyWriter::new(tx), payload));

        match rx.await {
            Ok(reply) => Ok(reply),
            // Handler finished without writing; same as a silent peer.
            Err(_) => std::future::pending().await,
        }
    }
}
