//! Bus client port.
//!
//! The proxy treats the MRPC fabric as an external collaborator behind a
//! single-operation trait: publish a payload on a topic and await the
//! correlated reply. Deadlines are owned by the caller, so implementations
//! may stay pending forever when no peer replies.

use bytes::Bytes;
use thiserror::Error;

/// Transport failures reported by a bus client.
///
/// A missing reply is not an error; the call simply never resolves and the
/// bridge's deadline decides the outcome.
#[derive(Debug, Error)]
pub enum BusError {
    /// The request could not be published.
    #[error("publish failed: {0}")]
    Publish(String),

    /// The connection to the fabric was lost mid-call.
    #[error("bus connection lost: {0}")]
    Connection(String),
}

/// A client of the MRPC fabric.
///
/// Implementations must be safe for concurrent calls; every bridged request
/// runs its own call with an independent correlation.
#[async_trait::async_trait]
pub trait BusClient: Send + Sync {
    /// Publish `payload` on `topic` and await the first correlated reply.
    ///
    /// Resolves with the reply bytes as delivered by the peer. Later replies
    /// for the same correlation must be discarded by the implementation.
    async fn call(&self, topic: &str, payload: Bytes) -> Result<Bytes, BusError>;
}
