//! Envelope transports.
//!
//! The gateway only needs two halves: something it can push request
//! envelopes into and something it can pull response envelopes out of.
//! Ordering is assumed per direction, never across directions.

pub mod lines;
pub mod memory;

use async_trait::async_trait;
use helm_core::Envelope;

use crate::errors::TransportError;

pub use lines::{LineSink, LineSource, connect};
pub use memory::{MemorySink, MemorySource};

/// Outbound half of a transport.
#[async_trait]
pub trait EnvelopeSink: Send + 'static {
    /// Send one envelope. Errors end the writer loop.
    async fn send(&mut self, envelope: Envelope) -> Result<(), TransportError>;
}

/// Inbound half of a transport.
#[async_trait]
pub trait EnvelopeSource: Send + 'static {
    /// Next envelope, or `None` once the peer has closed.
    async fn recv(&mut self) -> Option<Result<Envelope, TransportError>>;
}
