//! In-process transport backed by `mpsc` channels.

use async_trait::async_trait;
use helm_core::Envelope;
use tokio::sync::mpsc;

use super::{EnvelopeSink, EnvelopeSource};
use crate::errors::TransportError;

/// Sending half of an in-memory link.
#[derive(Clone)]
pub struct MemorySink {
    tx: mpsc::Sender<Envelope>,
}

/// Receiving half of an in-memory link.
pub struct MemorySource {
    rx: mpsc::Receiver<Envelope>,
}

#[async_trait]
impl EnvelopeSink for MemorySink {
    async fn send(&mut self, envelope: Envelope) -> Result<(), TransportError> {
        self.tx
            .send(envelope)
            .await
            .map_err(|_| TransportError::Closed)
    }
}

#[async_trait]
impl EnvelopeSource for MemorySource {
    async fn recv(&mut self) -> Option<Result<Envelope, TransportError>> {
        self.rx.recv().await.map(Ok)
    }
}

/// One end of a bidirectional in-memory link.
pub struct MemoryEnd {
    /// Envelopes sent to the other end.
    pub sink: MemorySink,
    /// Envelopes received from the other end.
    pub source: MemorySource,
}

/// Create two connected ends; what one end sends, the other receives.
pub fn link(buffer: usize) -> (MemoryEnd, MemoryEnd) {
    let (a_tx, a_rx) = mpsc::channel(buffer);
    let (b_tx, b_rx) = mpsc::channel(buffer);
    (
        MemoryEnd {
            sink: MemorySink { tx: a_tx },
            source: MemorySource { rx: b_rx },
        },
        MemoryEnd {
            sink: MemorySink { tx: b_tx },
            source: MemorySource { rx: a_rx },
        },
    )
}
