//! Correlated request/response gateway.
//!
//! Every [`RpcGateway::call`] sends exactly one request envelope and waits for
//! the one response carrying the same correlation id. Two background tasks
//! own the transport halves:
//!
//! - the writer drains an outbound queue into the [`EnvelopeSink`];
//! - the reader pulls envelopes from the [`EnvelopeSource`] and resolves the
//!   matching pending call. It never waits on a caller.
//!
//! Responses may arrive in any order. A response for an id nobody is waiting
//! on any more (the call timed out or was dropped) is discarded.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use helm_core::{CorrelationId, Envelope, MessageKind};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::errors::RpcError;
use crate::pending::{PendingGuard, PendingTable};
use crate::transport::{EnvelopeSink, EnvelopeSource};

/// Client side of the envelope protocol.
pub struct RpcGateway {
    outbound: mpsc::Sender<Envelope>,
    pending: Arc<PendingTable>,
    next_id: AtomicU64,
    connected: Arc<AtomicBool>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl RpcGateway {
    /// Start the reader and writer tasks over the given transport halves.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn spawn<S, R>(sink: S, source: R, outbound_buffer: usize) -> Self
    where
        S: EnvelopeSink,
        R: EnvelopeSource,
    {
        let (outbound, outbound_rx) = mpsc::channel(outbound_buffer.max(1));
        let pending = Arc::new(PendingTable::new());
        let connected = Arc::new(AtomicBool::new(true));

        let writer = tokio::spawn(writer_loop(
            sink,
            outbound_rx,
            pending.clone(),
            connected.clone(),
        ));
        let reader = tokio::spawn(reader_loop(source, pending.clone(), connected.clone()));

        Self {
            outbound,
            pending,
            next_id: AtomicU64::new(1),
            connected,
            reader,
            writer,
        }
    }

    /// Send one request and wait up to `timeout` for its response payload.
    ///
    /// The deadline covers queueing the request as well as waiting for the
    /// reply, so a stalled writer cannot hold a caller past `timeout`.
    pub async fn call(
        &self,
        kind: MessageKind,
        payload: Vec<u8>,
        timeout: Duration,
    ) -> Result<Vec<u8>, RpcError> {
        let deadline = Instant::now() + timeout;
        if !self.is_connected() {
            return Err(RpcError::Disconnected);
        }

        let id = CorrelationId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let rx = self.pending.register(id).ok_or(RpcError::Disconnected)?;
        let _guard = PendingGuard::new(&self.pending, id);

        debug!(%kind, %id, "sending request");
        let request = Envelope::request(kind, id, payload);
        match tokio::time::timeout_at(deadline, self.outbound.send(request)).await {
            Ok(Ok(())) => {}
            Ok(Err(_closed)) => return Err(RpcError::Disconnected),
            Err(_elapsed) => {
                warn!(
                    %kind,
                    %id,
                    timeout_ms = timeout.as_millis(),
                    "outbound queue full until deadline"
                );
                return Err(RpcError::Timeout { kind, timeout });
            }
        }

        match tokio::time::timeout_at(deadline, rx).await {
            Ok(Ok(response)) if response.is_error() => {
                debug!(%kind, %id, error = %response.error, "server reported failure");
                Err(RpcError::Remote {
                    kind,
                    message: response.error,
                })
            }
            Ok(Ok(response)) => Ok(response.payload),
            Ok(Err(_closed)) => Err(RpcError::Disconnected),
            Err(_elapsed) => {
                warn!(%kind, %id, timeout_ms = timeout.as_millis(), "request timed out");
                Err(RpcError::Timeout { kind, timeout })
            }
        }
    }

    /// Number of calls currently awaiting a response.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Whether both transport halves are still running.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }
}

impl Drop for RpcGateway {
    fn drop(&mut self) {
        self.reader.abort();
        self.writer.abort();
    }
}

async fn writer_loop<S: EnvelopeSink>(
    mut sink: S,
    mut outbound: mpsc::Receiver<Envelope>,
    pending: Arc<PendingTable>,
    connected: Arc<AtomicBool>,
) {
    while let Some(envelope) = outbound.recv().await {
        let id = envelope.id;
        if let Err(err) = sink.send(envelope).await {
            warn!(%id, error = %err, "failed to send request, closing writer");
            // wake the caller now instead of at its deadline
            let _ = pending.remove(id);
            break;
        }
    }
    connected.store(false, Ordering::Release);
    outbound.close();
    while let Some(envelope) = outbound.recv().await {
        let _ = pending.remove(envelope.id);
    }
}

async fn reader_loop<R: EnvelopeSource>(
    mut source: R,
    pending: Arc<PendingTable>,
    connected: Arc<AtomicBool>,
) {
    while let Some(item) = source.recv().await {
        match item {
            Ok(envelope) => {
                let id = envelope.id;
                let kind = envelope.kind;
                if !pending.resolve(envelope) {
                    debug!(%kind, %id, "discarding response with no waiting call");
                }
            }
            Err(err) if err.is_recoverable() => {
                warn!(error = %err, "skipping malformed frame");
            }
            Err(err) => {
                warn!(error = %err, "receive failed, closing reader");
                break;
            }
        }
    }
    debug!("server connection closed");
    connected.store(false, Ordering::Release);
    pending.close();
}
