//! Newline-delimited JSON envelopes over any byte stream.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use helm_core::Envelope;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio_util::codec::{Framed, FramedWrite, LinesCodec, LinesCodecError};
use tracing::{debug, warn};

use super::{EnvelopeSink, EnvelopeSource};
use crate::errors::TransportError;

/// Writes one encoded envelope per line.
pub struct LineSink<W> {
    inner: FramedWrite<W, LinesCodec>,
}

impl<W> LineSink<W>
where
    W: AsyncWrite + Send + Unpin + 'static,
{
    /// Wrap a writer; lines longer than `max_frame_bytes` are refused.
    pub fn new(writer: W, max_frame_bytes: usize) -> Self {
        Self {
            inner: FramedWrite::new(writer, LinesCodec::new_with_max_length(max_frame_bytes)),
        }
    }
}

#[async_trait]
impl<W> EnvelopeSink for LineSink<W>
where
    W: AsyncWrite + Send + Unpin + 'static,
{
    async fn send(&mut self, envelope: Envelope) -> Result<(), TransportError> {
        let line = envelope.encode()?;
        self.inner.send(line).await?;
        Ok(())
    }
}

/// Reads one envelope per line.
///
/// An over-long line is reported once and skipped; reading resumes at the
/// next newline.
pub struct LineSource<R> {
    inner: Option<Framed<R, LinesCodec>>,
}

impl<R> LineSource<R>
where
    R: AsyncRead + Send + Unpin + 'static,
{
    /// Wrap a reader; lines longer than `max_frame_bytes` are skipped.
    pub fn new(reader: R, max_frame_bytes: usize) -> Self {
        Self {
            inner: Some(Framed::new(reader, LinesCodec::new_with_max_length(max_frame_bytes))),
        }
    }

    // A framed stream ends after any decode error. Rebuilding from its parts
    // keeps the buffered bytes and the codec's discard state.
    fn resume_after_overflow(&mut self) {
        if let Some(framed) = self.inner.take() {
            self.inner = Some(Framed::from_parts(framed.into_parts()));
        }
    }
}

#[async_trait]
impl<R> EnvelopeSource for LineSource<R>
where
    R: AsyncRead + Send + Unpin + 'static,
{
    async fn recv(&mut self) -> Option<Result<Envelope, TransportError>> {
        loop {
            let frame = self.inner.as_mut()?.next().await?;
            let line = match frame {
                Ok(line) => line,
                Err(LinesCodecError::MaxLineLengthExceeded) => {
                    warn!("inbound line exceeds frame limit, discarding");
                    self.resume_after_overflow();
                    return Some(Err(LinesCodecError::MaxLineLengthExceeded.into()));
                }
                Err(err) => {
                    self.inner = None;
                    return Some(Err(err.into()));
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            return Some(Envelope::decode(&line).map_err(TransportError::from));
        }
    }
}

/// Open a TCP connection to `address` and split it into envelope halves.
pub async fn connect(
    address: &str,
    max_frame_bytes: usize,
) -> Result<(LineSink<OwnedWriteHalf>, LineSource<OwnedReadHalf>), TransportError> {
    let stream = TcpStream::connect(address).await?;
    stream.set_nodelay(true)?;
    debug!(address, "connected to server");
    let (read, write) = stream.into_split();
    Ok((
        LineSink::new(write, max_frame_bytes),
        LineSource::new(read, max_frame_bytes),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use helm_core::{CorrelationId, MessageKind};
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn envelopes_cross_a_duplex_stream() {
        let (client, server) = tokio::io::duplex(4096);
        let mut sink = LineSink::new(client, 1024);
        let mut source = LineSource::new(server, 1024);

        let env = Envelope::request(MessageKind::KillJob, CorrelationId::new(3), b"{\"id\":1}".to_vec());
        sink.send(env.clone()).await.unwrap();
        sink.send(Envelope::request(MessageKind::ListJobs, CorrelationId::new(4), Vec::new()))
            .await
            .unwrap();

        assert_eq!(source.recv().await.unwrap().unwrap(), env);
        let second = source.recv().await.unwrap().unwrap();
        assert_eq!(second.id, CorrelationId::new(4));
    }

    #[tokio::test]
    async fn malformed_line_is_reported_and_stream_continues() {
        let (mut raw, server) = tokio::io::duplex(4096);
        let mut source = LineSource::new(server, 1024);

        raw.write_all(b"garbage\n\n{\"kind\":1,\"id\":8,\"payload\":\"\"}\n")
            .await
            .unwrap();

        let first = source.recv().await.unwrap();
        assert_matches!(first, Err(TransportError::Malformed(_)));
        assert!(first.unwrap_err().is_recoverable());

        let second = source.recv().await.unwrap().unwrap();
        assert_eq!(second.id, CorrelationId::new(8));
    }

    #[tokio::test]
    async fn overlong_line_is_skipped_and_next_envelope_arrives() {
        let (mut raw, server) = tokio::io::duplex(4096);
        let mut source = LineSource::new(server, 32);

        let mut bytes = vec![b'x'; 100];
        bytes.extend_from_slice(b"\n{\"kind\":1,\"id\":9,\"payload\":\"\"}\n");
        raw.write_all(&bytes).await.unwrap();

        let first = source.recv().await.unwrap();
        assert_matches!(
            first,
            Err(TransportError::Framing(LinesCodecError::MaxLineLengthExceeded))
        );
        assert!(first.unwrap_err().is_recoverable());

        // raw stays open: the envelope must come from the buffered bytes
        let second = source.recv().await.unwrap().unwrap();
        assert_eq!(second.id, CorrelationId::new(9));

        drop(raw);
        assert!(source.recv().await.is_none());
    }

    #[tokio::test]
    async fn overlong_line_split_across_writes_is_skipped() {
        let (mut raw, server) = tokio::io::duplex(4096);
        let mut source = LineSource::new(server, 16);

        raw.write_all(&[b'y'; 40]).await.unwrap();
        assert_matches!(
            source.recv().await,
            Some(Err(TransportError::Framing(LinesCodecError::MaxLineLengthExceeded)))
        );

        raw.write_all(b"yyyy\n{\"kind\":1,\"id\":2,\"payload\":\"\"}\n")
            .await
            .unwrap();
        let next = source.recv().await.unwrap().unwrap();
        assert_eq!(next.id, CorrelationId::new(2));
    }

    #[tokio::test]
    async fn closed_stream_yields_none() {
        let (raw, server) = tokio::io::duplex(64);
        let mut source = LineSource::new(server, 1024);
        drop(raw);
        assert!(source.recv().await.is_none());
    }
}
