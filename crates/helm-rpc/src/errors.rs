//! RPC and transport error types.

use std::time::Duration;

use helm_core::{EnvelopeError, MessageKind};
use tokio_util::codec::LinesCodecError;

// ── Error code constants ────────────────────────────────────────────

/// The server reported a failure in the response's `error` field.
pub const REMOTE_ERROR: &str = "REMOTE_ERROR";
/// No response arrived before the call's deadline.
pub const TIMEOUT: &str = "TIMEOUT";
/// A response payload did not match the shape expected for its kind.
pub const PROTOCOL_DECODE: &str = "PROTOCOL_DECODE";
/// A request payload could not be serialized.
pub const ENCODE_ERROR: &str = "ENCODE_ERROR";
/// The transport closed before the call resolved.
pub const DISCONNECTED: &str = "DISCONNECTED";

/// Error returned to the caller of a gateway call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RpcError {
    /// The server answered with a non-empty `error` field.
    #[error("{message}")]
    Remote {
        /// Operation that failed.
        kind: MessageKind,
        /// Message reported by the server.
        message: String,
    },

    /// No response within the deadline. The true server-side outcome is unknown.
    #[error("{kind} request timed out after {}ms", timeout.as_millis())]
    Timeout {
        /// Operation that timed out.
        kind: MessageKind,
        /// Deadline the call was given.
        timeout: Duration,
    },

    /// The response payload could not be decoded for its kind.
    #[error("malformed {kind} response: {message}")]
    ProtocolDecode {
        /// Operation whose response was malformed.
        kind: MessageKind,
        /// Decoder message.
        message: String,
    },

    /// The request payload could not be encoded.
    #[error("failed to encode {kind} request: {message}")]
    Encode {
        /// Operation being encoded.
        kind: MessageKind,
        /// Encoder message.
        message: String,
    },

    /// The connection to the server is gone.
    #[error("connection to server lost")]
    Disconnected,
}

impl RpcError {
    /// Machine-readable error code for this variant.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Remote { .. } => REMOTE_ERROR,
            Self::Timeout { .. } => TIMEOUT,
            Self::ProtocolDecode { .. } => PROTOCOL_DECODE,
            Self::Encode { .. } => ENCODE_ERROR,
            Self::Disconnected => DISCONNECTED,
        }
    }

    pub(crate) fn decode(kind: MessageKind, err: &serde_json::Error) -> Self {
        Self::ProtocolDecode {
            kind,
            message: err.to_string(),
        }
    }

    pub(crate) fn encode(kind: MessageKind, err: &serde_json::Error) -> Self {
        Self::Encode {
            kind,
            message: err.to_string(),
        }
    }
}

/// Error raised by a transport while moving envelopes.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Socket I/O failed.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Line framing failed (I/O or an over-long line).
    #[error("framing error: {0}")]
    Framing(#[from] LinesCodecError),

    /// A frame arrived intact but was not a valid envelope.
    #[error(transparent)]
    Malformed(#[from] EnvelopeError),

    /// The peer or the local channel closed.
    #[error("transport closed")]
    Closed,
}

impl TransportError {
    /// Whether the transport can keep going after this error.
    ///
    /// A malformed frame or an over-long line is skipped and the source keeps
    /// reading; anything else ends the connection.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Malformed(_) | Self::Framing(LinesCodecError::MaxLineLengthExceeded)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_displays_server_message() {
        let err = RpcError::Remote {
            kind: MessageKind::KillJob,
            message: "job not found".into(),
        };
        assert_eq!(err.to_string(), "job not found");
        assert_eq!(err.code(), REMOTE_ERROR);
    }

    #[test]
    fn timeout_mentions_kind_and_deadline() {
        let err = RpcError::Timeout {
            kind: MessageKind::ListJobs,
            timeout: Duration::from_millis(250),
        };
        assert_eq!(err.to_string(), "list jobs request timed out after 250ms");
        assert_eq!(err.code(), TIMEOUT);
    }

    #[test]
    fn decode_error_code() {
        let json_err = serde_json::from_slice::<serde_json::Value>(b"{").unwrap_err();
        let err = RpcError::decode(MessageKind::ListJobs, &json_err);
        assert_eq!(err.code(), PROTOCOL_DECODE);
        assert!(err.to_string().starts_with("malformed list jobs response"));
    }

    #[test]
    fn disconnected_code() {
        assert_eq!(RpcError::Disconnected.code(), DISCONNECTED);
    }

    #[test]
    fn malformed_frame_is_recoverable_close_is_not() {
        let env_err = helm_core::Envelope::decode("nope").unwrap_err();
        assert!(TransportError::Malformed(env_err).is_recoverable());
        assert!(!TransportError::Closed.is_recoverable());
    }
}
