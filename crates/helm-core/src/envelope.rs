//! Wire-level request/response unit.
//!
//! One envelope is encoded per line as a JSON object:
//!
//! ```text
//! {"kind": 2, "id": 17, "payload": "eyJpZCI6M30=", "error": ""}
//! ```
//!
//! `payload` is standard base64 over opaque bytes that only the sender and
//! receiver of a given [`MessageKind`] interpret. `error` is set only on
//! responses; an empty (or absent) value means success.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::ids::CorrelationId;

// ── Message kinds ───────────────────────────────────────────────────

/// Operation an envelope carries, encoded on the wire as an integer tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// List active jobs (tag `1`).
    ListJobs,
    /// Kill one job (tag `2`).
    KillJob,
    /// List workspace names (tag `3`).
    ListWorkspaces,
    /// Any tag this build does not know; preserved verbatim.
    Other(u32),
}

impl MessageKind {
    /// Integer tag written on the wire.
    #[must_use]
    pub const fn tag(self) -> u32 {
        match self {
            Self::ListJobs => 1,
            Self::KillJob => 2,
            Self::ListWorkspaces => 3,
            Self::Other(tag) => tag,
        }
    }

    /// Decode a wire tag.
    #[must_use]
    pub const fn from_tag(tag: u32) -> Self {
        match tag {
            1 => Self::ListJobs,
            2 => Self::KillJob,
            3 => Self::ListWorkspaces,
            other => Self::Other(other),
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ListJobs => f.write_str("list jobs"),
            Self::KillJob => f.write_str("kill job"),
            Self::ListWorkspaces => f.write_str("list workspaces"),
            Self::Other(tag) => write!(f, "kind {tag}"),
        }
    }
}

impl Serialize for MessageKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.tag())
    }
}

impl<'de> Deserialize<'de> for MessageKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        u32::deserialize(deserializer).map(Self::from_tag)
    }
}

// ── Envelope ────────────────────────────────────────────────────────

/// Errors produced while encoding or decoding an envelope.
#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    /// The envelope could not be serialized.
    #[error("failed to encode envelope: {0}")]
    Encode(#[source] serde_json::Error),
    /// The input is not a structurally valid envelope.
    #[error("malformed envelope: {0}")]
    Decode(#[source] serde_json::Error),
}

/// A single request or response exchanged with the server.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Operation tag.
    pub kind: MessageKind,
    /// Correlation identifier shared by a request and its response.
    pub id: CorrelationId,
    /// Opaque payload bytes.
    #[serde(with = "base64_bytes", default)]
    pub payload: Vec<u8>,
    /// Failure reported by the server; empty on success and on requests.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,
}

impl Envelope {
    /// Build a request envelope.
    #[must_use]
    pub fn request(kind: MessageKind, id: CorrelationId, payload: Vec<u8>) -> Self {
        Self {
            kind,
            id,
            payload,
            error: String::new(),
        }
    }

    /// Build a successful response to `request`.
    #[must_use]
    pub fn reply(request: &Self, payload: Vec<u8>) -> Self {
        Self::request(request.kind, request.id, payload)
    }

    /// Build a failed response to `request`.
    #[must_use]
    pub fn reply_error(request: &Self, message: impl Into<String>) -> Self {
        Self {
            kind: request.kind,
            id: request.id,
            payload: Vec::new(),
            error: message.into(),
        }
    }

    /// Whether the server reported a failure.
    #[must_use]
    pub fn is_error(&self) -> bool {
        !self.error.is_empty()
    }

    /// Encode as a single JSON line (without the trailing newline).
    pub fn encode(&self) -> Result<String, EnvelopeError> {
        serde_json::to_string(self).map_err(EnvelopeError::Encode)
    }

    /// Decode one JSON line.
    pub fn decode(line: &str) -> Result<Self, EnvelopeError> {
        serde_json::from_str(line).map_err(EnvelopeError::Decode)
    }
}

mod base64_bytes {
    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<u8>, D::Error> {
        let encoded = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
