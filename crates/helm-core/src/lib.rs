//! # helm-core
//!
//! Foundation types shared by every Helm crate:
//! - [`Envelope`] and [`MessageKind`]: the single request/response unit
//!   exchanged with the server
//! - [`CorrelationId`]: pairs a response with the request that caused it
//! - [`logging`]: `tracing` subscriber setup

#![deny(unsafe_code)]

pub mod envelope;
pub mod ids;
pub mod logging;

pub use envelope::{Envelope, EnvelopeError, MessageKind};
pub use ids::CorrelationId;
