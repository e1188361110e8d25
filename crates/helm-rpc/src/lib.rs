//! # helm-rpc
//!
//! The only path from the console to the server.
//!
//! - [`transport`]: envelope sinks/sources over TCP (newline-delimited JSON)
//!   and in-memory channels
//! - [`RpcGateway`]: one request envelope out, one correlated response back,
//!   with a per-call timeout and any number of calls outstanding at once
//! - [`JobsClient`]: typed list / kill / kill-all built on the gateway
//! - [`WorkspacesClient`]: live workspace names for completion
//! - [`testing`]: an in-memory fake server for tests

#![deny(unsafe_code)]

pub mod errors;
pub mod gateway;
pub mod jobs;
mod pending;
pub mod testing;
pub mod transport;
pub mod workspaces;

pub use errors::{RpcError, TransportError};
pub use gateway::RpcGateway;
pub use jobs::{Job, JobId, JobListing, JobsClient, KillOutcome};
pub use workspaces::WorkspacesClient;
