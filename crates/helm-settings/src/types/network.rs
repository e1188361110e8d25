//! Server endpoint and RPC gateway settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Where the console connects and how envelopes are framed.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Server host.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Maximum length of one encoded envelope line.
    pub max_frame_bytes: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 31337,
            max_frame_bytes: 16 * 1024 * 1024, // 16 MB
        }
    }
}

impl ServerSettings {
    /// `host:port` string suitable for `TcpStream::connect`.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// RPC gateway timeouts and batching.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RpcSettings {
    /// Timeout for calls issued by commands, in milliseconds.
    pub call_timeout_ms: u64,
    /// Timeout for calls issued by completion providers, in milliseconds.
    pub completion_timeout_ms: u64,
    /// Issue the per-job kills of `jobs kill-all` concurrently.
    pub concurrent_batch: bool,
    /// Capacity of the outbound envelope queue.
    pub outbound_buffer: usize,
}

impl Default for RpcSettings {
    fn default() -> Self {
        Self {
            call_timeout_ms: 30_000,
            completion_timeout_ms: 500,
            concurrent_batch: false,
            outbound_buffer: 64,
        }
    }
}

impl RpcSettings {
    /// Command call timeout.
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    /// Completion provider timeout.
    pub fn completion_timeout(&self) -> Duration {
        Duration::from_millis(self.completion_timeout_ms)
    }
}
