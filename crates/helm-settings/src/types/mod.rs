//! Settings structs. Every struct is camelCase on disk and fills missing
//! fields from its `Default`.

mod console;
mod network;

pub use console::*;
pub use network::*;

use serde::{Deserialize, Serialize};

/// Everything the console reads at startup.
///
/// ```json
/// {
///   "server": { "host": "10.0.0.5", "port": 31337 },
///   "rpc": { "callTimeoutMs": 10000 }
/// }
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HelmSettings {
    /// Server endpoint and framing.
    pub server: ServerSettings,
    /// RPC gateway behavior.
    pub rpc: RpcSettings,
    /// Interactive console behavior.
    pub console: ConsoleSettings,
    /// Logging configuration.
    pub logging: LoggingSettings,
}

/// Logging configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Minimum level for the stderr subscriber (`RUST_LOG` wins when set).
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}
