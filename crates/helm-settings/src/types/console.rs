//! Interactive console settings.

use serde::{Deserialize, Serialize};

/// Prompt and line-loop behavior.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConsoleSettings {
    /// Prompt prefix; the active context name is appended.
    pub prompt: String,
    /// A line ending with this suffix prints completions instead of running.
    pub completion_suffix: String,
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self {
            prompt: "helm".to_string(),
            completion_suffix: "?".to_string(),
        }
    }
}
