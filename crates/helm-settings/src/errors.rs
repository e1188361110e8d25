//! Settings error types.

use std::path::PathBuf;

/// The settings file exists but could not be read.
pub const SETTINGS_READ: &str = "SETTINGS_READ";
/// The settings file is not valid JSON or does not fit the schema.
pub const SETTINGS_PARSE: &str = "SETTINGS_PARSE";
/// A value is outside what the console can run with.
pub const SETTINGS_INVALID: &str = "SETTINGS_INVALID";

/// Why settings could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// Reading the file failed.
    #[error("cannot read {}: {source}", path.display())]
    Read {
        /// File that was read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The merged document did not deserialize.
    #[error("cannot parse settings: {0}")]
    Parse(#[from] serde_json::Error),

    /// A key holds an unusable value.
    #[error("{key}: {reason}")]
    Invalid {
        /// Dotted camelCase key, e.g. `rpc.callTimeoutMs`.
        key: &'static str,
        /// What is wrong with it.
        reason: &'static str,
    },
}

impl SettingsError {
    /// Machine-readable error code for this variant.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Read { .. } => SETTINGS_READ,
            Self::Parse(_) => SETTINGS_PARSE,
            Self::Invalid { .. } => SETTINGS_INVALID,
        }
    }
}

/// Result alias for settings operations.
pub type Result<T> = std::result::Result<T, SettingsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_error_names_the_file() {
        let err = SettingsError::Read {
            path: PathBuf::from("/etc/helm.json"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };
        assert!(err.to_string().starts_with("cannot read /etc/helm.json"));
        assert_eq!(err.code(), SETTINGS_READ);
    }

    #[test]
    fn invalid_names_key_and_reason() {
        let err = SettingsError::Invalid {
            key: "rpc.outboundBuffer",
            reason: "must be positive",
        };
        assert_eq!(err.to_string(), "rpc.outboundBuffer: must be positive");
        assert_eq!(err.code(), SETTINGS_INVALID);
    }
}
