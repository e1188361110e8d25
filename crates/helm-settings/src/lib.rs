//! Helm console settings.
//!
//! [`load_settings`] starts from [`HelmSettings::default`], merges
//! `~/.helm/settings.json` over it when present, then applies `HELM_*`
//! environment overrides. Settings are read-only at runtime.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    apply_env_overrides, deep_merge, load_settings, load_settings_from_path, settings_path,
};
pub use types::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_path_is_under_dot_helm() {
        let path = settings_path();
        assert!(path.ends_with(".helm/settings.json"));
    }

    #[test]
    fn env_overrides_leave_defaults_when_unset() {
        let mut settings = HelmSettings::default();
        apply_env_overrides(&mut settings);
        assert!(settings.rpc.call_timeout_ms > 0);
    }
}
