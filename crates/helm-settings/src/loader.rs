//! Settings loading: defaults, then the settings file, then environment.
//!
//! The file is merged into the serialized defaults as JSON before it is
//! deserialized, so a file only needs the keys it changes. Objects merge per
//! key, everything else is replaced, and `null` leaves the default in place.
//!
//! | variable | key | accepted |
//! |---|---|---|
//! | `HELM_HOST` | `server.host` | non-empty |
//! | `HELM_PORT` | `server.port` | 1..=65535 |
//! | `HELM_RPC_TIMEOUT_MS` | `rpc.callTimeoutMs` | 1..=3600000 |
//! | `HELM_COMPLETION_TIMEOUT_MS` | `rpc.completionTimeoutMs` | 1..=60000 |
//! | `HELM_CONCURRENT_BATCH` | `rpc.concurrentBatch` | true/false/1/0/yes/no/on/off |
//! | `HELM_LOG_LEVEL` | `logging.level` | non-empty |
//!
//! A variable that does not parse is logged and skipped.

use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::{Result, SettingsError};
use crate::types::HelmSettings;

/// `~/.helm/settings.json`.
pub fn settings_path() -> PathBuf {
    let home = std::env::var_os("HOME").map_or_else(|| PathBuf::from("/tmp"), PathBuf::from);
    home.join(".helm").join("settings.json")
}

/// Load from [`settings_path`].
pub fn load_settings() -> Result<HelmSettings> {
    load_settings_from_path(&settings_path())
}

/// Load from `path`, which may be absent, then apply `HELM_*` overrides.
pub fn load_settings_from_path(path: &Path) -> Result<HelmSettings> {
    let mut document = serde_json::to_value(HelmSettings::default())?;

    match std::fs::read_to_string(path) {
        Ok(text) => {
            debug!(path = %path.display(), "merging settings file");
            merge_into(&mut document, serde_json::from_str(&text)?);
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no settings file, using defaults");
        }
        Err(source) => {
            return Err(SettingsError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    }

    let mut settings: HelmSettings = serde_json::from_value(document)?;
    apply_overrides(&mut settings, |name| std::env::var(name).ok());
    validate(&settings)?;
    Ok(settings)
}

/// Merge `source` over `target` and return the result.
pub fn deep_merge(mut target: Value, source: Value) -> Value {
    merge_into(&mut target, source);
    target
}

fn merge_into(target: &mut Value, source: Value) {
    match (target, source) {
        (_, Value::Null) => {}
        (Value::Object(into), Value::Object(from)) => {
            for (key, value) in from {
                match into.get_mut(&key) {
                    Some(slot) => merge_into(slot, value),
                    None if value.is_null() => {}
                    None => {
                        let _ = into.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

/// Apply `HELM_*` overrides from the process environment.
pub fn apply_env_overrides(settings: &mut HelmSettings) {
    apply_overrides(settings, |name| std::env::var(name).ok());
}

/// Apply overrides read through `lookup`.
pub fn apply_overrides<F>(settings: &mut HelmSettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(host) = var("HELM_HOST") {
        settings.server.host = host;
    }
    if let Some(port) = var("HELM_PORT").and_then(|v| ranged("HELM_PORT", &v, 1..=u16::MAX)) {
        settings.server.port = port;
    }
    if let Some(ms) = var("HELM_RPC_TIMEOUT_MS").and_then(|v| ranged("HELM_RPC_TIMEOUT_MS", &v, 1..=3_600_000)) {
        settings.rpc.call_timeout_ms = ms;
    }
    if let Some(ms) = var("HELM_COMPLETION_TIMEOUT_MS")
        .and_then(|v| ranged("HELM_COMPLETION_TIMEOUT_MS", &v, 1..=60_000))
    {
        settings.rpc.completion_timeout_ms = ms;
    }
    if let Some(on) = var("HELM_CONCURRENT_BATCH").and_then(|v| flag("HELM_CONCURRENT_BATCH", &v)) {
        settings.rpc.concurrent_batch = on;
    }
    if let Some(level) = var("HELM_LOG_LEVEL") {
        settings.logging.level = level;
    }
}

/// Parse a boolean flag: `true/1/yes/on` or `false/0/no/off`, any case.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a number and keep it only if it lies in `range`.
pub fn parse_in_range<T>(val: &str, range: RangeInclusive<T>) -> Option<T>
where
    T: FromStr + PartialOrd,
{
    val.trim().parse().ok().filter(|n| range.contains(n))
}

fn ranged<T>(name: &str, val: &str, range: RangeInclusive<T>) -> Option<T>
where
    T: FromStr + PartialOrd,
{
    let parsed = parse_in_range(val, range);
    if parsed.is_none() {
        warn!(key = name, value = val, "ignoring out-of-range environment override");
    }
    parsed
}

fn flag(name: &str, val: &str) -> Option<bool> {
    let parsed = parse_bool(val);
    if parsed.is_none() {
        warn!(key = name, value = val, "ignoring non-boolean environment override");
    }
    parsed
}

fn validate(settings: &HelmSettings) -> Result<()> {
    let checks = [
        (settings.rpc.call_timeout_ms == 0, "rpc.callTimeoutMs", "must be positive"),
        (settings.rpc.completion_timeout_ms == 0, "rpc.completionTimeoutMs", "must be positive"),
        (settings.rpc.outbound_buffer == 0, "rpc.outboundBuffer", "must be positive"),
        (settings.server.max_frame_bytes == 0, "server.maxFrameBytes", "must be positive"),
        (
            settings.console.completion_suffix.trim().is_empty(),
            "console.completionSuffix",
            "must not be blank",
        ),
    ];
    match checks.into_iter().find(|(failed, ..)| *failed) {
        Some((_, key, reason)) => Err(SettingsError::Invalid { key, reason }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn write_settings(body: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, body).unwrap();
        (dir, path)
    }

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn merge_recurses_into_objects_only() {
        let merged = deep_merge(
            json!({"server": {"host": "a", "port": 1}, "tags": [1, 2]}),
            json!({"server": {"port": 2}, "tags": [3]}),
        );
        assert_eq!(merged, json!({"server": {"host": "a", "port": 2}, "tags": [3]}));
    }

    #[test]
    fn merge_skips_nulls() {
        let merged = deep_merge(json!({"a": 1}), json!({"a": null, "b": null}));
        assert_eq!(merged, json!({"a": 1}));
    }

    #[test]
    fn absent_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load_settings_from_path(&dir.path().join("missing.json")).unwrap();
        assert_eq!(settings.rpc.completion_timeout_ms, 500);
        assert_eq!(settings.console.prompt, "helm");
    }

    #[test]
    fn file_keys_override_defaults() {
        let (_dir, path) =
            write_settings(r#"{"rpc": {"completionTimeoutMs": 250}, "console": {"prompt": "ops"}}"#);
        let settings = load_settings_from_path(&path).unwrap();
        assert_eq!(settings.rpc.completion_timeout_ms, 250);
        assert_eq!(settings.console.prompt, "ops");
        assert_eq!(settings.console.completion_suffix, "?");
        assert_eq!(settings.rpc.outbound_buffer, 64);
    }

    #[test]
    fn bad_json_is_parse_error() {
        let (_dir, path) = write_settings("{not json");
        assert!(matches!(
            load_settings_from_path(&path),
            Err(SettingsError::Parse(_))
        ));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let (_dir, path) = write_settings(r#"{"rpc": {"completionTimeoutMs": 0}}"#);
        let err = load_settings_from_path(&path).unwrap_err();
        assert!(matches!(
            err,
            SettingsError::Invalid { key: "rpc.completionTimeoutMs", .. }
        ));
    }

    #[test]
    fn blank_suffix_is_rejected() {
        let (_dir, path) = write_settings(r#"{"console": {"completionSuffix": " "}}"#);
        let err = load_settings_from_path(&path).unwrap_err();
        assert!(err.to_string().starts_with("console.completionSuffix"));
    }

    #[test]
    fn overrides_apply_valid_values() {
        let mut settings = HelmSettings::default();
        apply_overrides(
            &mut settings,
            env(&[
                ("HELM_HOST", "10.9.8.7"),
                ("HELM_PORT", "4443"),
                ("HELM_RPC_TIMEOUT_MS", "1500"),
                ("HELM_CONCURRENT_BATCH", "yes"),
                ("HELM_LOG_LEVEL", "debug"),
            ]),
        );
        assert_eq!(settings.server.address(), "10.9.8.7:4443");
        assert_eq!(settings.rpc.call_timeout_ms, 1500);
        assert!(settings.rpc.concurrent_batch);
        assert_eq!(settings.logging.level, "debug");
    }

    #[test]
    fn overrides_skip_invalid_values() {
        let mut settings = HelmSettings::default();
        apply_overrides(
            &mut settings,
            env(&[
                ("HELM_HOST", "  "),
                ("HELM_PORT", "0"),
                ("HELM_COMPLETION_TIMEOUT_MS", "999999"),
                ("HELM_CONCURRENT_BATCH", "maybe"),
            ]),
        );
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.server.port, 31337);
        assert_eq!(settings.rpc.completion_timeout_ms, 500);
        assert!(!settings.rpc.concurrent_batch);
    }

    #[test]
    fn parse_helpers() {
        assert_eq!(parse_bool(" On "), Some(true));
        assert_eq!(parse_bool("OFF"), Some(false));
        assert_eq!(parse_bool("2"), None);
        assert_eq!(parse_in_range("65535", 1..=u16::MAX), Some(65535));
        assert_eq!(parse_in_range::<u16>("70000", 1..=u16::MAX), None);
        assert_eq!(parse_in_range::<u64>("-1", 1..=10), None);
    }
}
