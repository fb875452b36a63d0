//! Server configuration: defaults, JSON config file, environment overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`QuadroConfig::default()`]
//! 2. If a config file exists, deep-merge its values over the defaults
//! 3. Apply `QUADRO_*` environment variable overrides (highest priority)
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// Configuration loading failure.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    /// The config file is not valid JSON, or does not match the schema.
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Gateway settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerConfig {
    /// Host to bind (default `"127.0.0.1"`).
    pub host: String,
    /// Port to bind (default `0` for auto-assign).
    pub port: u16,
    /// Maximum concurrent WebSocket connections.
    pub max_connections: usize,
    /// Heartbeat interval in seconds.
    pub heartbeat_interval_secs: u64,
    /// Heartbeat timeout in seconds (disconnect after this long without a
    /// response).
    pub heartbeat_timeout_secs: u64,
    /// Max WebSocket message size in bytes.
    pub max_message_size: usize,
    /// Claim fields projected onto each connection at handshake time.
    pub decoder_fields: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            max_connections: 1000,
            heartbeat_interval_secs: 30,
            heartbeat_timeout_secs: 90,
            max_message_size: 16 * 1024 * 1024, // 16 MB
            decoder_fields: vec!["userId".into()],
        }
    }
}

/// Token signing settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthConfig {
    /// HMAC secret for token signing and validation.
    pub token_secret: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_secret: "quadro-dev-secret".into(),
        }
    }
}

/// Top-level configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QuadroConfig {
    /// Gateway settings.
    pub server: ServerConfig,
    /// Token settings.
    pub auth: AuthConfig,
}

/// Load configuration from a file path with env var overrides.
///
/// A missing file yields the defaults; a present but malformed file is an
/// error.
pub fn load_config_from_path(path: &Path) -> Result<QuadroConfig, ConfigError> {
    let defaults = serde_json::to_value(QuadroConfig::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading config from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "config file not found, using defaults");
        defaults
    };

    let mut config: QuadroConfig = serde_json::from_value(merged)?;
    apply_env_overrides(&mut config);
    Ok(config)
}

/// Recursive deep merge of two JSON values.
///
/// - Objects are merged recursively (source overrides target per-key)
/// - Arrays and primitives are replaced entirely by source
/// - Null values in source are skipped (preserving target)
#[must_use]
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply environment variable overrides to loaded configuration.
///
/// Integers must parse and fall within the documented range; invalid values
/// are ignored with a warning, falling back to file/default.
pub fn apply_env_overrides(config: &mut QuadroConfig) {
    if let Some(v) = read_env_string("QUADRO_HOST") {
        config.server.host = v;
    }
    if let Some(v) = read_env_u16("QUADRO_PORT", 0, 65535) {
        config.server.port = v;
    }
    if let Some(v) = read_env_usize("QUADRO_MAX_CONNECTIONS", 1, 1_000_000) {
        config.server.max_connections = v;
    }
    if let Some(v) = read_env_u64("QUADRO_HEARTBEAT_INTERVAL_SECS", 1, 3600) {
        config.server.heartbeat_interval_secs = v;
    }
    if let Some(v) = read_env_u64("QUADRO_HEARTBEAT_TIMEOUT_SECS", 1, 86_400) {
        config.server.heartbeat_timeout_secs = v;
    }
    if let Some(v) = read_env_usize("QUADRO_MAX_MESSAGE_SIZE", 1024, 1_073_741_824) {
        config.server.max_message_size = v;
    }
    if let Some(v) = read_env_string("QUADRO_DECODER_FIELDS") {
        config.server.decoder_fields = v
            .split(',')
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(str::to_owned)
            .collect();
    }
    if let Some(v) = read_env_string("QUADRO_TOKEN_SECRET") {
        config.auth.token_secret = v;
    }
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a string as a `u16` within a range.
#[must_use]
pub fn parse_u16_range(val: &str, min: u16, max: u16) -> Option<u16> {
    let n: u16 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `u64` within a range.
#[must_use]
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `usize` within a range.
#[must_use]
pub fn parse_usize_range(val: &str, min: usize, max: usize) -> Option<usize> {
    let n: usize = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ── Env var readers (thin wrappers) ─────────────────────────────────────────

fn read_env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn read_env_u16(name: &str, min: u16, max: u16) -> Option<u16> {
    let val = std::env::var(name).ok()?;
    let result = parse_u16_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid u16 env var, ignoring");
    }
    result
}

fn read_env_u64(name: &str, min: u64, max: u64) -> Option<u64> {
    let val = std::env::var(name).ok()?;
    let result = parse_u64_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid u64 env var, ignoring");
    }
    result
}

fn read_env_usize(name: &str, min: usize, max: usize) -> Option<usize> {
    let val = std::env::var(name).ok()?;
    let result = parse_usize_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid usize env var, ignoring");
    }
    result
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;
    use std::io::Write;

    // ── defaults ────────────────────────────────────────────────────

    #[test]
    fn default_server_values() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.host, "127.0.0.1");
        assert_eq!(cfg.port, 0);
        assert_eq!(cfg.max_connections, 1000);
        assert_eq!(cfg.heartbeat_interval_secs, 30);
        assert_eq!(cfg.heartbeat_timeout_secs, 90);
        assert_eq!(cfg.max_message_size, 16 * 1024 * 1024);
        assert_eq!(cfg.decoder_fields, vec!["userId".to_owned()]);
    }

    #[test]
    fn serde_roundtrip_is_camel_case() {
        let cfg = QuadroConfig::default();
        let v = serde_json::to_value(&cfg).unwrap();
        assert!(v["server"].get("maxConnections").is_some());
        assert!(v["server"].get("decoderFields").is_some());
        assert!(v["auth"].get("tokenSecret").is_some());

        let back: QuadroConfig = serde_json::from_value(v).unwrap();
        assert_eq!(back.server.host, cfg.server.host);
        assert_eq!(back.server.decoder_fields, cfg.server.decoder_fields);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let cfg: QuadroConfig = serde_json::from_str(r#"{"server":{"port":9000}}"#).unwrap();
        assert_eq!(cfg.server.port, 9000);
        assert_eq!(cfg.server.host, "127.0.0.1");
        assert_eq!(cfg.auth.token_secret, "quadro-dev-secret");
    }

    // ── deep_merge ──────────────────────────────────────────────────

    #[test]
    fn merge_overrides_scalar_keys() {
        let merged = deep_merge(json!({"a": 1, "b": 2}), json!({"b": 3}));
        assert_eq!(merged, json!({"a": 1, "b": 3}));
    }

    #[test]
    fn merge_is_recursive_for_objects() {
        let merged = deep_merge(
            json!({"server": {"host": "127.0.0.1", "port": 0}}),
            json!({"server": {"port": 9000}}),
        );
        assert_eq!(merged, json!({"server": {"host": "127.0.0.1", "port": 9000}}));
    }

    #[test]
    fn merge_skips_null_source_values() {
        let merged = deep_merge(json!({"a": 1}), json!({"a": null}));
        assert_eq!(merged, json!({"a": 1}));
    }

    #[test]
    fn merge_replaces_arrays_entirely() {
        let merged = deep_merge(
            json!({"decoderFields": ["userId"]}),
            json!({"decoderFields": ["userId", "role"]}),
        );
        assert_eq!(merged, json!({"decoderFields": ["userId", "role"]}));
    }

    proptest! {
        #[test]
        fn merging_with_empty_object_is_identity(a in 0_i64..1000, b in 0_i64..1000) {
            let target = json!({"x": a, "nested": {"y": b}});
            prop_assert_eq!(deep_merge(target.clone(), json!({})), target);
        }

        #[test]
        fn merge_result_contains_source_scalars(port in 1_u16..u16::MAX) {
            let merged = deep_merge(
                serde_json::to_value(QuadroConfig::default()).unwrap(),
                json!({"server": {"port": port}}),
            );
            prop_assert_eq!(merged["server"]["port"].clone(), json!(port));
        }
    }

    // ── file loading ────────────────────────────────────────────────

    #[test]
    fn missing_file_yields_defaults() {
        let cfg = load_config_from_path(Path::new("/nonexistent/quadro.json")).unwrap();
        assert_eq!(cfg.server.host, "127.0.0.1");
    }

    #[test]
    fn file_values_merge_over_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"server":{{"port":9000,"maxConnections":5}},"auth":{{"tokenSecret":"s3cret"}}}}"#
        )
        .unwrap();

        let cfg = load_config_from_path(file.path()).unwrap();
        assert_eq!(cfg.server.port, 9000);
        assert_eq!(cfg.server.max_connections, 5);
        assert_eq!(cfg.auth.token_secret, "s3cret");
        // Untouched keys keep their defaults.
        assert_eq!(cfg.server.heartbeat_interval_secs, 30);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{not json").unwrap();
        assert!(load_config_from_path(file.path()).is_err());
    }

    // ── parse helpers ───────────────────────────────────────────────

    #[test]
    fn u16_range_enforced() {
        assert_eq!(parse_u16_range("8080", 1, 65535), Some(8080));
        assert_eq!(parse_u16_range("0", 1, 65535), None);
        assert_eq!(parse_u16_range("not-a-port", 1, 65535), None);
    }

    #[test]
    fn u64_range_enforced() {
        assert_eq!(parse_u64_range("30", 1, 3600), Some(30));
        assert_eq!(parse_u64_range("0", 1, 3600), None);
        assert_eq!(parse_u64_range("9999", 1, 3600), None);
    }

    #[test]
    fn usize_range_enforced() {
        assert_eq!(parse_usize_range("1024", 1024, 1_073_741_824), Some(1024));
        assert_eq!(parse_usize_range("1023", 1024, 1_073_741_824), None);
    }

    proptest! {
        #[test]
        fn in_range_values_always_parse(n in 1_u64..3600) {
            prop_assert_eq!(parse_u64_range(&n.to_string(), 1, 3600), Some(n));
        }
    }
}
