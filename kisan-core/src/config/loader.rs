//! Configuration loading and management

use super::schema::Config;
use super::validate::validate_config;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

const ENV_PREFIX: &str = "KISAN_MITRA__";

/// Configuration loader
pub struct ConfigLoader {
    config_dir: PathBuf,
}

impl ConfigLoader {
    /// Create a new config loader with the default config directory
    pub fn new() -> Self {
        let config_dir = dirs::home_dir()
            .map(|h| h.join(".kisan-mitra"))
            .unwrap_or_else(|| PathBuf::from(".kisan-mitra"));

        Self { config_dir }
    }

    /// Create a new config loader with a custom config directory
    pub fn with_dir<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            config_dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Load configuration from file and environment
    pub fn load(&self) -> crate::Result<Config> {
        let config_path = self.config_dir.join("config.json");
        let mut merged = serde_json::to_value(Config::default())?;

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let file_value: Value = serde_json::from_str(&content)?;
            merge_values(&mut merged, file_value);
        }

        apply_alias_overrides(&mut merged);
        apply_path_overrides(&mut merged);

        let config: Config = serde_json::from_value(merged)?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, config: &Config) -> crate::Result<()> {
        std::fs::create_dir_all(&self.config_dir)?;
        let config_path = self.config_dir.join("config.json");
        let content = serde_json::to_string_pretty(config)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    /// Get the config directory path
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Deep-merge `overlay` into `base`; objects merge key by key, anything
/// else replaces
fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

/// Environment variables that map onto one config key
const ENV_ALIASES: [(&str, &str); 3] = [
    ("GROQ_API_KEY", "voice.api_key"),
    ("KISAN_MITRA_USER_ID", "backend.user_id"),
    ("KISAN_MITRA_BASE_URL", "backend.base_url"),
];

fn apply_alias_overrides(config: &mut Value) {
    for (env_key, target) in ENV_ALIASES {
        if let Ok(raw) = std::env::var(env_key) {
            let path: Vec<String> = target.split('.').map(str::to_string).collect();
            set_override(config, &path, raw);
        }
    }
}

/// `KISAN_MITRA__BACKEND__TIMEOUT_SECS=30` sets `backend.timeout_secs`
fn apply_path_overrides(config: &mut Value) {
    for (key, raw) in std::env::vars() {
        let Some(suffix) = key.strip_prefix(ENV_PREFIX) else {
            continue;
        };
        let path: Vec<String> = suffix
            .split("__")
            .filter(|s| !s.is_empty())
            .map(str::to_ascii_lowercase)
            .collect();
        if !path.is_empty() {
            set_override(config, &path, raw);
        }
    }
}

/// Write `raw` at `path`, creating missing objects on the way
fn set_override(root: &mut Value, path: &[String], raw: String) {
    let mut node = root;
    for key in path {
        if !node.is_object() {
            *node = Value::Object(Map::new());
        }
        let Value::Object(map) = node else {
            return;
        };
        node = map.entry(key.clone()).or_insert(Value::Null);
    }
    let value = coerce_env(node, raw);
    *node = value;
}

/// Interpret `raw` as the type already stored at the target key.
///
/// String keys keep the text verbatim so a numeric user id stays a string.
fn coerce_env(current: &Value, raw: String) -> Value {
    match current {
        Value::String(_) => Value::String(raw),
        Value::Bool(_) => match raw.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Value::Bool(true),
            "false" | "0" | "no" => Value::Bool(false),
            _ => Value::String(raw),
        },
        _ => serde_json::from_str(&raw).unwrap_or(Value::String(raw)),
    }
}
