//! Configuration for the HTTP application.
//!
//! Values are looked up in layered sources: environment variables first,
//! then an optional JSON file, then built-in defaults.

use std::collections::{BTreeMap, HashMap};
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;

use crate::{DiError, DiResult};

/// Prefix of every environment variable read by [`AppConfig::load`].
pub const ENV_PREFIX: &str = "LIFESPAN";

/// Environment variable naming an optional JSON configuration file.
pub const CONFIG_FILE_VAR: &str = "LIFESPAN_CONFIG";

/// A configuration value that can be various types
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Array(Vec<ConfigValue>),
    Object(HashMap<String, ConfigValue>),
    Null,
}

impl ConfigValue {
    /// Try to convert to string
    pub fn as_string(&self) -> DiResult<&str> {
        match self {
            ConfigValue::String(s) => Ok(s),
            other => Err(DiError::Config(format!("expected a string, found {:?}", other))),
        }
    }

    /// Try to convert to integer
    pub fn as_i64(&self) -> DiResult<i64> {
        match self {
            ConfigValue::Integer(i) => Ok(*i),
            other => Err(DiError::Config(format!("expected an integer, found {:?}", other))),
        }
    }

    /// Try to convert to boolean. The integers `0` and `1` are accepted.
    pub fn as_bool(&self) -> DiResult<bool> {
        match self {
            ConfigValue::Boolean(b) => Ok(*b),
            ConfigValue::Integer(0) => Ok(false),
            ConfigValue::Integer(1) => Ok(true),
            other => Err(DiError::Config(format!("expected a boolean, found {:?}", other))),
        }
    }

    /// Try to convert to a flat string map. Scalar members are rendered as text.
    pub fn as_string_map(&self) -> DiResult<BTreeMap<String, String>> {
        let ConfigValue::Object(map) = self else {
            return Err(DiError::Config(format!("expected an object, found {:?}", self)));
        };
        map.iter()
            .map(|(k, v)| {
                let text = match v {
                    ConfigValue::String(s) => s.clone(),
                    ConfigValue::Integer(i) => i.to_string(),
                    ConfigValue::Float(f) => f.to_string(),
                    ConfigValue::Boolean(b) => b.to_string(),
                    ConfigValue::Null => String::new(),
                    ConfigValue::Array(_) | ConfigValue::Object(_) => {
                        return Err(DiError::Config(format!("nested value under `{}`", k)))
                    }
                };
                Ok((k.clone(), text))
            })
            .collect()
    }
}

/// Trait for configuration sources
pub trait ConfigSource: Send + Sync + fmt::Debug {
    /// Get a configuration value by key
    fn get(&self, key: &str) -> Option<ConfigValue>;

    /// List all available keys
    fn keys(&self) -> Vec<String>;
}

/// Environment variable configuration source
#[derive(Debug, Default)]
pub struct EnvironmentConfigSource {
    /// Prefix to filter environment variables
    prefix: Option<String>,
}

impl EnvironmentConfigSource {
    pub fn new() -> Self {
        Self { prefix: None }
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
        }
    }

    fn env_key(&self, key: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}_{}", prefix.to_uppercase(), key.to_uppercase()),
            None => key.to_uppercase(),
        }
    }
}

impl ConfigSource for EnvironmentConfigSource {
    fn get(&self, key: &str) -> Option<ConfigValue> {
        env::var(self.env_key(key)).ok().map(|value| {
            if let Ok(int_val) = value.parse::<i64>() {
                ConfigValue::Integer(int_val)
            } else if let Ok(bool_val) = value.parse::<bool>() {
                ConfigValue::Boolean(bool_val)
            } else {
                ConfigValue::String(value)
            }
        })
    }

    fn keys(&self) -> Vec<String> {
        env::vars()
            .filter_map(|(key, _)| match &self.prefix {
                Some(prefix) => {
                    let head = format!("{}_", prefix.to_uppercase());
                    key.strip_prefix(&head).map(str::to_lowercase)
                }
                None => Some(key.to_lowercase()),
            })
            .collect()
    }
}

/// JSON file configuration source
///
/// The file must hold one JSON object; its top-level members are the keys.
#[derive(Debug)]
pub struct JsonConfigSource {
    file_path: PathBuf,
    config: HashMap<String, ConfigValue>,
}

impl JsonConfigSource {
    /// Reads and parses `path`.
    pub fn load(path: impl AsRef<Path>) -> DiResult<Self> {
        let file_path = path.as_ref().to_path_buf();
        let content = std::fs::read_to_string(&file_path).map_err(|e| {
            DiError::Config(format!("cannot read {}: {}", file_path.display(), e))
        })?;
        let config: HashMap<String, ConfigValue> = serde_json::from_str(&content).map_err(|e| {
            DiError::Config(format!("invalid JSON in {}: {}", file_path.display(), e))
        })?;
        Ok(Self { file_path, config })
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }
}

impl ConfigSource for JsonConfigSource {
    fn get(&self, key: &str) -> Option<ConfigValue> {
        self.config.get(key).cloned()
    }

    fn keys(&self) -> Vec<String> {
        self.config.keys().cloned().collect()
    }
}

/// Configuration provider checking its sources in priority order
#[derive(Debug, Default)]
pub struct ConfigProvider {
    sources: Vec<Box<dyn ConfigSource>>,
}

impl ConfigProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a configuration source (higher priority sources should be added first)
    pub fn add_source(&mut self, source: Box<dyn ConfigSource>) -> &mut Self {
        self.sources.push(source);
        self
    }

    /// Get a configuration value, checking sources in priority order
    pub fn get(&self, key: &str) -> Option<ConfigValue> {
        self.sources.iter().find_map(|source| source.get(key))
    }

    /// Get a string configuration value with default
    pub fn get_string_or(&self, key: &str, default: &str) -> DiResult<String> {
        match self.get(key) {
            Some(v) => v.as_string().map(str::to_string).map_err(|e| within(key, e)),
            None => Ok(default.to_string()),
        }
    }

    /// Get an integer configuration value with default
    pub fn get_i64_or(&self, key: &str, default: i64) -> DiResult<i64> {
        match self.get(key) {
            Some(v) => v.as_i64().map_err(|e| within(key, e)),
            None => Ok(default),
        }
    }

    /// Get a boolean configuration value with default
    pub fn get_bool_or(&self, key: &str, default: bool) -> DiResult<bool> {
        match self.get(key) {
            Some(v) => v.as_bool().map_err(|e| within(key, e)),
            None => Ok(default),
        }
    }

    /// Get all configuration keys from all sources
    pub fn all_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.sources.iter().flat_map(|s| s.keys()).collect();
        keys.sort();
        keys.dedup();
        keys
    }
}

fn within(key: &str, err: DiError) -> DiError {
    match err {
        DiError::Config(msg) => DiError::Config(format!("`{}`: {}", key, msg)),
        other => other,
    }
}

/// Which demonstration service the application serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Variant {
    /// `GET /health` backed by a header-probing `DataService`.
    #[default]
    Health,
    /// `GET /health` backed by a `DataService` echoing configured params.
    Params,
    /// `GET /ping` backed by `AnalyticsService`.
    Ping,
}

impl Variant {
    pub fn route(&self) -> &'static str {
        match self {
            Variant::Health | Variant::Params => "/health",
            Variant::Ping => "/ping",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Variant::Health => "health",
            Variant::Params => "params",
            Variant::Ping => "ping",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Variant {
    type Err = DiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "health" => Ok(Variant::Health),
            "params" => Ok(Variant::Params),
            "ping" => Ok(Variant::Ping),
            other => Err(DiError::Config(format!("unknown variant `{}`", other))),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

impl FromStr for LogFormat {
    type Err = DiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            other => Err(DiError::Config(format!("unknown log format `{}`", other))),
        }
    }
}

/// Application settings.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub variant: Variant,
    /// Install one shared service instance for the application lifetime.
    /// When false every request gets a fresh instance.
    pub singleton: bool,
    /// Parameters echoed by the `params` variant.
    pub params: BTreeMap<String, String>,
    pub log_format: LogFormat,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8001,
            variant: Variant::Health,
            singleton: true,
            params: BTreeMap::from([("name".to_string(), "Alex from lifespan".to_string())]),
            log_format: LogFormat::Compact,
        }
    }
}

impl AppConfig {
    /// Loads from `LIFESPAN_*` environment variables, then the JSON file
    /// named by `LIFESPAN_CONFIG` if set, then defaults.
    pub fn load() -> DiResult<Self> {
        let mut provider = ConfigProvider::new();
        provider.add_source(Box::new(EnvironmentConfigSource::with_prefix(ENV_PREFIX)));
        if let Ok(path) = env::var(CONFIG_FILE_VAR) {
            provider.add_source(Box::new(JsonConfigSource::load(path)?));
        }
        Self::from_provider(&provider)
    }

    pub fn from_provider(config: &ConfigProvider) -> DiResult<Self> {
        let defaults = Self::default();

        let port = config.get_i64_or("port", i64::from(defaults.port))?;
        let port = u16::try_from(port)
            .map_err(|_| DiError::Config(format!("`port`: {} is out of range", port)))?;

        let variant = match config.get("variant") {
            Some(v) => v.as_string().map_err(|e| within("variant", e))?.parse()?,
            None => defaults.variant,
        };
        let log_format = match config.get("log_format") {
            Some(v) => v.as_string().map_err(|e| within("log_format", e))?.parse()?,
            None => defaults.log_format,
        };
        let params = match config.get("params") {
            Some(v) => v.as_string_map().map_err(|e| within("params", e))?,
            None => defaults.params,
        };

        Ok(Self {
            host: config.get_string_or("host", &defaults.host)?,
            port,
            variant,
            singleton: config.get_bool_or("singleton", defaults.singleton)?,
            params,
            log_format,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    fn clear_env() {
        for key in ["HOST", "PORT", "VARIANT", "SINGLETON", "LOG_FORMAT", "CONFIG"] {
            env::remove_var(format!("{}_{}", ENV_PREFIX, key));
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_env();
        let config = AppConfig::load().unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.bind_addr(), "0.0.0.0:8001");
        assert_eq!(config.variant.route(), "/health");
    }

    #[test]
    #[serial]
    fn test_environment_overrides() {
        clear_env();
        env::set_var("LIFESPAN_PORT", "9000");
        env::set_var("LIFESPAN_VARIANT", "Ping");
        env::set_var("LIFESPAN_SINGLETON", "false");
        env::set_var("LIFESPAN_HOST", "127.0.0.1");

        let config = AppConfig::load().unwrap();
        clear_env();

        assert_eq!(config.port, 9000);
        assert_eq!(config.variant, Variant::Ping);
        assert!(!config.singleton);
        assert_eq!(config.host, "127.0.0.1");
    }

    #[test]
    #[serial]
    fn test_invalid_values_are_config_errors() {
        clear_env();
        env::set_var("LIFESPAN_PORT", "70000");
        let err = AppConfig::load().unwrap_err();
        assert!(matches!(err, DiError::Config(ref msg) if msg.contains("port")));

        env::set_var("LIFESPAN_PORT", "8080");
        env::set_var("LIFESPAN_SINGLETON", "sometimes");
        let err = AppConfig::load().unwrap_err();
        assert!(matches!(err, DiError::Config(ref msg) if msg.contains("singleton")));
        clear_env();
    }

    #[test]
    #[serial]
    fn test_json_file_below_environment() {
        clear_env();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"variant": "params", "port": 7000, "params": {{"name": "from file", "n": 3}}}}"#
        )
        .unwrap();

        env::set_var(CONFIG_FILE_VAR, file.path());
        env::set_var("LIFESPAN_PORT", "7100");

        let config = AppConfig::load().unwrap();
        clear_env();

        assert_eq!(config.variant, Variant::Params);
        assert_eq!(config.port, 7100);
        assert_eq!(config.params.get("name").map(String::as_str), Some("from file"));
        assert_eq!(config.params.get("n").map(String::as_str), Some("3"));
    }

    #[test]
    #[serial]
    fn test_json_file_with_arrays_and_nulls() {
        clear_env();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"port": 7200, "tags": ["a", "b"], "owner": null, "params": {{"name": "x", "note": null}}}}"#
        )
        .unwrap();

        let source = JsonConfigSource::load(file.path()).unwrap();
        assert_eq!(
            source.get("tags"),
            Some(ConfigValue::Array(vec![
                ConfigValue::String("a".into()),
                ConfigValue::String("b".into())
            ]))
        );
        assert_eq!(source.get("owner"), Some(ConfigValue::Null));

        env::set_var(CONFIG_FILE_VAR, file.path());
        let config = AppConfig::load().unwrap();
        clear_env();

        assert_eq!(config.port, 7200);
        assert_eq!(config.params.get("note").map(String::as_str), Some(""));
    }

    #[test]
    #[serial]
    fn test_numeric_booleans() {
        clear_env();
        env::set_var("LIFESPAN_SINGLETON", "0");
        assert!(!AppConfig::load().unwrap().singleton);

        env::set_var("LIFESPAN_SINGLETON", "1");
        assert!(AppConfig::load().unwrap().singleton);

        env::set_var("LIFESPAN_SINGLETON", "2");
        assert!(AppConfig::load().is_err());
        clear_env();
    }

    #[test]
    fn test_missing_json_file() {
        let err = JsonConfigSource::load("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, DiError::Config(_)));
    }

    #[test]
    fn test_variant_parsing() {
        assert_eq!("HEALTH".parse::<Variant>().unwrap(), Variant::Health);
        assert!("pong".parse::<Variant>().is_err());
        assert_eq!(Variant::Ping.to_string(), "ping");
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
    }
}
