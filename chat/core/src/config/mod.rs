//! TOML Configuration File Support
//!
//! Centralized configuration for the chat client, with an optional TOML file
//! at `~/.config/weather-chat/config.toml`.
//!
//! # Configuration Priority
//!
//! Values are resolved with the following priority (highest first):
//! 1. CLI arguments ([`ConfigOverrides`])
//! 2. Environment variables (`WEATHER_CHAT_*`)
//! 3. TOML configuration file
//! 4. Default values
//!
//! # Example Configuration
//!
//! ```toml
//! [endpoint]
//! url = "https://agents.example.com/api/agents/weatherAgent/stream"
//! timeout_secs = 60
//!
//! [request]
//! thread_id = "19102B0032"
//! temperature = 0.5
//! max_steps = 5
//!
//! [store]
//! title_max_chars = 30
//! default_thread_title = "New Chat"
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Streaming endpoint of the hosted weather agent
pub const DEFAULT_ENDPOINT: &str =
    "https://millions-screeching-vultur.mastra.cloud/api/agents/weatherAgent/stream";

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Tracks where a configuration value came from
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from command-line argument
    Cli,
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    #[default]
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// Endpoint section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointToml {
    /// Streaming endpoint URL
    pub url: Option<String>,

    /// Whole-request timeout in seconds (0 = transport default)
    pub timeout_secs: Option<u64>,

    /// Value of the `Accept-Language` header
    pub accept_language: Option<String>,

    /// Whether to send the `x-mastra-dev-playground` header
    pub playground_header: Option<bool>,
}

/// Request section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestToml {
    /// Agent run identifier
    pub run_id: Option<String>,

    /// Resource identifier
    pub resource_id: Option<String>,

    /// Remote memory thread identifier
    pub thread_id: Option<String>,

    /// Retries the agent may perform server-side
    pub max_retries: Option<u32>,

    /// Maximum agent steps per request
    pub max_steps: Option<u32>,

    /// Sampling temperature
    pub temperature: Option<f32>,

    /// Nucleus sampling
    pub top_p: Option<f32>,
}

/// Store section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreToml {
    /// Characters kept when deriving a title from the first message
    pub title_max_chars: Option<usize>,

    /// Title of threads created without one
    pub default_thread_title: Option<String>,

    /// Assistant text shown when a send fails before any text arrived
    pub error_fallback: Option<String>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatToml {
    /// Endpoint configuration section
    pub endpoint: EndpointToml,

    /// Request configuration section
    pub request: RequestToml,

    /// Store configuration section
    pub store: StoreToml,
}

// =============================================================================
// Resolved Configuration
// =============================================================================

/// Where and how to reach the agent
#[derive(Clone, Debug, PartialEq)]
pub struct EndpointConfig {
    /// Streaming endpoint URL
    pub url: String,
    /// Whole-request timeout (`None` = transport default)
    pub timeout: Option<Duration>,
    /// Value of the `Accept-Language` header
    pub accept_language: String,
    /// Whether to send the `x-mastra-dev-playground` header
    pub playground_header: bool,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_ENDPOINT.to_string(),
            timeout: None,
            accept_language: "en-GB,en-US;q=0.9,en;q=0.8".to_string(),
            playground_header: true,
        }
    }
}

/// Static fields of every outbound request
#[derive(Clone, Debug, PartialEq)]
pub struct RequestDefaults {
    /// Agent run identifier
    pub run_id: String,
    /// Resource identifier
    pub resource_id: String,
    /// Remote memory thread identifier
    pub thread_id: String,
    /// Retries the agent may perform server-side
    pub max_retries: u32,
    /// Maximum agent steps per request
    pub max_steps: u32,
    /// Sampling temperature
    pub temperature: f32,
    /// Nucleus sampling
    pub top_p: f32,
}

impl Default for RequestDefaults {
    fn default() -> Self {
        Self {
            run_id: "weatherAgent".to_string(),
            resource_id: "weatherAgent".to_string(),
            thread_id: "19102B0032".to_string(),
            max_retries: 2,
            max_steps: 5,
            temperature: 0.5,
            top_p: 1.0,
        }
    }
}

/// Store behaviour
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreConfig {
    /// Characters kept when deriving a title from the first message
    pub title_max_chars: usize,
    /// Title of threads created without one
    pub default_thread_title: String,
    /// Assistant text shown when a send fails before any text arrived
    pub error_fallback: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            title_max_chars: 30,
            default_thread_title: "New Chat".to_string(),
            error_fallback: "Sorry, I encountered an error. Please try again.".to_string(),
        }
    }
}

/// Centralized configuration for the chat client
///
/// Use [`load_config`] to load configuration with proper priority handling.
#[derive(Clone, Debug, Default)]
pub struct ChatConfig {
    /// Endpoint configuration
    pub endpoint: EndpointConfig,

    /// Request defaults
    pub request: RequestDefaults,

    /// Store configuration
    pub store: StoreConfig,

    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,

    /// Source of configuration values
    source: ConfigSource,
}

impl ChatConfig {
    /// Create a new configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the primary source of this configuration
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Set the configuration source
    pub fn set_source(&mut self, source: ConfigSource) {
        self.source = source;
    }

    /// Check value ranges
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] naming the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.endpoint.url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::ValidationError(format!(
                "endpoint url must be http(s), got {url:?}"
            )));
        }
        if !(0.0..=2.0).contains(&self.request.temperature) {
            return Err(ConfigError::ValidationError(format!(
                "temperature must be within 0..=2, got {}",
                self.request.temperature
            )));
        }
        if !(0.0..=1.0).contains(&self.request.top_p) {
            return Err(ConfigError::ValidationError(format!(
                "top_p must be within 0..=1, got {}",
                self.request.top_p
            )));
        }
        if self.store.title_max_chars == 0 {
            return Err(ConfigError::ValidationError(
                "title_max_chars must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/weather-chat/config.toml` or
/// `~/.config/weather-chat/config.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("weather-chat").join("config.toml"))
}

/// Load configuration from all sources with proper priority
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed, or if the
/// resolved values are out of range. A missing config file is not an error.
pub fn load_config() -> Result<ChatConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path
///
/// # Arguments
///
/// * `path` - Optional path to the configuration file. If `None`, only defaults
///   and environment variables are used.
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read or parsed.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<ChatConfig, ConfigError> {
    load_config_with_env(path, |key| std::env::var(key).ok())
}

/// Load configuration with a custom environment lookup
///
/// # Errors
///
/// Same as [`load_config_from_path`].
pub fn load_config_with_env(
    path: Option<PathBuf>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<ChatConfig, ConfigError> {
    let mut config = ChatConfig::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: ChatToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, &toml_config);
            config.config_file_path = Some(config_path.clone());
            config.source = ConfigSource::File;

            tracing::info!(
                path = %config_path.display(),
                "Loaded configuration from file"
            );
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    apply_env_config(&mut config, env);
    config.validate()?;

    Ok(config)
}

/// Apply TOML configuration values to the config struct
fn apply_toml_config(config: &mut ChatConfig, toml: &ChatToml) {
    if let Some(ref url) = toml.endpoint.url {
        config.endpoint.url = url.clone();
    }
    if let Some(secs) = toml.endpoint.timeout_secs {
        config.endpoint.timeout = timeout_from_secs(secs);
    }
    if let Some(ref lang) = toml.endpoint.accept_language {
        config.endpoint.accept_language = lang.clone();
    }
    if let Some(enabled) = toml.endpoint.playground_header {
        config.endpoint.playground_header = enabled;
    }

    if let Some(ref run_id) = toml.request.run_id {
        config.request.run_id = run_id.clone();
    }
    if let Some(ref resource_id) = toml.request.resource_id {
        config.request.resource_id = resource_id.clone();
    }
    if let Some(ref thread_id) = toml.request.thread_id {
        config.request.thread_id = thread_id.clone();
    }
    if let Some(retries) = toml.request.max_retries {
        config.request.max_retries = retries;
    }
    if let Some(steps) = toml.request.max_steps {
        config.request.max_steps = steps;
    }
    if let Some(temperature) = toml.request.temperature {
        config.request.temperature = temperature;
    }
    if let Some(top_p) = toml.request.top_p {
        config.request.top_p = top_p;
    }

    if let Some(chars) = toml.store.title_max_chars {
        config.store.title_max_chars = chars;
    }
    if let Some(ref title) = toml.store.default_thread_title {
        config.store.default_thread_title = title.clone();
    }
    if let Some(ref fallback) = toml.store.error_fallback {
        config.store.error_fallback = fallback.clone();
    }
}

/// Apply environment variable overrides to the config
fn apply_env_config(config: &mut ChatConfig, env: impl Fn(&str) -> Option<String>) {
    if let Some(url) = env("WEATHER_CHAT_ENDPOINT") {
        config.endpoint.url = url;
        config.source = ConfigSource::Env;
    }
    if let Some(timeout) = env("WEATHER_CHAT_TIMEOUT_SECS") {
        if let Ok(secs) = timeout.parse::<u64>() {
            config.endpoint.timeout = timeout_from_secs(secs);
            config.source = ConfigSource::Env;
        }
    }
    if let Some(thread_id) = env("WEATHER_CHAT_THREAD_ID") {
        config.request.thread_id = thread_id;
        config.source = ConfigSource::Env;
    }
    if let Some(resource_id) = env("WEATHER_CHAT_RESOURCE_ID") {
        config.request.resource_id = resource_id;
        config.source = ConfigSource::Env;
    }
    if let Some(temperature) = env("WEATHER_CHAT_TEMPERATURE") {
        if let Ok(t) = temperature.parse::<f32>() {
            config.request.temperature = t;
            config.source = ConfigSource::Env;
        }
    }
}

fn timeout_from_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

// =============================================================================
// CLI Override Support
// =============================================================================

/// Builder for applying CLI overrides to configuration
///
/// Use this after [`load_config`] to apply command-line argument overrides.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Endpoint URL override
    pub endpoint_url: Option<String>,

    /// Timeout override (seconds, 0 = transport default)
    pub timeout_secs: Option<u64>,
}

impl ConfigOverrides {
    /// Create a new empty set of overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set endpoint URL override
    #[must_use]
    pub fn with_endpoint_url(mut self, url: String) -> Self {
        self.endpoint_url = Some(url);
        self
    }

    /// Set timeout override
    #[must_use]
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Apply overrides to a loaded configuration
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] if an override is out of range.
    pub fn apply(&self, config: &mut ChatConfig) -> Result<(), ConfigError> {
        if let Some(ref url) = self.endpoint_url {
            config.endpoint.url = url.clone();
            config.source = ConfigSource::Cli;
        }
        if let Some(secs) = self.timeout_secs {
            config.endpoint.timeout = timeout_from_secs(secs);
            config.source = ConfigSource::Cli;
        }
        config.validate()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn write_toml(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = ChatConfig::default();

        assert_eq!(config.endpoint.url, DEFAULT_ENDPOINT);
        assert_eq!(config.endpoint.timeout, None);
        assert_eq!(config.request.max_retries, 2);
        assert_eq!(config.request.max_steps, 5);
        assert_eq!(config.store.title_max_chars, 30);
        assert_eq!(config.store.default_thread_title, "New Chat");
        assert_eq!(config.source(), ConfigSource::Default);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_config_path() {
        if let Some(path) = default_config_path() {
            assert!(path.ends_with("weather-chat/config.toml"));
        }
    }

    #[test]
    fn test_parse_partial_toml() {
        let file = write_toml(
            r#"
[endpoint]
url = "http://localhost:4111/api/agents/weatherAgent/stream"
timeout_secs = 45

[store]
title_max_chars = 20
"#,
        );

        let config =
            load_config_with_env(Some(file.path().to_path_buf()), no_env).unwrap();

        assert_eq!(
            config.endpoint.url,
            "http://localhost:4111/api/agents/weatherAgent/stream"
        );
        assert_eq!(config.endpoint.timeout, Some(Duration::from_secs(45)));
        assert_eq!(config.store.title_max_chars, 20);
        // untouched sections keep defaults
        assert_eq!(config.request, RequestDefaults::default());
        assert_eq!(config.source(), ConfigSource::File);
        assert_eq!(config.config_file_path.as_deref(), Some(file.path()));
    }

    #[test]
    fn test_missing_file_graceful() {
        let config = load_config_with_env(
            Some(PathBuf::from("/nonexistent/weather-chat/config.toml")),
            no_env,
        )
        .unwrap();
        assert_eq!(config.source(), ConfigSource::Default);
        assert!(config.config_file_path.is_none());
    }

    #[test]
    fn test_malformed_toml_error() {
        let file = write_toml("[endpoint\nurl = ");
        let result = load_config_with_env(Some(file.path().to_path_buf()), no_env);
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_env_overrides_file() {
        let file = write_toml("[request]\nthread_id = \"from-file\"\ntemperature = 0.2\n");
        let env: HashMap<&str, &str> = [
            ("WEATHER_CHAT_THREAD_ID", "from-env"),
            ("WEATHER_CHAT_TIMEOUT_SECS", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let config = load_config_with_env(Some(file.path().to_path_buf()), |k| {
            env.get(k).map(|v| (*v).to_string())
        })
        .unwrap();

        assert_eq!(config.request.thread_id, "from-env");
        assert!((config.request.temperature - 0.2).abs() < f32::EPSILON);
        assert_eq!(config.endpoint.timeout, None);
        assert_eq!(config.source(), ConfigSource::Env);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let file = write_toml("[request]\ntop_p = 3.0\n");
        let result = load_config_with_env(Some(file.path().to_path_buf()), no_env);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));

        let file = write_toml("[endpoint]\nurl = \"ftp://example.com\"\n");
        let result = load_config_with_env(Some(file.path().to_path_buf()), no_env);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_cli_overrides_apply() {
        let mut config = ChatConfig::default();
        ConfigOverrides::new()
            .with_endpoint_url("http://127.0.0.1:9000/stream".to_string())
            .with_timeout_secs(0)
            .apply(&mut config)
            .unwrap();

        assert_eq!(config.endpoint.url, "http://127.0.0.1:9000/stream");
        assert_eq!(config.endpoint.timeout, None);
        assert_eq!(config.source(), ConfigSource::Cli);
    }

    #[test]
    fn test_config_overrides_empty_no_change() {
        let mut config = ChatConfig::default();
        ConfigOverrides::new().apply(&mut config).unwrap();
        assert_eq!(config.source(), ConfigSource::Default);
        assert_eq!(config.endpoint, EndpointConfig::default());
    }

    #[test]
    fn test_config_source_display() {
        assert_eq!(ConfigSource::Cli.to_string(), "CLI");
        assert_eq!(ConfigSource::Env.to_string(), "environment");
        assert_eq!(ConfigSource::File.to_string(), "config file");
        assert_eq!(ConfigSource::Default.to_string(), "default");
    }
}
