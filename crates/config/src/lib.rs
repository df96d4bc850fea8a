//! Configuration loading, validation, and management for ChurnGuard.
//!
//! Loads configuration from `~/.churnguard/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CHURN_MODEL: &str = "gemini-3-pro-preview";
pub const DEFAULT_PORTFOLIO_MODEL: &str = "gemini-3-flash-preview";

/// Credential variables, highest priority first.
const API_KEY_VARS: [&str; 3] = ["CHURNGUARD_API_KEY", "GEMINI_API_KEY", "API_KEY"];

/// The root configuration structure.
///
/// Maps directly to `~/.churnguard/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Inference service credential
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Inference backend ("gemini", "openai", "openrouter", "ollama", ...)
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Base URL override for the backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// Per-request timeout, in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Extra attempts after a transient failure (0 = single attempt)
    #[serde(default)]
    pub max_retries: u32,

    /// Currency label used when describing charges to the model
    #[serde(default = "default_currency")]
    pub currency: String,

    /// Churn inference pipeline
    #[serde(default = "PipelineConfig::churn", deserialize_with = "churn_section")]
    pub churn: PipelineConfig,

    /// Portfolio synthesis pipeline
    #[serde(
        default = "PipelineConfig::portfolio",
        deserialize_with = "portfolio_section"
    )]
    pub portfolio: PipelineConfig,

    /// Gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,
}

fn default_provider() -> String {
    "gemini".into()
}
fn default_request_timeout_secs() -> u64 {
    120
}
fn default_currency() -> String {
    "INR".into()
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("provider", &self.provider)
            .field("api_url", &self.api_url)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("currency", &self.currency)
            .field("churn", &self.churn)
            .field("portfolio", &self.portfolio)
            .field("gateway", &self.gateway)
            .finish()
    }
}

/// Model settings for one pipeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineConfig {
    pub model: String,
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl PipelineConfig {
    pub fn churn() -> Self {
        Self {
            model: DEFAULT_CHURN_MODEL.into(),
            temperature: 0.2,
            max_tokens: Some(2048),
        }
    }

    pub fn portfolio() -> Self {
        Self {
            model: DEFAULT_PORTFOLIO_MODEL.into(),
            temperature: 0.7,
            max_tokens: Some(8192),
        }
    }

    fn validate(&self, section: &str) -> Result<(), ConfigError> {
        if self.model.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "[{section}] model must not be empty"
            )));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::ValidationError(format!(
                "[{section}] temperature must be between 0.0 and 2.0"
            )));
        }
        Ok(())
    }
}

/// A `[churn]` or `[portfolio]` table as written. Omitted keys, and an
/// empty model, take the pipeline's own defaults.
#[derive(Deserialize)]
struct PipelineSection {
    model: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

impl PipelineSection {
    fn over(self, defaults: PipelineConfig) -> PipelineConfig {
        PipelineConfig {
            model: self
                .model
                .filter(|model| !model.is_empty())
                .unwrap_or(defaults.model),
            temperature: self.temperature.unwrap_or(defaults.temperature),
            max_tokens: self.max_tokens.or(defaults.max_tokens),
        }
    }
}

fn churn_section<'de, D: Deserializer<'de>>(deserializer: D) -> Result<PipelineConfig, D::Error> {
    PipelineSection::deserialize(deserializer).map(|section| section.over(PipelineConfig::churn()))
}

fn portfolio_section<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<PipelineConfig, D::Error> {
    PipelineSection::deserialize(deserializer)
        .map(|section| section.over(PipelineConfig::portfolio()))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// Browser origins allowed to call the API (the rendering layer).
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

fn default_port() -> u16 {
    42618
}
fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_allowed_origins() -> Vec<String> {
    vec!["http://localhost:3000".into()]
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            allowed_origins: default_allowed_origins(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default location with environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        Self::load_with(&config_path, |key| std::env::var(key).ok())
    }

    /// Load from `path`, then apply overrides read through `lookup`.
    ///
    /// `lookup` stands in for the process environment so callers can supply
    /// a fixed set of variables.
    pub fn load_with<F>(path: &Path, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::load_from(path)?;
        config.apply_env_overrides(lookup);
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a config file without consulting the environment.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let mut config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        // A blank key in the file means no key, same as a blank env var.
        if config.api_key.as_deref().is_some_and(|key| key.trim().is_empty()) {
            config.api_key = None;
        }
        config.validate()?;
        Ok(config)
    }

    /// Environment variables take priority over the file. Empty values are ignored.
    fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = API_KEY_VARS.iter().find_map(|name| var(name)) {
            self.api_key = Some(key);
        }
        if let Some(provider) = var("CHURNGUARD_PROVIDER") {
            self.provider = provider;
        }
        if let Some(model) = var("CHURNGUARD_CHURN_MODEL") {
            self.churn.model = model;
        }
        if let Some(model) = var("CHURNGUARD_PORTFOLIO_MODEL") {
            self.portfolio.model = model;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".churnguard")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "request_timeout_secs must be > 0".into(),
            ));
        }
        if self.provider.trim().is_empty() {
            return Err(ConfigError::ValidationError("provider must not be empty".into()));
        }
        self.churn.validate("churn")?;
        self.portfolio.validate("portfolio")?;
        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key().is_some()
    }

    fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|key| !key.trim().is_empty())
    }

    /// The credential, or [`ConfigError::MissingApiKey`].
    ///
    /// Local Ollama endpoints need no key and yield `None`.
    pub fn require_api_key(&self) -> Result<Option<&str>, ConfigError> {
        match self.api_key() {
            Some(key) => Ok(Some(key)),
            None if self.provider == "ollama" => Ok(None),
            None => Err(ConfigError::MissingApiKey {
                provider: self.provider.clone(),
            }),
        }
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            provider: default_provider(),
            api_url: None,
            request_timeout_secs: default_request_timeout_secs(),
            max_retries: 0,
            currency: default_currency(),
            churn: PipelineConfig::churn(),
            portfolio: PipelineConfig::portfolio(),
            gateway: GatewayConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    #[error(
        "No API key for provider '{provider}'. Set CHURNGUARD_API_KEY (or GEMINI_API_KEY / API_KEY), or api_key in config.toml"
    )]
    MissingApiKey { provider: String },
}

impl From<ConfigError> for churnguard_core::Error {
    fn from(e: ConfigError) -> Self {
        churnguard_core::Error::Config {
            message: e.to_string(),
        }
    }
}
