/// Configuration system for deepfix
///
/// Supports loading from multiple sources with priority:
/// CLI args > Environment variables > Config file > Defaults
use crate::error::{ConfigError, DeepfixError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Project scanning configuration
    #[serde(default)]
    pub scanner: ScannerConfig,

    /// Context extraction configuration
    #[serde(default)]
    pub context: ContextConfig,

    /// Model endpoint configuration
    #[serde(default)]
    pub model: ModelConfig,
}

/// Project scanning configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Hard cap on source files visited by a scan
    #[serde(default = "default_max_files")]
    pub max_files: usize,

    /// Maximum depth of the rendered file tree
    #[serde(default = "default_tree_max_depth")]
    pub tree_max_depth: usize,

    /// Maximum entries per directory in the rendered file tree
    #[serde(default = "default_tree_max_files_per_dir")]
    pub tree_max_files_per_dir: usize,
}

/// Context extraction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Line budget for window extraction (half on each side, at most 50)
    #[serde(default = "default_max_context_lines")]
    pub max_context_lines: usize,

    /// Maximum number of upstream files pulled into the context
    #[serde(default = "default_max_upstream_files")]
    pub max_upstream_files: usize,

    /// Number of ranked files the error analyzer returns
    #[serde(default = "default_relevant_file_limit")]
    pub relevant_file_limit: usize,
}

/// Model endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Models to try, in priority order
    #[serde(default = "default_models")]
    pub models: Vec<String>,

    /// Attempts per model before falling back to the next one
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Network timeout for a single model call, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Base URL of the generateContent endpoint
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API keys, rotated on quota errors. Never written back to disk.
    #[serde(default, skip_serializing)]
    pub api_keys: Vec<String>,
}

// Default value functions
pub(crate) fn default_max_files() -> usize {
    1000
}

pub(crate) fn default_tree_max_depth() -> usize {
    4
}

pub(crate) fn default_tree_max_files_per_dir() -> usize {
    15
}

pub(crate) fn default_max_context_lines() -> usize {
    100
}

fn default_max_upstream_files() -> usize {
    5
}

fn default_relevant_file_limit() -> usize {
    5
}

fn default_models() -> Vec<String> {
    vec![
        "gemini-2.5-flash-lite".to_string(),
        "gemini-2.5-flash".to_string(),
    ]
}

fn default_max_retries() -> u32 {
    3
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            max_files: default_max_files(),
            tree_max_depth: default_tree_max_depth(),
            tree_max_files_per_dir: default_tree_max_files_per_dir(),
        }
    }
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_context_lines: default_max_context_lines(),
            max_upstream_files: default_max_upstream_files(),
            relevant_file_limit: default_relevant_file_limit(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            models: default_models(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
            base_url: default_base_url(),
            api_keys: Vec::new(),
        }
    }
}

fn push_key(keys: &mut Vec<String>, key: &str) {
    let key = key.trim();
    if !key.is_empty() && !keys.iter().any(|k| k == key) {
        keys.push(key.to_string());
    }
}

/// Collect API keys using the given variable lookup
///
/// A comma-separated `GEMINI_API_KEYS` (or `GOOGLE_API_KEYS`) wins. Otherwise
/// `GEMINI_API_KEY` plus `GEMINI_API_KEY2`..`GEMINI_API_KEY5` are gathered, with the
/// `GOOGLE_` names as a fallback for each slot. Duplicates are dropped.
pub fn api_keys_from<F>(lookup: F) -> Vec<String>
where
    F: Fn(&str) -> Option<String>,
{
    let mut keys: Vec<String> = Vec::new();

    if let Some(list) = lookup("GEMINI_API_KEYS").or_else(|| lookup("GOOGLE_API_KEYS")) {
        for key in list.split(',') {
            push_key(&mut keys, key);
        }
        if !keys.is_empty() {
            return keys;
        }
    }

    for suffix in ["", "2", "3", "4", "5"] {
        let value = lookup(&format!("GEMINI_API_KEY{}", suffix))
            .or_else(|| lookup(&format!("GOOGLE_API_KEY{}", suffix)));
        if let Some(key) = value {
            push_key(&mut keys, &key);
        }
    }

    keys
}

impl Config {
    /// Load configuration from file
    pub fn from_file(path: &Path) -> Result<Self, DeepfixError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()).into());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::LoadFailed(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| ConfigError::ParseFailed(format!("Invalid TOML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default location or create default
    pub fn load_or_default() -> Result<Self, DeepfixError> {
        let config_path = crate::paths::PlatformPaths::default_config_path();

        if config_path.exists() {
            tracing::info!("Loading config from: {}", config_path.display());
            Self::from_file(&config_path)
        } else {
            tracing::info!("No config file found, using defaults");
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<(), DeepfixError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ConfigError::SaveFailed(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SaveFailed(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| ConfigError::SaveFailed(format!("Failed to write config file: {}", e)))?;

        tracing::info!("Saved config to: {}", path.display());
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), DeepfixError> {
        if self.scanner.max_files == 0 {
            return Err(ConfigError::InvalidValue {
                key: "scanner.max_files".to_string(),
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }

        if self.scanner.tree_max_files_per_dir == 0 {
            return Err(ConfigError::InvalidValue {
                key: "scanner.tree_max_files_per_dir".to_string(),
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }

        if self.context.max_context_lines < 2 {
            return Err(ConfigError::InvalidValue {
                key: "context.max_context_lines".to_string(),
                reason: format!("must be at least 2, got {}", self.context.max_context_lines),
            }
            .into());
        }

        if self.model.models.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "model.models".to_string(),
                reason: "at least one model is required".to_string(),
            }
            .into());
        }

        if self.model.max_retries == 0 {
            return Err(ConfigError::InvalidValue {
                key: "model.max_retries".to_string(),
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }

        if self.model.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "model.timeout_secs".to_string(),
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }

        Ok(())
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        if let Ok(models) = std::env::var("DEEPFIX_MODELS") {
            let models: Vec<String> = models
                .split(',')
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty())
                .collect();
            if !models.is_empty() {
                self.model.models = models;
            }
        }

        if let Ok(retries) = std::env::var("DEEPFIX_MAX_RETRIES")
            && let Ok(retries) = retries.parse()
        {
            self.model.max_retries = retries;
        }

        if let Ok(timeout) = std::env::var("DEEPFIX_TIMEOUT_SECS")
            && let Ok(timeout) = timeout.parse()
        {
            self.model.timeout_secs = timeout;
        }

        if let Ok(url) = std::env::var("DEEPFIX_BASE_URL") {
            self.model.base_url = url;
        }

        if let Ok(max_files) = std::env::var("DEEPFIX_MAX_FILES")
            && let Ok(max_files) = max_files.parse()
        {
            self.scanner.max_files = max_files;
        }

        let keys = api_keys_from(|name| std::env::var(name).ok());
        if !keys.is_empty() {
            self.model.api_keys = keys;
        }
    }

    /// Create a new Config with defaults and environment overrides
    pub fn new() -> Result<Self, DeepfixError> {
        let mut config = Self::load_or_default()?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests;
