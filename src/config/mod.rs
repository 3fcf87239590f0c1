//! Configuration management for Periphery
//!
//! Loads the TOML config file, applies `PERIPHERY_*` environment overrides
//! and validates the result before anything else touches it.

use crate::error::{PeripheryError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

mod validator;

pub use validator::ConfigValidator;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "_meta")]
    pub meta: MetaConfig,
    pub storage: StorageConfig,
    pub registry: RegistryConfig,
    pub github: GithubConfig,
    pub llm: LlmConfig,
    pub analysis: AnalysisConfig,
}

/// Metadata about the configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaConfig {
    pub schema_version: String,
    #[serde(default = "current_timestamp")]
    pub created_at: String,
    #[serde(default = "current_timestamp")]
    pub last_modified: String,
}

fn current_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

/// Package registry lookups
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    pub base_url: String,
    /// Lookups in flight at once during resolution
    pub concurrency: usize,
}

/// Hosting platform REST API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubConfig {
    pub api_base: String,
    /// Host of the repository URLs this API serves
    #[serde(default = "default_web_host")]
    pub web_host: String,
    pub token_env: String,
    pub user_agent: String,
    pub per_page: u32,
}

fn default_web_host() -> String {
    "github.com".to_string()
}

/// Scoring model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub provider: String,
    pub api_key_env: String,
    pub model: String,
    pub endpoint: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Scoring cutoff and read limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub signal_cutoff: f64,
    pub log_limit: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            signal_cutoff: 0.35,
            log_limit: 200,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(PeripheryError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| PeripheryError::Io {
            source: e,
            context: format!("Failed to read config file: {:?}", path),
        })?;
        let config: Config = toml::from_str(&content)?;
        config.validated()
    }

    /// Load from `path`, or fall back to defaults when no file exists there.
    ///
    /// Env overrides and validation apply either way.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            return Self::load(path);
        }

        tracing::warn!(
            "Config file not found, using defaults. Run 'periphery config init' to create one."
        );
        Self::default().validated()
    }

    /// Apply env overrides, then reject the result if any value is out of range
    pub fn validated(mut self) -> Result<Self> {
        self.apply_env_overrides();
        ConfigValidator::validate(&self)?;
        Ok(self)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| PeripheryError::Io {
            source: e,
            context: format!("Failed to write config file: {:?}", path),
        })?;
        Ok(())
    }

    /// Apply environment variable overrides
    /// Environment variables in format: PERIPHERY_SECTION__KEY=value
    pub fn apply_env_overrides(&mut self) {
        for (key, value) in std::env::vars() {
            if let Some(config_key) = key.strip_prefix("PERIPHERY_") {
                if let Err(e) = self.set_value_from_env(config_key, &value) {
                    tracing::warn!("Failed to apply env override {}: {}", key, e);
                }
            }
        }
    }

    fn set_value_from_env(&mut self, path: &str, value: &str) -> Result<()> {
        match path {
            "ANALYSIS__SIGNAL_CUTOFF" => {
                self.analysis.signal_cutoff =
                    value.parse().map_err(|_| PeripheryError::InvalidConfigValue {
                        path: path.to_string(),
                        message: format!("Cannot parse '{}' as a number", value),
                    })?;
            }
            "LLM__MODEL" => {
                self.llm.model = value.to_string();
            }
            "GITHUB__API_BASE" => {
                self.github.api_base = value.to_string();
            }
            "GITHUB__WEB_HOST" => {
                self.github.web_host = value.to_string();
            }
            "REGISTRY__BASE_URL" => {
                self.registry.base_url = value.to_string();
            }
            "STORAGE__DATA_DIR" => {
                self.storage.data_dir = PathBuf::from(value);
            }
            _ => {
                tracing::debug!("Unknown env config key: {}", path);
            }
        }
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| {
            PeripheryError::Config("Cannot determine config directory".to_string())
        })?;

        Ok(config_dir.join("periphery").join("config.toml"))
    }

    /// Path of the SQLite database under the data directory
    pub fn database_path(&self) -> PathBuf {
        expand_tilde(&self.storage.data_dir).join("periphery.sqlite")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            meta: MetaConfig {
                schema_version: "1.0.0".to_string(),
                created_at: current_timestamp(),
                last_modified: current_timestamp(),
            },
            storage: StorageConfig {
                data_dir: PathBuf::from("~/.periphery"),
            },
            registry: RegistryConfig {
                base_url: "https://registry.npmjs.org".to_string(),
                concurrency: 8,
            },
            github: GithubConfig {
                api_base: "https://api.github.com".to_string(),
                web_host: default_web_host(),
                token_env: "GITHUB_TOKEN".to_string(),
                user_agent: "periphery-app".to_string(),
                per_page: 100,
            },
            llm: LlmConfig {
                provider: "anthropic".to_string(),
                api_key_env: "ANTHROPIC_API_KEY".to_string(),
                model: "claude-3-5-sonnet-latest".to_string(),
                endpoint: "https://api.anthropic.com/v1/messages".to_string(),
                max_tokens: 1024,
                temperature: 0.0,
            },
            analysis: AnalysisConfig::default(),
        }
    }
}

/// Expand a leading `~` to the home directory
pub fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    path.to_path_buf()
}
