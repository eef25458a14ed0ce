//! Configuration management for alttext.
//!
//! Configuration is loaded from the platform config directory (see
//! [`Config::default_path`]) with sensible defaults. It plays the role of the
//! settings store: active provider, preset prompt, streaming flag, and the
//! per-provider credentials.

mod types;
mod validate;

pub use types::*;

use crate::error::ConfigError;
use crate::llm::provider::{resolve_env_var, ProviderConfig, ProviderKind};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Prompt used when none is configured.
pub const DEFAULT_PROMPT: &str = "Write alt text for this image. Describe the main subject, \
     setting, and any legible text in one or two plain sentences.";

/// Root configuration structure for alttext.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Provider used for requests
    pub provider: ProviderKind,

    /// Preset prompt sent with every image
    pub prompt: String,

    /// Deliver completions incrementally
    pub streaming: bool,

    /// Request limits
    pub limits: LimitsConfig,

    /// Logging settings
    pub logging: LoggingConfig,

    /// API base URLs
    pub endpoints: EndpointsConfig,

    /// Per-provider settings
    pub providers: ProvidersConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            prompt: DEFAULT_PROMPT.to_string(),
            streaming: true,
            limits: LimitsConfig::default(),
            logging: LoggingConfig::default(),
            endpoints: EndpointsConfig::default(),
            providers: ProvidersConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default configuration if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path.
    ///
    /// Uses platform-appropriate directories:
    /// - macOS: ~/Library/Application Support/com.alttext.alttext/config.toml
    /// - Linux: ~/.config/alttext/config.toml
    /// - Windows: C:\Users\<User>\AppData\Roaming\alttext\alttext\config\config.toml
    ///
    /// Falls back to ~/.alttext/config.toml if directory detection fails.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "alttext", "alttext")
            .map(|dirs| dirs.config_dir().to_path_buf().join("config.toml"))
            .unwrap_or_else(|| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".alttext").join("config.toml")
            })
    }

    /// Resolve the active provider's section.
    pub fn active_provider(&self) -> ProviderConfig {
        self.provider_config(self.provider)
    }

    /// Resolve one provider's section into a request-ready config.
    ///
    /// Missing sections fall back to defaults and unresolvable `${ENV_VAR}`
    /// keys become empty; the client rejects the result as incomplete.
    pub fn provider_config(&self, kind: ProviderKind) -> ProviderConfig {
        let key = |raw: &str| resolve_env_var(raw).unwrap_or_default();
        let providers = &self.providers;

        match kind {
            ProviderKind::AzureOpenai => {
                let cfg = providers.azure_openai.clone().unwrap_or_default();
                ProviderConfig::AzureOpenai {
                    api_key: key(&cfg.api_key),
                    model: cfg.model,
                    resource_name: cfg.resource_name,
                    deployment_id: cfg.deployment_id,
                }
            }
            ProviderKind::Openai => {
                let cfg = providers.openai.clone().unwrap_or_default();
                ProviderConfig::Openai {
                    api_key: key(&cfg.api_key),
                    model: cfg.model,
                    organization: cfg.organization,
                }
            }
            ProviderKind::Claude => {
                let cfg = providers.claude.clone().unwrap_or_default();
                ProviderConfig::Claude {
                    api_key: key(&cfg.api_key),
                    model: cfg.model,
                }
            }
            ProviderKind::Gemini => {
                let cfg = providers.gemini.clone().unwrap_or_default();
                ProviderConfig::Gemini {
                    api_key: key(&cfg.api_key),
                    model: cfg.model,
                }
            }
            ProviderKind::OpenaiCompatible => {
                let cfg = providers.openai_compatible.clone().unwrap_or_default();
                ProviderConfig::OpenaiCompatible {
                    api_key: key(&cfg.api_key),
                    model: cfg.model,
                    base_url: cfg.base_url,
                }
            }
        }
    }

    /// Serialize the config to a pretty TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}
