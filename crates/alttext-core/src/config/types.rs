//! Sub-configuration structs with their defaults.

use serde::{Deserialize, Serialize};

/// Request limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Per-request timeout in milliseconds (connect timeout for streaming)
    pub timeout_ms: u64,

    /// Maximum tokens to generate
    pub max_tokens: u32,

    /// Images with a longer edge are downscaled before upload
    pub max_image_dimension: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 60_000,
            max_tokens: 1024,
            max_image_dimension: 2048,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// Base URLs for the hosted APIs. Override to route through a proxy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointsConfig {
    /// OpenAI API base (`/chat/completions` is appended)
    pub openai: String,

    /// Anthropic API base (`/messages` is appended)
    pub anthropic: String,

    /// Gemini API base (`/models/{model}:generateContent` is appended)
    pub gemini: String,

    /// Replaces `https://{resource}.openai.azure.com` when set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub azure: Option<String>,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            openai: "https://api.openai.com/v1".to_string(),
            anthropic: "https://api.anthropic.com/v1".to_string(),
            gemini: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            azure: None,
        }
    }
}

/// Per-provider settings. Only the active provider's section is required.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ProvidersConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub azure_openai: Option<AzureOpenaiConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub openai: Option<OpenaiConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub claude: Option<ClaudeConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub gemini: Option<GeminiConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub openai_compatible: Option<OpenaiCompatibleConfig>,
}

/// Azure OpenAI configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AzureOpenaiConfig {
    /// API key (supports ${ENV_VAR} syntax)
    pub api_key: String,

    /// Model name sent in the request body
    pub model: String,

    /// Azure resource name (`{resource}.openai.azure.com`)
    pub resource_name: String,

    /// Deployment id
    pub deployment_id: String,
}

impl Default for AzureOpenaiConfig {
    fn default() -> Self {
        Self {
            api_key: "${AZURE_OPENAI_API_KEY}".to_string(),
            model: "gpt-4o".to_string(),
            resource_name: String::new(),
            deployment_id: String::new(),
        }
    }
}

/// OpenAI configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenaiConfig {
    /// API key (supports ${ENV_VAR} syntax)
    pub api_key: String,

    /// Model name
    pub model: String,

    /// Optional organization id
    pub organization: String,
}

impl Default for OpenaiConfig {
    fn default() -> Self {
        Self {
            api_key: "${OPENAI_API_KEY}".to_string(),
            model: "gpt-4o".to_string(),
            organization: String::new(),
        }
    }
}

/// Claude configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClaudeConfig {
    /// API key (supports ${ENV_VAR} syntax)
    pub api_key: String,

    /// Model name
    pub model: String,
}

impl Default for ClaudeConfig {
    fn default() -> Self {
        Self {
            api_key: "${ANTHROPIC_API_KEY}".to_string(),
            model: "claude-3-5-sonnet-latest".to_string(),
        }
    }
}

/// Gemini configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    /// API key (supports ${ENV_VAR} syntax)
    pub api_key: String,

    /// Model name
    pub model: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: "${GEMINI_API_KEY}".to_string(),
            model: "gemini-1.5-flash".to_string(),
        }
    }
}

/// Generic OpenAI-compatible endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenaiCompatibleConfig {
    /// API key (supports ${ENV_VAR} syntax)
    pub api_key: String,

    /// Model name
    pub model: String,

    /// Base URL, `/chat/completions` is appended
    pub base_url: String,
}

impl Default for OpenaiCompatibleConfig {
    fn default() -> Self {
        Self {
            api_key: "${OPENAI_COMPATIBLE_API_KEY}".to_string(),
            model: String::new(),
            base_url: String::new(),
        }
    }
}
