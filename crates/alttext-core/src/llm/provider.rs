//! Provider configuration and request types.
//!
//! [`ProviderConfig`] is a tagged union over every supported vendor. The
//! client dispatches on its variant; there is no provider trait.

use crate::error::CompletionError;
use crate::image::ImageInput;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one vendor-specific vision completion API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderKind {
    AzureOpenai,
    #[default]
    Openai,
    Claude,
    Gemini,
    OpenaiCompatible,
}

impl ProviderKind {
    /// All kinds, in the order they are presented to users.
    pub const ALL: [ProviderKind; 5] = [
        ProviderKind::AzureOpenai,
        ProviderKind::Openai,
        ProviderKind::Claude,
        ProviderKind::Gemini,
        ProviderKind::OpenaiCompatible,
    ];

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            ProviderKind::AzureOpenai => "Azure OpenAI",
            ProviderKind::Openai => "OpenAI",
            ProviderKind::Claude => "Claude",
            ProviderKind::Gemini => "Gemini",
            ProviderKind::OpenaiCompatible => "OpenAI-compatible",
        }
    }

    /// Name of the `[providers.*]` config section for this kind.
    pub fn section(&self) -> &'static str {
        match self {
            ProviderKind::AzureOpenai => "azure_openai",
            ProviderKind::Openai => "openai",
            ProviderKind::Claude => "claude",
            ProviderKind::Gemini => "gemini",
            ProviderKind::OpenaiCompatible => "openai_compatible",
        }
    }

    /// Value used for this kind in the config file and on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::AzureOpenai => "azure-openai",
            ProviderKind::Openai => "openai",
            ProviderKind::Claude => "claude",
            ProviderKind::Gemini => "gemini",
            ProviderKind::OpenaiCompatible => "openai-compatible",
        }
    }

    /// Conventional environment variable holding the API key.
    pub fn env_var(&self) -> &'static str {
        match self {
            ProviderKind::AzureOpenai => "AZURE_OPENAI_API_KEY",
            ProviderKind::Openai => "OPENAI_API_KEY",
            ProviderKind::Claude => "ANTHROPIC_API_KEY",
            ProviderKind::Gemini => "GEMINI_API_KEY",
            ProviderKind::OpenaiCompatible => "OPENAI_COMPATIBLE_API_KEY",
        }
    }

    /// Suggested vision-capable models, first one is the default.
    pub fn suggested_models(&self) -> &'static [&'static str] {
        match self {
            ProviderKind::AzureOpenai | ProviderKind::Openai => &["gpt-4o", "gpt-4o-mini", "o1"],
            ProviderKind::Claude => &[
                "claude-3-5-sonnet-latest",
                "claude-3-opus-latest",
                "claude-3-haiku-20240307",
            ],
            ProviderKind::Gemini => &[
                "gemini-1.5-flash",
                "gemini-1.5-flash-8b",
                "gemini-1.5-pro",
                "gemini-2.0-flash-exp",
            ],
            ProviderKind::OpenaiCompatible => &[],
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProviderKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s || kind.section() == s)
            .ok_or_else(|| format!("Unknown provider: {s}"))
    }
}

/// Fully resolved settings for one provider, immutable for a request.
#[derive(Clone, PartialEq, Eq)]
pub enum ProviderConfig {
    AzureOpenai {
        api_key: String,
        model: String,
        resource_name: String,
        deployment_id: String,
    },
    Openai {
        api_key: String,
        model: String,
        /// Empty means no organization header.
        organization: String,
    },
    Claude {
        api_key: String,
        model: String,
    },
    Gemini {
        api_key: String,
        model: String,
    },
    OpenaiCompatible {
        api_key: String,
        model: String,
        base_url: String,
    },
}

// Hand-written so API keys never reach the logs.
impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct(self.kind().label());
        s.field("model", &self.model());
        match self {
            ProviderConfig::AzureOpenai {
                resource_name,
                deployment_id,
                ..
            } => {
                s.field("resource_name", resource_name);
                s.field("deployment_id", deployment_id);
            }
            ProviderConfig::Openai { organization, .. } => {
                s.field("organization", organization);
            }
            ProviderConfig::OpenaiCompatible { base_url, .. } => {
                s.field("base_url", base_url);
            }
            ProviderConfig::Claude { .. } | ProviderConfig::Gemini { .. } => {}
        }
        s.finish_non_exhaustive()
    }
}

impl ProviderConfig {
    pub fn kind(&self) -> ProviderKind {
        match self {
            ProviderConfig::AzureOpenai { .. } => ProviderKind::AzureOpenai,
            ProviderConfig::Openai { .. } => ProviderKind::Openai,
            ProviderConfig::Claude { .. } => ProviderKind::Claude,
            ProviderConfig::Gemini { .. } => ProviderKind::Gemini,
            ProviderConfig::OpenaiCompatible { .. } => ProviderKind::OpenaiCompatible,
        }
    }

    pub fn api_key(&self) -> &str {
        match self {
            ProviderConfig::AzureOpenai { api_key, .. }
            | ProviderConfig::Openai { api_key, .. }
            | ProviderConfig::Claude { api_key, .. }
            | ProviderConfig::Gemini { api_key, .. }
            | ProviderConfig::OpenaiCompatible { api_key, .. } => api_key,
        }
    }

    pub fn model(&self) -> &str {
        match self {
            ProviderConfig::AzureOpenai { model, .. }
            | ProviderConfig::Openai { model, .. }
            | ProviderConfig::Claude { model, .. }
            | ProviderConfig::Gemini { model, .. }
            | ProviderConfig::OpenaiCompatible { model, .. } => model,
        }
    }

    /// Replace the model identifier, keeping every other field.
    pub fn with_model(mut self, new_model: impl Into<String>) -> Self {
        match &mut self {
            ProviderConfig::AzureOpenai { model, .. }
            | ProviderConfig::Openai { model, .. }
            | ProviderConfig::Claude { model, .. }
            | ProviderConfig::Gemini { model, .. }
            | ProviderConfig::OpenaiCompatible { model, .. } => *model = new_model.into(),
        }
        self
    }

    /// Required fields as `(name, value)` pairs.
    fn required_fields(&self) -> Vec<(&'static str, &str)> {
        let mut fields = vec![("api_key", self.api_key()), ("model", self.model())];
        match self {
            ProviderConfig::AzureOpenai {
                resource_name,
                deployment_id,
                ..
            } => {
                fields.push(("resource_name", resource_name.as_str()));
                fields.push(("deployment_id", deployment_id.as_str()));
            }
            ProviderConfig::OpenaiCompatible { base_url, .. } => {
                fields.push(("base_url", base_url.as_str()));
            }
            _ => {}
        }
        fields
    }

    /// Names of required fields that are blank.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        self.required_fields()
            .into_iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| name)
            .collect()
    }

    /// A config is usable only if every required field is non-blank.
    pub fn is_usable(&self) -> bool {
        self.missing_fields().is_empty()
    }

    pub(crate) fn ensure_usable(&self) -> Result<(), CompletionError> {
        let missing = self.missing_fields();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(CompletionError::InvalidConfiguration(format!(
                "{} is missing {}",
                self.kind().label(),
                missing.join(", ")
            )))
        }
    }
}

/// One canonical request, translated per provider by the client.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// The image to describe
    pub image: ImageInput,
    /// Text prompt for the model
    pub prompt: String,
    /// Deliver the completion incrementally
    pub stream: bool,
    /// Maximum tokens to generate
    pub max_tokens: u32,
}

impl CompletionRequest {
    pub fn new(image: ImageInput, prompt: impl Into<String>) -> Self {
        Self {
            image,
            prompt: prompt.into(),
            stream: false,
            max_tokens: 1024,
        }
    }

    pub fn streaming(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub(crate) fn ensure_valid(&self) -> Result<(), CompletionError> {
        if self.image.is_empty() {
            return Err(CompletionError::InvalidConfiguration(
                "image is empty".to_string(),
            ));
        }
        if self.prompt.trim().is_empty() {
            return Err(CompletionError::InvalidConfiguration(
                "prompt is empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Resolve `${ENV_VAR}` references in config strings.
pub fn resolve_env_var(value: &str) -> Option<String> {
    if value.starts_with("${") && value.ends_with('}') {
        let var_name = &value[2..value.len() - 1];
        std::env::var(var_name).ok()
    } else if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
