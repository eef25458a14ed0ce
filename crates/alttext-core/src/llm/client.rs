//! Provider-agnostic completion client.
//!
//! [`CompletionClient::complete`] validates the request, dispatches on the
//! [`ProviderConfig`] variant to the matching wire-format module, and
//! normalizes every outcome into `Result<String, CompletionError>`.

use super::provider::{CompletionRequest, ProviderConfig};
use super::openai::Endpoint;
use super::{anthropic, gemini, openai};
use crate::config::{Config, EndpointsConfig};
use crate::error::{CompletionError, CompletionResult};
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Settings shared by every request made through one client.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Whole-request timeout for non-streaming calls; connect and idle
    /// timeout for streaming calls
    pub timeout: Duration,
    /// API base URLs
    pub endpoints: EndpointsConfig,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            endpoints: EndpointsConfig::default(),
        }
    }
}

impl From<&Config> for ClientOptions {
    fn from(config: &Config) -> Self {
        Self {
            timeout: Duration::from_millis(config.limits.timeout_ms),
            endpoints: config.endpoints.clone(),
        }
    }
}

/// Translates canonical requests into vendor HTTP calls.
#[derive(Debug, Clone)]
pub struct CompletionClient {
    http: reqwest::Client,
    options: ClientOptions,
}

impl CompletionClient {
    pub fn new(options: ClientOptions) -> CompletionResult<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(options.timeout)
            .user_agent(format!("alttext/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                CompletionError::InvalidConfiguration(format!("Failed to build HTTP client: {e}"))
            })?;

        Ok(Self { http, options })
    }

    pub fn from_config(config: &Config) -> CompletionResult<Self> {
        Self::new(ClientOptions::from(config))
    }

    pub(crate) fn endpoints(&self) -> &EndpointsConfig {
        &self.options.endpoints
    }

    /// Request timeout; also the longest a stream may stay silent.
    pub(crate) fn timeout(&self) -> Duration {
        self.options.timeout
    }

    /// Run one completion.
    ///
    /// With `request.stream` set, `on_chunk` receives every text fragment in
    /// order as it arrives; otherwise it is never called. Once `cancel` fires
    /// no further fragments are delivered and the result is
    /// [`CompletionError::Cancelled`] carrying the text received so far.
    #[tracing::instrument(
        name = "complete",
        skip_all,
        fields(provider = %config.kind(), model = config.model(), stream = request.stream)
    )]
    pub async fn complete<F>(
        &self,
        config: &ProviderConfig,
        request: &CompletionRequest,
        cancel: &CancellationToken,
        mut on_chunk: F,
    ) -> CompletionResult<String>
    where
        F: FnMut(&str) + Send,
    {
        config.ensure_usable()?;
        request.ensure_valid()?;

        let start = Instant::now();
        let result = match config {
            ProviderConfig::AzureOpenai {
                api_key,
                model,
                resource_name,
                deployment_id,
            } => {
                let endpoint = Endpoint::azure(self, api_key, resource_name, deployment_id);
                openai::complete(self, endpoint, model, request, cancel, &mut on_chunk).await
            }
            ProviderConfig::Openai {
                api_key,
                model,
                organization,
            } => {
                let endpoint = Endpoint::openai(self, api_key, organization);
                openai::complete(self, endpoint, model, request, cancel, &mut on_chunk).await
            }
            ProviderConfig::OpenaiCompatible {
                api_key,
                model,
                base_url,
            } => {
                let endpoint = Endpoint::compatible(api_key, base_url);
                openai::complete(self, endpoint, model, request, cancel, &mut on_chunk).await
            }
            ProviderConfig::Claude { api_key, model } => {
                anthropic::complete(self, api_key, model, request, cancel, &mut on_chunk).await
            }
            ProviderConfig::Gemini { api_key, model } => {
                gemini::complete(self, api_key, model, request, cancel, &mut on_chunk).await
            }
        };

        let latency_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(text) => tracing::debug!(latency_ms, chars = text.len(), "Completion finished"),
            Err(e) => tracing::debug!(latency_ms, error = %e, "Completion failed"),
        }
        result
    }

    /// Start a JSON POST.
    pub(crate) fn post(&self, url: &str, stream: bool) -> reqwest::RequestBuilder {
        let builder = self.http.post(url);
        if stream {
            builder.header("Accept", "text/event-stream")
        } else {
            builder.timeout(self.options.timeout)
        }
    }

    /// Send a request and turn non-2xx statuses into transport errors.
    pub(crate) async fn send(
        &self,
        builder: reqwest::RequestBuilder,
        cancel: &CancellationToken,
    ) -> CompletionResult<reqwest::Response> {
        let resp = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(CompletionError::Cancelled { partial: String::new() });
            }
            resp = builder.send() => resp.map_err(CompletionError::network)?,
        };

        let status = resp.status();
        if !status.is_success() {
            let body = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(CompletionError::Cancelled { partial: String::new() });
                }
                body = resp.text() => body.unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "Failed to read error response body");
                    String::new()
                }),
            };
            tracing::warn!(status = status.as_u16(), "Provider returned error status");
            return Err(CompletionError::Transport {
                status: Some(status.as_u16()),
                body,
                partial: String::new(),
            });
        }
        Ok(resp)
    }

    /// Read and decode a complete JSON body.
    ///
    /// A 2xx body that doesn't match the expected shape is reported as a
    /// transport error with the raw text, since it isn't a usable answer.
    pub(crate) async fn read_json<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
        cancel: &CancellationToken,
    ) -> CompletionResult<T> {
        let status = resp.status().as_u16();
        let text = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(CompletionError::Cancelled { partial: String::new() });
            }
            text = resp.text() => text.map_err(CompletionError::network)?,
        };

        serde_json::from_str(&text).map_err(|e| {
            tracing::warn!(error = %e, "Failed to parse provider response");
            CompletionError::Transport {
                status: Some(status),
                body: text,
                partial: String::new(),
            }
        })
    }
}

/// Non-streaming outcome: blank or missing text is never a success.
pub(crate) fn non_empty(text: Option<String>) -> CompletionResult<String> {
    match text.map(|t| t.trim().to_string()) {
        Some(t) if !t.is_empty() => Ok(t),
        _ => Err(CompletionError::EmptyResponse),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::test_support::{client_for, png_request, stalling_server};
    use crate::llm::ProviderKind;
    use wiremock::MockServer;

    fn incomplete_configs() -> Vec<ProviderConfig> {
        vec![
            ProviderConfig::AzureOpenai {
                api_key: "k".into(),
                model: "gpt-4o".into(),
                resource_name: "res".into(),
                deployment_id: String::new(),
            },
            ProviderConfig::Openai {
                api_key: String::new(),
                model: "gpt-4o".into(),
                organization: "org".into(),
            },
            ProviderConfig::Claude {
                api_key: "k".into(),
                model: "  ".into(),
            },
            ProviderConfig::Gemini {
                api_key: String::new(),
                model: "gemini-1.5-flash".into(),
            },
            ProviderConfig::OpenaiCompatible {
                api_key: "k".into(),
                model: "llava".into(),
                base_url: String::new(),
            },
        ]
    }

    #[tokio::test]
    async fn test_incomplete_config_fails_without_network_call() {
        let server = MockServer::start().await;
        let client = client_for(&server);

        let configs = incomplete_configs();
        let kinds: Vec<ProviderKind> = configs.iter().map(|c| c.kind()).collect();
        assert_eq!(kinds, ProviderKind::ALL.to_vec());

        for config in configs {
            let result = client
                .complete(&config, &png_request("Describe"), &CancellationToken::new(), |_| {})
                .await;
            assert!(
                matches!(result, Err(CompletionError::InvalidConfiguration(_))),
                "{config:?} gave {result:?}"
            );
        }

        let received = server.received_requests().await.unwrap();
        assert!(received.is_empty());
    }

    #[tokio::test]
    async fn test_blank_prompt_fails_without_network_call() {
        let server = MockServer::start().await;
        let client = client_for(&server);
        let config = ProviderConfig::Claude {
            api_key: "k".into(),
            model: "claude-3-5-sonnet-latest".into(),
        };

        let result = client
            .complete(&config, &png_request(""), &CancellationToken::new(), |_| {})
            .await;
        assert!(matches!(result, Err(CompletionError::InvalidConfiguration(_))));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_while_reading_error_body() {
        let base_url = stalling_server(
            "HTTP/1.1 500 Internal Server Error\r\ncontent-length: 1000\r\nconnection: close\r\n\r\n",
            "{\"error\": ".to_string(),
        )
        .await;
        let client = CompletionClient::new(ClientOptions {
            timeout: Duration::from_secs(30),
            ..Default::default()
        })
        .unwrap();
        let config = ProviderConfig::OpenaiCompatible {
            api_key: "k".into(),
            model: "llava".into(),
            base_url,
        };

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            trigger.cancel();
        });

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            client.complete(&config, &png_request("Describe"), &cancel, |_| {}),
        )
        .await
        .expect("cancellation should end the request");
        assert_eq!(
            result,
            Err(CompletionError::Cancelled {
                partial: String::new()
            })
        );
    }

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty(Some(" A cat. ".into())).unwrap(), "A cat.");
        assert_eq!(non_empty(Some("  ".into())), Err(CompletionError::EmptyResponse));
        assert_eq!(non_empty(None), Err(CompletionError::EmptyResponse));
    }

    #[test]
    fn test_options_from_config() {
        let mut config = Config::default();
        config.limits.timeout_ms = 1500;
        let options = ClientOptions::from(&config);
        assert_eq!(options.timeout, Duration::from_millis(1500));
        assert_eq!(options.endpoints, config.endpoints);
    }
}
