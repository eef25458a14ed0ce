//! OpenAI-family providers using the Chat Completions API.
//!
//! Azure OpenAI, OpenAI and generic OpenAI-compatible servers share one wire
//! format and differ only in endpoint construction and auth headers. The
//! image travels as a data URL in the user message content array.

use super::client::{non_empty, CompletionClient};
use super::provider::CompletionRequest;
use super::stream::{read_data_lines, StreamAccumulator};
use crate::error::{CompletionError, CompletionResult};
use serde::{Deserialize, Serialize};
use std::ops::ControlFlow;
use tokio_util::sync::CancellationToken;

pub(crate) const AZURE_API_VERSION: &str = "2024-08-01-preview";

// --- Request types ---

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: Vec<ChatContent<'a>>,
}

#[derive(Serialize)]
#[serde(tag = "type")]
enum ChatContent<'a> {
    #[serde(rename = "text")]
    Text { text: &'a str },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
    detail: &'static str,
}

// --- Response types ---

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    error: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Delta,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Default)]
struct Delta {
    content: Option<String>,
}

/// URL and auth headers for one OpenAI-family request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Endpoint {
    pub url: String,
    pub headers: Vec<(&'static str, String)>,
}

impl Endpoint {
    pub(crate) fn azure(
        client: &CompletionClient,
        api_key: &str,
        resource_name: &str,
        deployment_id: &str,
    ) -> Self {
        let base = client
            .endpoints()
            .azure
            .clone()
            .unwrap_or_else(|| format!("https://{}.openai.azure.com", resource_name.trim()));
        Self {
            url: format!(
                "{}/openai/deployments/{}/chat/completions?api-version={AZURE_API_VERSION}",
                base.trim_end_matches('/'),
                deployment_id.trim()
            ),
            headers: vec![("api-key", api_key.to_string())],
        }
    }

    pub(crate) fn openai(client: &CompletionClient, api_key: &str, organization: &str) -> Self {
        let mut headers = vec![("Authorization", format!("Bearer {api_key}"))];
        if !organization.trim().is_empty() {
            headers.push(("OpenAI-Organization", organization.trim().to_string()));
        }
        Self {
            url: format!(
                "{}/chat/completions",
                client.endpoints().openai.trim_end_matches('/')
            ),
            headers,
        }
    }

    pub(crate) fn compatible(api_key: &str, base_url: &str) -> Self {
        Self {
            url: format!("{}/chat/completions", base_url.trim().trim_end_matches('/')),
            headers: vec![("Authorization", format!("Bearer {api_key}"))],
        }
    }
}

pub(crate) async fn complete(
    client: &CompletionClient,
    endpoint: Endpoint,
    model: &str,
    request: &CompletionRequest,
    cancel: &CancellationToken,
    on_chunk: &mut (dyn FnMut(&str) + Send),
) -> CompletionResult<String> {
    let body = ChatRequest {
        model,
        max_tokens: request.max_tokens,
        stream: request.stream,
        messages: vec![ChatMessage {
            role: "user",
            content: vec![
                ChatContent::Text {
                    text: &request.prompt,
                },
                ChatContent::ImageUrl {
                    image_url: ImageUrl {
                        url: request.image.data_url(),
                        detail: "high",
                    },
                },
            ],
        }],
    };

    let mut builder = client.post(&endpoint.url, request.stream).json(&body);
    for (name, value) in endpoint.headers {
        builder = builder.header(name, value);
    }

    tracing::debug!(model, "Sending chat completion request");
    let resp = client.send(builder, cancel).await?;

    if !request.stream {
        let chat_resp: ChatResponse = client.read_json(resp, cancel).await?;
        return non_empty(
            chat_resp
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.message.content),
        );
    }

    let mut acc = StreamAccumulator::new(on_chunk);
    let read = read_data_lines(resp, cancel, client.timeout(), |data| {
        handle_chunk(data, &mut acc)
    })
    .await;
    match read {
        Ok(()) => acc.into_result(),
        Err(e) => Err(e.with_partial(acc.text())),
    }
}

/// Apply one `data:` payload of a chat completion stream.
fn handle_chunk(
    data: &str,
    acc: &mut StreamAccumulator<'_>,
) -> Result<ControlFlow<()>, CompletionError> {
    if data.trim() == "[DONE]" {
        return Ok(ControlFlow::Break(()));
    }

    let chunk: ChatChunk =
        serde_json::from_str(data).map_err(|e| CompletionError::MalformedChunk(e.to_string()))?;

    if let Some(error) = chunk.error {
        return Err(CompletionError::Transport {
            status: None,
            body: error.to_string(),
            partial: String::new(),
        });
    }

    // Azure sends a leading chunk with prompt filter results and no choices.
    let Some(choice) = chunk.choices.into_iter().next() else {
        return Ok(ControlFlow::Continue(()));
    };

    if let Some(content) = choice.delta.content {
        acc.push(&content);
    }
    if let Some(reason) = choice.finish_reason {
        if reason != "stop" {
            acc.annotate_finish(&reason);
        }
    }
    Ok(ControlFlow::Continue(()))
}
