//! Claude provider using the Anthropic Messages API.
//!
//! Sends image + prompt with a base64 image content block. Streaming uses
//! the typed SSE events of the Messages API.

use super::client::{non_empty, CompletionClient};
use super::provider::CompletionRequest;
use super::stream::{read_data_lines, StreamAccumulator};
use crate::error::{CompletionError, CompletionResult};
use serde::{Deserialize, Serialize};
use std::ops::ControlFlow;
use tokio_util::sync::CancellationToken;

pub(crate) const ANTHROPIC_VERSION: &str = "2023-06-01";

// --- Request types ---

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: Vec<ContentBlock<'a>>,
}

#[derive(Serialize)]
#[serde(tag = "type")]
enum ContentBlock<'a> {
    #[serde(rename = "image")]
    Image { source: ImageSource<'a> },
    #[serde(rename = "text")]
    Text { text: &'a str },
}

#[derive(Serialize)]
struct ImageSource<'a> {
    #[serde(rename = "type")]
    source_type: &'static str,
    media_type: &'a str,
    data: &'a str,
}

// --- Response types ---

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ResponseContent>,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

#[derive(Deserialize)]
struct StreamEvent {
    #[serde(rename = "type")]
    event_type: String,
    delta: Option<StreamDelta>,
    error: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct StreamDelta {
    /// `content_block_delta` with `{"type": "text_delta", "text": ...}`
    text: Option<String>,
    /// Nested form `{"text_delta": {"text": ...}}`, accepted for older proxies
    text_delta: Option<TextDelta>,
    /// `message_delta`
    stop_reason: Option<String>,
}

#[derive(Deserialize)]
struct TextDelta {
    text: String,
}

pub(crate) async fn complete(
    client: &CompletionClient,
    api_key: &str,
    model: &str,
    request: &CompletionRequest,
    cancel: &CancellationToken,
    on_chunk: &mut (dyn FnMut(&str) + Send),
) -> CompletionResult<String> {
    let url = format!(
        "{}/messages",
        client.endpoints().anthropic.trim_end_matches('/')
    );

    let body = MessagesRequest {
        model,
        max_tokens: request.max_tokens,
        stream: request.stream,
        messages: vec![Message {
            role: "user",
            content: vec![
                ContentBlock::Image {
                    source: ImageSource {
                        source_type: "base64",
                        media_type: &request.image.media_type,
                        data: &request.image.data,
                    },
                },
                ContentBlock::Text {
                    text: &request.prompt,
                },
            ],
        }],
    };

    let builder = client
        .post(&url, request.stream)
        .header("x-api-key", api_key)
        .header("anthropic-version", ANTHROPIC_VERSION)
        .json(&body);

    tracing::debug!("Sending Claude messages request");
    let resp = client.send(builder, cancel).await?;

    if !request.stream {
        let messages_resp: MessagesResponse = client.read_json(resp, cancel).await?;
        return non_empty(
            messages_resp
                .content
                .into_iter()
                .find(|c| c.block_type == "text")
                .and_then(|c| c.text),
        );
    }

    let mut acc = StreamAccumulator::new(on_chunk);
    let read = read_data_lines(resp, cancel, client.timeout(), |data| {
        handle_event(data, &mut acc)
    })
    .await;
    match read {
        Ok(()) => acc.into_result(),
        Err(e) => Err(e.with_partial(acc.text())),
    }
}

/// Apply one `data:` payload of a Messages API stream.
fn handle_event(
    data: &str,
    acc: &mut StreamAccumulator<'_>,
) -> Result<ControlFlow<()>, CompletionError> {
    let event: StreamEvent =
        serde_json::from_str(data).map_err(|e| CompletionError::MalformedChunk(e.to_string()))?;

    match event.event_type.as_str() {
        "content_block_delta" => {
            let text = event
                .delta
                .and_then(|d| d.text.or(d.text_delta.map(|t| t.text)));
            if let Some(text) = text {
                acc.push(&text);
            }
        }
        "message_delta" => {
            if let Some(reason) = event.delta.and_then(|d| d.stop_reason) {
                if reason != "end_turn" {
                    acc.annotate_finish(&reason);
                }
            }
        }
        "message_stop" => return Ok(ControlFlow::Break(())),
        "error" => {
            return Err(CompletionError::Transport {
                status: None,
                body: event
                    .error
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| data.to_string()),
                partial: String::new(),
            });
        }
        // message_start, content_block_start/stop, ping
        _ => {}
    }
    Ok(ControlFlow::Continue(()))
}
