//! Google Gemini provider over the Generative Language REST API.

use super::client::{non_empty, CompletionClient};
use super::provider::CompletionRequest;
use super::stream::{read_data_lines, StreamAccumulator};
use crate::error::{CompletionError, CompletionResult};
use serde::{Deserialize, Serialize};
use std::ops::ControlFlow;
use tokio_util::sync::CancellationToken;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part<'a> {
    InlineData { inline_data: InlineData<'a> },
    Text { text: &'a str },
}

#[derive(Serialize)]
struct InlineData<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    error: Option<serde_json::Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GenerateResponse {
    /// Text of the first candidate, joined across its parts.
    fn first_text(&self) -> Option<String> {
        let parts = &self.candidates.first()?.content.as_ref()?.parts;
        let text: String = parts.iter().filter_map(|p| p.text.as_deref()).collect();
        Some(text)
    }

    fn finish_reason(&self) -> Option<&str> {
        self.candidates.first()?.finish_reason.as_deref()
    }
}

fn endpoint(client: &CompletionClient, model: &str, stream: bool) -> String {
    let base = client.endpoints().gemini.trim_end_matches('/');
    if stream {
        format!("{base}/models/{model}:streamGenerateContent?alt=sse")
    } else {
        format!("{base}/models/{model}:generateContent")
    }
}

pub(crate) async fn complete(
    client: &CompletionClient,
    api_key: &str,
    model: &str,
    request: &CompletionRequest,
    cancel: &CancellationToken,
    on_chunk: &mut (dyn FnMut(&str) + Send),
) -> CompletionResult<String> {
    let body = GenerateRequest {
        contents: vec![Content {
            role: "user",
            parts: vec![
                Part::InlineData {
                    inline_data: InlineData {
                        mime_type: &request.image.media_type,
                        data: &request.image.data,
                    },
                },
                Part::Text {
                    text: &request.prompt,
                },
            ],
        }],
        generation_config: GenerationConfig {
            max_output_tokens: request.max_tokens,
        },
    };

    let builder = client
        .post(&endpoint(client, model, request.stream), request.stream)
        .header("x-goog-api-key", api_key)
        .json(&body);

    tracing::debug!(model, "Sending Gemini generateContent request");
    let resp = client.send(builder, cancel).await?;

    if !request.stream {
        let generated: GenerateResponse = client.read_json(resp, cancel).await?;
        if let Some(error) = generated.error {
            return Err(provider_error(error));
        }
        return non_empty(generated.first_text());
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

fn provider_error(error: serde_json::Value) -> CompletionError {
    let status = error
        .get("code")
        .and_then(|c| c.as_u64())
        .and_then(|c| u16::try_from(c).ok());
    CompletionError::Transport {
        status,
        body: error.to_string(),
        partial: String::new(),
    }
}

/// Apply one streamed `GenerateContentResponse`. The stream has no explicit
/// terminator; it ends with the body.
fn handle_chunk(
    data: &str,
    acc: &mut StreamAccumulator<'_>,
) -> Result<ControlFlow<()>, CompletionError> {
    let chunk: GenerateResponse =
        serde_json::from_str(data).map_err(|e| CompletionError::MalformedChunk(e.to_string()))?;

    if let Some(error) = chunk.error {
        return Err(provider_error(error));
    }
    if let Some(text) = chunk.first_text() {
        acc.push(&text);
    }
    match chunk.finish_reason() {
        Some("STOP") | None => Ok(ControlFlow::Continue(())),
        Some(reason) => {
            acc.annotate_finish(reason);
            Ok(ControlFlow::Break(()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EndpointsConfig;
    use crate::llm::client::ClientOptions;
    use crate::llm::provider::ProviderConfig;
    use crate::llm::test_support::{client_for, png_request, sse_body, stalling_sse_server};
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn gemini_config() -> ProviderConfig {
        ProviderConfig::Gemini {
            api_key: "AIza-test".into(),
            model: "gemini-1.5-flash".into(),
        }
    }

    fn chunk(text: &str, finish: Option<&str>) -> String {
        let mut candidate = json!({"content": {"role": "model", "parts": [{"text": text}]}});
        if let Some(reason) = finish {
            candidate["finishReason"] = json!(reason);
        }
        json!({"candidates": [candidate]}).to_string()
    }

    #[test]
    fn test_endpoints() {
        let client = CompletionClient::new(Default::default()).unwrap();
        assert_eq!(
            endpoint(&client, "gemini-1.5-flash", false),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent"
        );
        assert_eq!(
            endpoint(&client, "gemini-1.5-flash", true),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:streamGenerateContent?alt=sse"
        );
    }

    #[tokio::test]
    async fn test_non_streaming_request_shape_and_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-1.5-flash:generateContent"))
            .and(header("x-goog-api-key", "AIza-test"))
            .and(body_partial_json(json!({
                "contents": [{
                    "role": "user",
                    "parts": [
                        {"inline_data": {"mime_type": "image/png", "data": "aGVsbG8="}},
                        {"text": "Describe"}
                    ]
                }],
                "generationConfig": {"maxOutputTokens": 1024}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{
                    "content": {"role": "model", "parts": [{"text": "A cat "}, {"text": "on a mat."}]},
                    "finishReason": "STOP"
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let text = client
            .complete(&gemini_config(), &png_request("Describe"), &CancellationToken::new(), |_| {})
            .await
            .unwrap();
        assert_eq!(text, "A cat on a mat.");
    }

    #[tokio::test]
    async fn test_non_streaming_without_candidates() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "promptFeedback": {"blockReason": "SAFETY"}
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let result = client
            .complete(&gemini_config(), &png_request("Describe"), &CancellationToken::new(), |_| {})
            .await;
        assert_eq!(result, Err(CompletionError::EmptyResponse));
    }

    #[tokio::test]
    async fn test_bad_request_is_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("API key not valid"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client
            .complete(&gemini_config(), &png_request("Describe"), &CancellationToken::new(), |_| {})
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "HTTP 400: API key not valid");
    }

    #[tokio::test]
    async fn test_streaming_accumulates_chunks() {
        let server = MockServer::start().await;
        let (a, cat, dot) = (
            chunk("A ", None),
            chunk("cat", None),
            chunk(".", Some("STOP")),
        );
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-1.5-flash:streamGenerateContent"))
            .and(query_param("alt", "sse"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(sse_body(&[&a, "{oops", &cat, &dot])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let mut chunks = Vec::new();
        let text = client
            .complete(
                &gemini_config(),
                &png_request("Describe").streaming(true),
                &CancellationToken::new(),
                |chunk| chunks.push(chunk.to_string()),
            )
            .await
            .unwrap();

        assert_eq!(text, "A cat.");
        assert_eq!(chunks, vec!["A ", "cat", "."]);
    }

    #[test]
    fn test_abnormal_finish_is_annotated() {
        let mut on_chunk = |_: &str| {};
        let mut acc = StreamAccumulator::new(&mut on_chunk);

        let flow = handle_chunk(&chunk("A cat", None), &mut acc).unwrap();
        assert_eq!(flow, ControlFlow::Continue(()));
        let flow = handle_chunk(&chunk("", Some("MAX_TOKENS")), &mut acc).unwrap();
        assert_eq!(flow, ControlFlow::Break(()));
        assert_eq!(acc.into_result().unwrap(), "A cat [finish_reason: MAX_TOKENS]");
    }

    #[test]
    fn test_error_chunk_ends_stream() {
        let mut on_chunk = |_: &str| {};
        let mut acc = StreamAccumulator::new(&mut on_chunk);
        let data = json!({"error": {"code": 429, "message": "quota", "status": "RESOURCE_EXHAUSTED"}})
            .to_string();
        let err = handle_chunk(&data, &mut acc).unwrap_err();
        assert!(matches!(err, CompletionError::Transport { status: Some(429), .. }));
    }

    #[tokio::test]
    async fn test_cancellation_mid_stream_keeps_partial_text() {
        let base = stalling_sse_server(vec![chunk("A ", None)]).await;
        let client = CompletionClient::new(ClientOptions {
            endpoints: EndpointsConfig {
                gemini: base,
                ..Default::default()
            },
            ..Default::default()
        })
        .unwrap();

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        let result = client
            .complete(
                &gemini_config(),
                &png_request("Describe").streaming(true),
                &cancel,
                |_| trigger.cancel(),
            )
            .await;

        assert_eq!(
            result,
            Err(CompletionError::Cancelled {
                partial: "A ".to_string()
            })
        );
    }
}
