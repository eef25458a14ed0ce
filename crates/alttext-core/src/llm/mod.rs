//! Vision completion across multiple LLM vendors.
//!
//! Provides a single client over Azure OpenAI, OpenAI, Claude, Gemini and
//! OpenAI-compatible servers, plus a session that keeps at most one request
//! in flight and streams its progress to the caller.

pub(crate) mod anthropic;
pub(crate) mod client;
pub(crate) mod gemini;
pub(crate) mod openai;
pub(crate) mod provider;
pub(crate) mod session;
pub(crate) mod stream;

pub use client::{ClientOptions, CompletionClient};
pub use provider::{resolve_env_var, CompletionRequest, ProviderConfig, ProviderKind};
pub use session::{CompletionSession, SessionEvent};

#[cfg(test)]
pub(crate) mod test_support {
    use super::client::{ClientOptions, CompletionClient};
    use super::provider::CompletionRequest;
    use crate::config::EndpointsConfig;
    use crate::image::ImageInput;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Client whose every endpoint points at the mock server.
    pub(crate) fn client_for(server: &wiremock::MockServer) -> CompletionClient {
        let uri = server.uri();
        CompletionClient::new(ClientOptions {
            timeout: Duration::from_secs(5),
            endpoints: EndpointsConfig {
                openai: format!("{uri}/v1"),
                anthropic: format!("{uri}/v1"),
                gemini: format!("{uri}/v1beta"),
                azure: Some(uri),
            },
        })
        .unwrap()
    }

    pub(crate) fn png_request(prompt: &str) -> CompletionRequest {
        CompletionRequest::new(ImageInput::from_base64_png("aGVsbG8="), prompt)
    }

    /// Render payloads as an SSE body.
    pub(crate) fn sse_body(events: &[&str]) -> String {
        events.iter().map(|e| format!("data: {e}\n\n")).collect()
    }

    /// Serve one streaming response that sends `events` and then stalls
    /// without closing. Returns the base URL.
    pub(crate) async fn stalling_sse_server(events: Vec<String>) -> String {
        let body: String = events.iter().map(|e| format!("data: {e}\n\n")).collect();
        stalling_server(
            "HTTP/1.1 200 OK\r\ncontent-type: text/event-stream\r\nconnection: close\r\n\r\n",
            body,
        )
        .await
    }

    /// Serve one response made of `head` and the start of `body`, then stall
    /// without closing. Returns the base URL.
    pub(crate) async fn stalling_server(head: &'static str, body: String) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let mut buf = vec![0u8; 64 * 1024];
            let _ = socket.read(&mut buf).await;

            let _ = socket.write_all(head.as_bytes()).await;
            let _ = socket.write_all(body.as_bytes()).await;
            let _ = socket.flush().await;
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        format!("http://{addr}")
    }
}
