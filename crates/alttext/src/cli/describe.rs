//! The `alttext describe` command: one image in, alt text out.

use alttext_core::{
    CompletionClient, CompletionError, CompletionRequest, CompletionResult, CompletionSession,
    Config, ImageInput, ProviderConfig, ProviderKind, SessionEvent,
};
use anyhow::Context;
use clap::Args;
use console::Style;
use dialoguer::Confirm;
use std::io::{IsTerminal, Write};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::sync::mpsc::UnboundedReceiver;

use super::theme::alttext_theme;

/// Arguments for the `describe` command.
#[derive(Args, Debug)]
pub struct DescribeArgs {
    /// Image file to describe, or `-` to read from stdin
    pub image: String,

    /// Prompt to use instead of the configured one
    #[arg(short, long)]
    pub prompt: Option<String>,

    /// Provider to use instead of the configured one
    #[arg(long)]
    pub provider: Option<ProviderKind>,

    /// Model to use instead of the provider's configured model
    #[arg(short, long)]
    pub model: Option<String>,

    /// Print text as it is generated
    #[arg(long, overrides_with = "no_stream")]
    pub stream: bool,

    /// Wait for the complete text before printing
    #[arg(long, overrides_with = "stream")]
    pub no_stream: bool,
}

impl DescribeArgs {
    /// Streaming flag after applying `--stream` / `--no-stream`.
    fn streaming(&self, default: bool) -> bool {
        if self.stream {
            true
        } else if self.no_stream {
            false
        } else {
            default
        }
    }

    /// Resolve the provider config for this invocation.
    fn provider_config(&self, config: &Config) -> ProviderConfig {
        let provider = config.provider_config(self.provider.unwrap_or(config.provider));
        match &self.model {
            Some(model) => provider.with_model(model.as_str()),
            None => provider,
        }
    }
}

/// Execute the describe command.
pub async fn execute(args: DescribeArgs, config: &Config) -> anyhow::Result<()> {
    let bytes = read_image(&args.image).await?;
    let image = ImageInput::from_bytes(&bytes, config.limits.max_image_dimension)
        .with_context(|| format!("Failed to prepare image {}", args.image))?;

    let provider = args.provider_config(config);
    let stream = args.streaming(config.streaming);
    let prompt = args.prompt.clone().unwrap_or_else(|| config.prompt.clone());
    let request = CompletionRequest::new(image, prompt)
        .streaming(stream)
        .max_tokens(config.limits.max_tokens);

    tracing::info!(provider = %provider.kind(), model = provider.model(), stream, "Describing image");

    let client = Arc::new(CompletionClient::from_config(config)?);
    let (session, mut events) = CompletionSession::new(client);

    loop {
        let (result, printed) =
            run_once(&session, &mut events, provider.clone(), request.clone()).await;

        match result {
            Ok(text) => {
                if !printed {
                    println!("{text}");
                }
                return Ok(());
            }
            Err(CompletionError::Cancelled { partial }) => {
                if !printed && !partial.is_empty() {
                    println!("{partial}");
                }
                anyhow::bail!("Request cancelled");
            }
            Err(e) => {
                let warn = Style::new().for_stderr().yellow();
                eprintln!("  {}", warn.apply_to(format!("{e}")));
                if !offer_retry()? {
                    return Err(e.into());
                }
                tracing::debug!("Retrying request");
            }
        }
    }
}

/// Run one request through the session, printing streamed chunks to stdout.
///
/// Ctrl-C cancels the request. Returns the terminal result and whether any
/// text was already printed.
async fn run_once(
    session: &CompletionSession,
    events: &mut UnboundedReceiver<SessionEvent>,
    provider: ProviderConfig,
    request: CompletionRequest,
) -> (CompletionResult<String>, bool) {
    let spinner = (!request.stream).then(create_spinner);
    let handle = session.start(provider, request);

    let mut stdout = std::io::stdout();
    let mut printed = false;

    let result = loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(SessionEvent::Chunk(text)) => {
                    let _ = write!(stdout, "{text}");
                    let _ = stdout.flush();
                    printed = true;
                }
                Some(SessionEvent::Finished(result)) => break result,
                None => break Err(CompletionError::Cancelled { partial: String::new() }),
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::debug!("Interrupt received, cancelling request");
                session.cancel();
            }
        }
    };

    if let Err(e) = handle.await {
        tracing::warn!(error = %e, "Completion task ended abnormally");
    }
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }
    if printed {
        println!();
    }
    (result, printed)
}

/// Read image bytes from a file path (with `~` expansion) or stdin for `-`.
async fn read_image(source: &str) -> anyhow::Result<Vec<u8>> {
    if source == "-" {
        let mut bytes = Vec::new();
        tokio::io::stdin()
            .read_to_end(&mut bytes)
            .await
            .context("Failed to read image from stdin")?;
        return Ok(bytes);
    }

    let path = shellexpand::tilde(source);
    tokio::fs::read(path.as_ref())
        .await
        .with_context(|| format!("Failed to read image {source}"))
}

/// Ask whether to retry a failed request. Only asks on an interactive terminal.
fn offer_retry() -> anyhow::Result<bool> {
    if !std::io::stdin().is_terminal() || !std::io::stderr().is_terminal() {
        return Ok(false);
    }
    let answer = Confirm::with_theme(&alttext_theme())
        .with_prompt("Retry?")
        .default(true)
        .interact_opt()?;
    Ok(answer.unwrap_or(false))
}

fn create_spinner() -> indicatif::ProgressBar {
    use indicatif::{ProgressBar, ProgressStyle};

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg} [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message("Waiting for description...");
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: DescribeArgs,
    }

    fn parse(argv: &[&str]) -> DescribeArgs {
        TestCli::parse_from(std::iter::once("describe").chain(argv.iter().copied())).args
    }

    #[test]
    fn test_stream_flags() {
        assert!(parse(&["a.png"]).streaming(true));
        assert!(!parse(&["a.png"]).streaming(false));
        assert!(parse(&["a.png", "--stream"]).streaming(false));
        assert!(!parse(&["a.png", "--no-stream"]).streaming(true));
        assert!(parse(&["a.png", "--no-stream", "--stream"]).streaming(false));
    }

    #[test]
    fn test_provider_and_model_overrides() {
        let config = Config::default();
        let args = parse(&["a.png", "--provider", "gemini", "--model", "gemini-1.5-pro"]);
        let provider = args.provider_config(&config);
        assert_eq!(provider.kind(), ProviderKind::Gemini);
        assert_eq!(provider.model(), "gemini-1.5-pro");
    }

    #[test]
    fn test_configured_provider_is_default() {
        let mut config = Config::default();
        config.provider = ProviderKind::Claude;
        let provider = parse(&["a.png"]).provider_config(&config);
        assert_eq!(provider.kind(), ProviderKind::Claude);
        assert_eq!(provider.model(), "claude-3-5-sonnet-latest");
    }

    #[test]
    fn test_unknown_provider_is_rejected() {
        let result = TestCli::try_parse_from(["describe", "a.png", "--provider", "mistral"]);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_read_image_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pixel.png");
        std::fs::write(&path, b"not really a png").unwrap();

        let bytes = read_image(path.to_str().unwrap()).await.unwrap();
        assert_eq!(bytes, b"not really a png");
        assert!(read_image("/definitely/missing.png").await.is_err());
    }
}
