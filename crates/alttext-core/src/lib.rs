//! Alttext Core - vision completion client for generating image alt text.
//!
//! Sends an image and a prompt to one of several vision-capable LLM
//! providers and returns the generated description, either in one piece or
//! as a stream of text fragments.
//!
//! # Architecture
//!
//! ```text
//! Settings → ProviderConfig ─┐
//! Image bytes → ImageInput ──┴→ CompletionRequest → CompletionClient → text
//!                                                  └→ CompletionSession (one in flight, events)
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use alttext_core::{CompletionClient, CompletionRequest, Config, ImageInput};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> alttext_core::Result<()> {
//!     let config = Config::load()?;
//!     let client = CompletionClient::from_config(&config)?;
//!
//!     let bytes = std::fs::read("./image.jpg")?;
//!     let image = ImageInput::from_bytes(&bytes, config.limits.max_image_dimension)?;
//!     let request = CompletionRequest::new(image, &config.prompt);
//!
//!     let text = client
//!         .complete(&config.active_provider(), &request, &CancellationToken::new(), |_| {})
//!         .await?;
//!     println!("{text}");
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod image;
pub mod llm;

pub use config::Config;
pub use error::{AltTextError, CompletionError, CompletionResult, ConfigError, Result};
pub use image::ImageInput;
pub use llm::{
    ClientOptions, CompletionClient, CompletionRequest, CompletionSession, ProviderConfig,
    ProviderKind, SessionEvent,
};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_default_config_resolves_openai() {
        let config = Config::default();
        assert_eq!(config.active_provider().kind(), ProviderKind::Openai);
    }
}
