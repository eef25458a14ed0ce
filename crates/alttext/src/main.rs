//! Alttext CLI - generate alt text for images with vision-capable LLMs.
//!
//! # Usage
//!
//! ```bash
//! # Describe an image with the configured provider
//! alttext describe photo.jpg
//!
//! # Pipe an image in, override provider and model
//! cat photo.png | alttext describe - --provider claude --model claude-3-5-sonnet-latest
//!
//! # Configure a provider interactively
//! alttext config setup
//! ```

use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// Alttext - generate alt text for images with vision-capable LLMs.
#[derive(Parser, Debug)]
#[command(name = "alttext")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate alt text for an image
    Describe(cli::describe::DescribeArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so config warnings go through eprintln.
    let config = match alttext_core::Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `alttext config path`."
            );
            alttext_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("Alttext v{}", alttext_core::VERSION);

    match cli.command {
        Commands::Describe(args) => cli::describe::execute(args, &config).await,
        Commands::Config(args) => cli::config::execute(args).await,
    }
}
