//! The `alttext config` command for configuration management.

use alttext_core::Config;
use anyhow::Context;
use clap::{Args, Subcommand, ValueEnum};
use std::path::Path;
use toml_edit::DocumentMut;

/// Arguments for the `config` command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Subcommands for configuration management.
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Display current configuration
    Show,

    /// Show config file path
    Path,

    /// Initialize a new config file with defaults
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },

    /// Choose a provider and enter its credentials interactively
    Setup,

    /// Set the preset prompt sent with every image
    Prompt {
        /// Prompt text
        text: String,
    },

    /// Turn streaming output on or off
    Streaming {
        #[arg(value_enum)]
        mode: Toggle,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Toggle {
    On,
    Off,
}

/// Execute the config command.
pub async fn execute(args: ConfigArgs) -> anyhow::Result<()> {
    let path = Config::default_path();

    match args.command {
        ConfigCommand::Show => {
            let config = Config::load()?;
            let toml = config.to_toml()?;
            println!("{}", toml);
        }

        ConfigCommand::Path => {
            println!("{}", path.display());
        }

        ConfigCommand::Init { force } => {
            init_config_file(&path, force)?;
            tracing::info!("Config file created at: {}", path.display());
            println!("Configuration initialized at: {}", path.display());
        }

        ConfigCommand::Setup => {
            super::setup::run(&path)?;
        }

        ConfigCommand::Prompt { text } => {
            set_prompt(&path, &text)?;
            println!("Prompt saved to {}", path.display());
        }

        ConfigCommand::Streaming { mode } => {
            set_streaming(&path, mode == Toggle::On)?;
            println!(
                "Streaming {} in {}",
                if mode == Toggle::On { "enabled" } else { "disabled" },
                path.display()
            );
        }
    }

    Ok(())
}

fn init_config_file(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "Config file already exists at: {}\nUse --force to overwrite.",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, Config::default().to_toml()?)?;
    Ok(())
}

fn set_prompt(path: &Path, text: &str) -> anyhow::Result<()> {
    let text = text.trim();
    if text.is_empty() {
        anyhow::bail!("Prompt cannot be empty");
    }
    edit_config_file(path, |doc| {
        doc["prompt"] = toml_edit::value(text);
    })
}

fn set_streaming(path: &Path, enabled: bool) -> anyhow::Result<()> {
    edit_config_file(path, |doc| {
        doc["streaming"] = toml_edit::value(enabled);
    })
}

/// Edit the config file in place, keeping comments and formatting.
///
/// A missing file starts out empty. The edited document must still load as
/// a valid [`Config`] before it is written.
pub(crate) fn edit_config_file(
    path: &Path,
    edit: impl FnOnce(&mut DocumentMut),
) -> anyhow::Result<()> {
    let content = if path.exists() {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?
    } else {
        String::new()
    };

    let mut doc: DocumentMut = content
        .parse()
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    edit(&mut doc);

    let updated = doc.to_string();
    Config::from_toml(&updated)?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, updated)?;
    tracing::debug!(path = %path.display(), "Config file updated");
    Ok(())
}
