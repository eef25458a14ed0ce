//! Interactive provider setup: pick a provider, enter its fields, persist.

use alttext_core::{Config, ProviderConfig, ProviderKind};
use console::Style;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Input, Password, Select};
use std::path::Path;

use super::config::edit_config_file;
use super::handle_interrupt;
use super::theme::{alttext_theme, print_banner};

/// Provider-specific fields beyond key and model: `(name, prompt, required)`.
fn extra_fields(kind: ProviderKind) -> &'static [(&'static str, &'static str, bool)] {
    match kind {
        ProviderKind::AzureOpenai => &[
            ("resource_name", "Azure resource name", true),
            ("deployment_id", "Deployment id", true),
        ],
        ProviderKind::Openai => &[("organization", "Organization id (optional)", false)],
        ProviderKind::OpenaiCompatible => &[("base_url", "Base URL (e.g. http://localhost:1234/v1)", true)],
        ProviderKind::Claude | ProviderKind::Gemini => &[],
    }
}

/// Current value of an extra field in a resolved config.
fn extra_value<'a>(config: &'a ProviderConfig, name: &str) -> &'a str {
    match (config, name) {
        (ProviderConfig::AzureOpenai { resource_name, .. }, "resource_name") => resource_name,
        (ProviderConfig::AzureOpenai { deployment_id, .. }, "deployment_id") => deployment_id,
        (ProviderConfig::Openai { organization, .. }, "organization") => organization,
        (ProviderConfig::OpenaiCompatible { base_url, .. }, "base_url") => base_url,
        _ => "",
    }
}

/// Values collected by the setup form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ProviderForm {
    pub kind: ProviderKind,
    /// `None` keeps the key already stored in the config or environment.
    pub api_key: Option<String>,
    pub model: String,
    pub extras: Vec<(&'static str, String)>,
}

/// Run the setup form and save the result to `path`.
pub fn run(path: &Path) -> anyhow::Result<()> {
    let config = if path.exists() {
        Config::load_from(path)?
    } else {
        Config::default()
    };

    print_banner();
    let Some(form) = prompt_form(&config)? else {
        eprintln!("  Setup cancelled, nothing saved.");
        return Ok(());
    };

    save_provider(path, &form)?;

    let green = Style::new().for_stderr().green();
    eprintln!(
        "  {}",
        green.apply_to(format!(
            "{} ({}) is now the active provider. Saved to {}",
            form.kind.label(),
            form.model,
            path.display()
        ))
    );
    Ok(())
}

/// Walk through provider, key, model and extra fields.
///
/// Returns `None` if the user cancels at any step.
fn prompt_form(config: &Config) -> anyhow::Result<Option<ProviderForm>> {
    let theme = alttext_theme();
    let dim = Style::new().for_stderr().dim();
    let warn = Style::new().for_stderr().yellow();

    let labels: Vec<&str> = ProviderKind::ALL.iter().map(|k| k.label()).collect();
    let current = ProviderKind::ALL
        .iter()
        .position(|k| *k == config.provider)
        .unwrap_or(0);

    let Some(index) = Select::with_theme(&theme)
        .with_prompt("Vision provider")
        .items(&labels)
        .default(current)
        .interact_opt()?
    else {
        return Ok(None);
    };
    let kind = ProviderKind::ALL[index];
    let existing = config.provider_config(kind);

    let api_key = if existing.api_key().trim().is_empty() {
        eprintln!("  {}", warn.apply_to(format!("{} not set.", kind.env_var())));
        let Some(key) = handle_interrupt(
            Password::with_theme(&theme)
                .with_prompt(format!("{} API key", kind.label()))
                .allow_empty_password(true)
                .interact(),
        )?
        else {
            return Ok(None);
        };
        if key.trim().is_empty() {
            return Ok(None);
        }
        Some(key.trim().to_string())
    } else {
        eprintln!(
            "  {}",
            dim.apply_to(format!(
                "Using existing API key from {} / config",
                kind.env_var()
            ))
        );
        None
    };

    let Some(model) = select_model(kind, existing.model(), &theme)? else {
        return Ok(None);
    };

    let mut extras = Vec::new();
    for &(name, prompt, required) in extra_fields(kind) {
        let Some(value) = handle_interrupt(
            Input::<String>::with_theme(&theme)
                .with_prompt(prompt)
                .with_initial_text(extra_value(&existing, name))
                .allow_empty(!required)
                .validate_with(move |input: &String| -> Result<(), &str> {
                    if required && input.trim().is_empty() {
                        Err("This field is required")
                    } else {
                        Ok(())
                    }
                })
                .interact_text(),
        )?
        else {
            return Ok(None);
        };
        extras.push((name, value.trim().to_string()));
    }

    Ok(Some(ProviderForm {
        kind,
        api_key,
        model,
        extras,
    }))
}

/// Pick a suggested model or type a custom one.
fn select_model(
    kind: ProviderKind,
    current: &str,
    theme: &ColorfulTheme,
) -> anyhow::Result<Option<String>> {
    let suggested = kind.suggested_models();
    if !suggested.is_empty() {
        let mut items: Vec<&str> = suggested.to_vec();
        items.push("Custom model name...");
        let default = suggested.iter().position(|m| *m == current).unwrap_or(0);

        match Select::with_theme(theme)
            .with_prompt(format!("{} model", kind.label()))
            .items(&items)
            .default(default)
            .interact_opt()?
        {
            Some(i) if i < suggested.len() => return Ok(Some(suggested[i].to_string())),
            Some(_) => {}
            None => return Ok(None),
        }
    }

    let model = handle_interrupt(
        Input::<String>::with_theme(theme)
            .with_prompt("Model name")
            .with_initial_text(current)
            .interact_text(),
    )?;
    Ok(model
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty()))
}

/// Write the form into `[providers.<section>]` and make it the active
/// provider, preserving the rest of the file.
pub(crate) fn save_provider(path: &Path, form: &ProviderForm) -> anyhow::Result<()> {
    let section = form.kind.section();

    edit_config_file(path, |doc| {
        if !doc.contains_key("providers") {
            let mut providers = toml_edit::Table::new();
            providers.set_implicit(true);
            doc["providers"] = toml_edit::Item::Table(providers);
        }
        if !doc["providers"]
            .as_table()
            .is_some_and(|t| t.contains_key(section))
        {
            doc["providers"][section] = toml_edit::Item::Table(toml_edit::Table::new());
        }

        let table = &mut doc["providers"][section];
        if let Some(key) = &form.api_key {
            table["api_key"] = toml_edit::value(key.as_str());
        }
        table["model"] = toml_edit::value(form.model.as_str());
        for (name, value) in &form.extras {
            table[*name] = toml_edit::value(value.as_str());
        }

        doc["provider"] = toml_edit::value(form.kind.as_str());
    })
}
