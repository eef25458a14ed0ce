//! Dialoguer theme and banner for interactive prompts.

use console::{style, Style};
use dialoguer::theme::ColorfulTheme;

/// `ColorfulTheme` with alttext's colors: cyan prompts and selection,
/// green confirmations, red errors. Everything renders on stderr.
pub fn alttext_theme() -> ColorfulTheme {
    ColorfulTheme {
        prompt_prefix: style("?".to_string()).for_stderr().cyan(),
        prompt_style: Style::new().for_stderr().bold(),
        prompt_suffix: style("›".to_string()).for_stderr().bright().black(),
        active_item_prefix: style("▸".to_string()).for_stderr().cyan(),
        active_item_style: Style::new().for_stderr().cyan(),
        success_prefix: style("✓".to_string()).for_stderr().green(),
        success_suffix: style("·".to_string()).for_stderr().bright().black(),
        error_prefix: style("✗".to_string()).for_stderr().red(),
        error_style: Style::new().for_stderr().red(),
        values_style: Style::new().for_stderr().green(),
        ..ColorfulTheme::default()
    }
}

/// One-line header shown before the setup form.
pub fn print_banner() {
    let cyan = Style::new().for_stderr().cyan().bold();
    let dim = Style::new().for_stderr().dim();

    eprintln!();
    eprintln!(
        "  {} {}",
        cyan.apply_to(format!("alttext v{}", alttext_core::VERSION)),
        dim.apply_to("provider setup")
    );
    eprintln!();
}
