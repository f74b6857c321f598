//! Spinner shown while a turn waits on external services.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

const SPINNER_TEMPLATE: &str = "{spinner:.green} {msg} [{elapsed}]";
const SPINNER_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// Spinner on stderr; hidden when `hidden` is set (JSON mode, non-tty).
pub fn create_spinner(message: impl Into<String>, hidden: bool) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if hidden {
        spinner.set_draw_target(ProgressDrawTarget::hidden());
        return spinner;
    }
    spinner.set_draw_target(ProgressDrawTarget::stderr());
    if let Ok(style) = ProgressStyle::default_spinner().template(SPINNER_TEMPLATE) {
        spinner.set_style(style.tick_chars(SPINNER_CHARS));
    }
    spinner.set_message(message.into());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hidden_spinner() {
        let spinner = create_spinner("thinking", true);
        assert!(spinner.is_hidden());
        spinner.finish_and_clear();
    }
}
