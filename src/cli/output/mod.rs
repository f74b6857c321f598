//! Output formatting utilities for the CLI.

pub mod progress;
pub mod table;

use serde::Serialize;

/// Result of a command, renderable for humans or as JSON.
pub trait CommandOutput: Serialize {
    /// Text printed in human mode
    fn to_human(&self) -> String;
    /// Value printed with `--json`
    fn to_json(&self) -> serde_json::Value;
}

/// Print `result` in the selected mode.
pub fn output<T: CommandOutput>(result: &T, json_mode: bool) {
    if json_mode {
        println!("{}", serde_json::to_string_pretty(&result.to_json()).unwrap_or_default());
    } else {
        println!("{}", result.to_human());
    }
}

/// Truncate a string to at most `max_chars` characters, appending "..." if truncated.
pub fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a longer analysis name", 10), "a longe...");
        assert_eq!(truncate("ümlaut-heavy", 6), "üml...");
    }
}
