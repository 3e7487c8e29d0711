//! Stateless formatting of everything the CLI prints.

use std::fmt::Display;
use std::path::Path;

use owo_colors::OwoColorize;
use viva_core::{BootstrapError, RelayError};

pub const RULE_WIDTH: usize = 60;

pub fn rule() -> String {
    "=".repeat(RULE_WIDTH)
}

pub fn header(student_name: &str, started_at: &str) -> String {
    format!(
        "\n{}\nStudent: {student_name}\nTime: {started_at}\n\n\
         You'll have a conversation with Claude about your code.\n\
         Answer thoughtfully and explain your reasoning.\n\
         Type 'quit' or 'exit' to end early.\n\n{}",
        "🎓 Code Assessment Started".bold().cyan(),
        rule()
    )
}

pub fn assistant(text: &str) -> String {
    format!("{}{text}", "🤖 Claude: ".bright_blue())
}

pub fn student_prompt() -> String {
    format!("\n{}", "You: ".green())
}

pub fn error<E: Display + ?Sized>(err: &E) -> String {
    format!("{}{err}", "Error: ".red())
}

pub fn success<S: Display + ?Sized>(text: &S) -> String {
    format!("{}{text}", "✓ ".green())
}

/// Extra lines explaining how to fix a bootstrap failure.
pub fn bootstrap_help(err: &BootstrapError) -> Option<&'static str> {
    match err {
        BootstrapError::UnsupportedLanguage(_) => {
            Some("Only Python (.py) and C (.c) files are supported.")
        }
        BootstrapError::SourceTooLarge { .. } => {
            Some("Submit a single source file, not generated or bundled code.")
        }
        _ => None,
    }
}

pub fn missing_api_key_help() -> String {
    [
        "Please set it with: export ANTHROPIC_API_KEY='your-key-here'",
        "Get your API key at: https://console.anthropic.com/",
        "Or connect to your teacher's server with --server <URL>.",
    ]
    .join("\n")
}

pub fn unreachable_server_help(server_url: &str) -> String {
    format!(
        "Make sure:\n  \
         1. Your teacher's server is running\n  \
         2. You're on the same network\n  \
         3. The server URL is correct: {server_url}"
    )
}

/// Follow-up guidance printed after a relay failure ends the session.
pub fn relay_failure_help(err: &RelayError) -> Option<&'static str> {
    match err {
        RelayError::RateLimited(_) => Some(
            "You've reached your assessment limit.\n\
             Contact your teacher if you need more assessments.",
        ),
        RelayError::Timeout | RelayError::Connection(_) => {
            Some("Your conversation so far will still be saved.")
        }
        _ => None,
    }
}

pub fn submit_hint(path: &Path) -> String {
    format!(
        "\n📤 Submit this file to your teacher: {}",
        path.display().bold()
    )
}
