use anyhow::{Context, Result};
use chrono::Local;
use serde::Serialize;
use std::io::{self, BufRead, Write};

use weighlog_core::models::DATE_FORMAT;

/// Resolve `today`/`yesterday`/`tomorrow` and the missing-date default.
/// Anything else is passed through for the core to validate.
pub(crate) fn resolve_date(date_str: Option<String>) -> String {
    let today = Local::now().date_naive();
    let date = match date_str.as_deref().map(str::trim) {
        None | Some("today") => today,
        Some("yesterday") => today - chrono::Duration::days(1),
        Some("tomorrow") => today + chrono::Duration::days(1),
        Some(other) => return other.to_string(),
    };
    date.format(DATE_FORMAT).to_string()
}

/// Read one line from stdin after printing `label` to stderr.
pub(crate) fn prompt_line(label: &str) -> Result<String> {
    eprint!("{label}");
    io::stderr().flush()?;
    let stdin = io::stdin();
    let line = stdin.lock().lines().next().context("No input")??;
    Ok(line.trim().to_string())
}

pub(crate) fn confirm(question: &str) -> Result<bool> {
    let answer = prompt_line(&format!("{question} [y/N] "))?;
    Ok(is_yes(&answer))
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

pub(crate) fn json_error(message: &str) -> String {
    #[derive(Serialize)]
    struct CliError<'a> {
        error: &'a str,
    }
    serde_json::to_string(&CliError { error: message })
        .unwrap_or_else(|_| format!("{{\"error\":\"{message}\"}}"))
}
