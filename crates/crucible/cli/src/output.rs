//! Output formatting utilities

use colored::*;
use serde::Serialize;

/// Print `value` as pretty JSON when `json` is set, otherwise hand it to
/// the human renderer.
pub fn emit<T: Serialize>(json: bool, value: &T, human: impl FnOnce(&T)) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        human(value);
    }
    Ok(())
}

pub fn print_success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red(), message);
}

pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow(), message);
}

pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue(), message);
}

/// `key: value` line, key dimmed.
pub fn field(key: &str, value: impl std::fmt::Display) {
    println!("  {} {}", format!("{key}:").dimmed(), value);
}

pub fn flag(met: bool) -> ColoredString {
    if met {
        "yes".green()
    } else {
        "no".red()
    }
}
