//! Terminal output for hatskit commands.
//!
//! Status lines go to stdout (success, info) or stderr (warnings, errors),
//! each led by a coloured symbol. Colour is dropped automatically when the
//! stream is not a terminal.

use std::time::Duration;

use anyhow::Context;
use clap::ValueEnum;
use owo_colors::{OwoColorize, Stream};

use hatskit_lib::record::Change;

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
  #[default]
  Text,
  Json,
}

impl OutputFormat {
  pub fn is_json(self) -> bool {
    matches!(self, OutputFormat::Json)
  }
}

pub mod symbols {
  pub const SUCCESS: &str = "✓";
  pub const ERROR: &str = "✗";
  pub const WARNING: &str = "⚠";
  pub const INFO: &str = "•";
  pub const ADDED: &str = "+";
  pub const UPDATED: &str = "~";
  pub const REMOVED: &str = "-";
}

#[derive(Clone, Copy)]
enum Level {
  Success,
  Info,
  Warning,
  Error,
}

fn status_line(level: Level, message: &str) {
  match level {
    Level::Success => println!(
      "{} {message}",
      symbols::SUCCESS.if_supports_color(Stream::Stdout, |s| s.green())
    ),
    Level::Info => println!(
      "{} {message}",
      symbols::INFO.if_supports_color(Stream::Stdout, |s| s.blue())
    ),
    Level::Warning => eprintln!(
      "{} {}",
      symbols::WARNING.if_supports_color(Stream::Stderr, |s| s.yellow()),
      message.if_supports_color(Stream::Stderr, |s| s.yellow())
    ),
    Level::Error => eprintln!(
      "{} {}",
      symbols::ERROR.if_supports_color(Stream::Stderr, |s| s.red()),
      message.if_supports_color(Stream::Stderr, |s| s.red())
    ),
  }
}

pub fn print_success(message: &str) {
  status_line(Level::Success, message);
}

pub fn print_info(message: &str) {
  status_line(Level::Info, message);
}

pub fn print_warning(message: &str) {
  status_line(Level::Warning, message);
}

pub fn print_error(message: &str) {
  status_line(Level::Error, message);
}

/// An indented `label: value` line under a status line.
pub fn print_stat(label: &str, value: &str) {
  println!("  {}: {value}", label.if_supports_color(Stream::Stdout, |s| s.dimmed()));
}

/// One changelog entry, marked and coloured by kind.
pub fn print_change(change: &Change) {
  let line = match change {
    Change::Added { .. } => format!(
      "{}",
      symbols::ADDED.if_supports_color(Stream::Stdout, |s| s.green())
    ),
    Change::Updated { .. } => format!(
      "{}",
      symbols::UPDATED.if_supports_color(Stream::Stdout, |s| s.yellow())
    ),
    Change::Removed { .. } => format!(
      "{}",
      symbols::REMOVED.if_supports_color(Stream::Stdout, |s| s.red())
    ),
  };
  println!("  {line} {change}");
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize to JSON")?;
  println!("{json}");
  Ok(())
}

/// Binary-unit size with one decimal, e.g. `1.5 MB`; plain bytes below 1 KB.
pub fn format_bytes(bytes: u64) -> String {
  const UNITS: [&str; 3] = ["KB", "MB", "GB"];

  if bytes < 1024 {
    return format!("{bytes} B");
  }
  let mut value = bytes as f64 / 1024.0;
  let mut unit = UNITS[0];
  for next in &UNITS[1..] {
    if value < 1024.0 {
      break;
    }
    value /= 1024.0;
    unit = next;
  }
  format!("{value:.1} {unit}")
}

/// Elapsed time in whole seconds (`1m 5s`), or milliseconds under a second.
pub fn format_duration(duration: Duration) -> String {
  if duration < Duration::from_secs(1) {
    return format!("{}ms", duration.subsec_millis());
  }
  humantime::format_duration(Duration::from_secs(duration.as_secs())).to_string()
}
