use anyhow::Result;
use std::io::{self, IsTerminal, Write};

use crate::output::print_info;

/// Ask a yes/no question on the terminal.
///
/// `assume_yes` answers yes without asking. Non-interactive sessions answer
/// no.
pub fn confirm(message: &str, assume_yes: bool) -> Result<bool> {
  if assume_yes {
    return Ok(true);
  }

  if !io::stdin().is_terminal() || !io::stderr().is_terminal() {
    print_info("Not running interactively; pass --force or --yes to proceed.");
    return Ok(false);
  }

  write!(io::stderr(), "{} [y/N] ", message)?;
  io::stderr().flush()?;

  let mut input = String::new();
  io::stdin().read_line(&mut input)?;

  Ok(matches!(input.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}
