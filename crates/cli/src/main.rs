mod cmd;
mod output;
mod prompts;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use hatskit_lib::platform::Workspace;

use crate::cmd::{BuildArgs, cmd_build, cmd_clear_cache, cmd_components, cmd_status};
use crate::output::{OutputFormat, print_error};

/// hatskit - assemble HATS bundles from released components
#[derive(Parser)]
#[command(name = "hatskit")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Workspace holding components.json, skeleton.zip and build state
  /// (default: $HATSKIT_HOME or the current directory)
  #[arg(long, global = true, value_name = "DIR")]
  base_dir: Option<PathBuf>,

  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Resolve and list the available components
  Components {
    /// Ignore cached resolutions and query the release API
    #[arg(long)]
    refresh: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value_t)]
    output: OutputFormat,
  },

  /// Build a bundle from the selected components
  Build {
    /// Component id to include (repeatable; default: components marked default)
    #[arg(short, long = "select", value_name = "ID")]
    select: Vec<String>,

    /// Include every component
    #[arg(long, conflicts_with = "select")]
    all: bool,

    /// Ignore cached resolutions and query the release API
    #[arg(long)]
    refresh: bool,

    /// Rebuild even when nothing changed since the last build
    #[arg(short, long)]
    force: bool,

    /// Answer yes to the rebuild confirmation
    #[arg(short, long)]
    yes: bool,
  },

  /// Show the last build
  Status {
    /// Output format
    #[arg(short, long, value_enum, default_value_t)]
    output: OutputFormat,
  },

  /// Delete the resolution cache
  ClearCache,
}

fn main() {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "warn" };
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  if let Err(e) = run(cli) {
    print_error(&format!("{e:#}"));
    std::process::exit(1);
  }
}

fn run(cli: Cli) -> Result<()> {
  let workspace = match cli.base_dir {
    Some(dir) => Workspace::new(dir),
    None => Workspace::from_env().context("Failed to determine the workspace directory")?,
  };

  match cli.command {
    Commands::Components { refresh, output } => cmd_components(&workspace, refresh, output),
    Commands::Build {
      select,
      all,
      refresh,
      force,
      yes,
    } => cmd_build(
      &workspace,
      BuildArgs {
        select,
        all,
        refresh,
        force,
        yes,
      },
    ),
    Commands::Status { output } => cmd_status(&workspace, cli.verbose, output),
    Commands::ClearCache => cmd_clear_cache(&workspace),
  }
}
