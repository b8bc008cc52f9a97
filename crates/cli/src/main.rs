//! drydock: kpt-driven manifest hydration and deployment.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod cmd;
mod opts;
mod output;

use opts::DeployOpts;
use output::OutputFormat;

/// drydock - kpt-driven manifest hydration and deployment
#[derive(Parser)]
#[command(name = "drydock")]
#[command(author, version, about, long_about = None)]
struct Cli {
  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Hydrate the configuration and print or write the manifest set
  Render {
    #[command(flatten)]
    opts: DeployOpts,

    /// Write the hydrated manifests to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
  },

  /// Hydrate the configuration and apply it to the cluster
  Deploy {
    #[command(flatten)]
    opts: DeployOpts,
  },

  /// Delete everything the last deploy applied
  Destroy {
    #[command(flatten)]
    opts: DeployOpts,
  },

  /// List the files a dev loop should watch to trigger re-hydration
  Deps {
    #[command(flatten)]
    opts: DeployOpts,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
  },
}

fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .without_time()
    .init();

  let cli = Cli::parse();

  let result: Result<()> = match cli.command {
    Commands::Render { opts, output } => cmd::cmd_render(&opts, output.as_deref()),
    Commands::Deploy { opts } => cmd::cmd_deploy(&opts),
    Commands::Destroy { opts } => cmd::cmd_destroy(&opts),
    Commands::Deps { opts, format } => cmd::cmd_deps(&opts, format),
  };

  if let Err(err) = result {
    output::print_error(&format!("{err:#}"));
    std::process::exit(1);
  }
}
