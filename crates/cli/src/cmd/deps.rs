//! Implementation of the `drydock deps` command.

use std::sync::Arc;

use anyhow::{Context, Result};

use drydock_lib::{Deployer, ProcessRunner};

use crate::opts::DeployOpts;
use crate::output::{self, OutputFormat};

/// List the files a dev loop should watch to trigger re-hydration.
pub fn cmd_deps(opts: &DeployOpts, format: OutputFormat) -> Result<()> {
  let deployer = Deployer::new(opts.to_config(), opts.labels(), Arc::new(ProcessRunner));

  let deps = deployer
    .dependencies()
    .context("Resolving dependencies failed")?;

  if format.is_json() {
    let paths: Vec<String> = deps.iter().map(|p| p.display().to_string()).collect();
    output::print_json(&paths)?;
  } else {
    for dep in &deps {
      println!("{}", dep.display());
    }
  }

  Ok(())
}
