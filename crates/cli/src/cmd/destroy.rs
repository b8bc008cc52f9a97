//! Implementation of the `drydock destroy` command.

use std::sync::Arc;

use anyhow::{Context, Result};

use drydock_lib::{Deployer, ProcessRunner};

use crate::opts::DeployOpts;
use crate::output;

/// Delete everything the last deploy applied.
pub fn cmd_destroy(opts: &DeployOpts) -> Result<()> {
  let deployer = Deployer::new(opts.to_config(), opts.labels(), Arc::new(ProcessRunner));

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  rt.block_on(deployer.cleanup()).context("Destroy failed")?;

  output::print_success("Destroy complete");
  Ok(())
}
