//! Implementation of the `drydock deploy` command.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use drydock_lib::{Deployer, ProcessRunner};

use crate::opts::DeployOpts;
use crate::output;

/// Hydrate the configuration and apply it to the cluster.
pub fn cmd_deploy(opts: &DeployOpts) -> Result<()> {
  let builds = opts.artifacts()?;
  info!(dir = %opts.dir.display(), builds = builds.len(), "deploying");
  let deployer = Deployer::new(opts.to_config(), opts.labels(), Arc::new(ProcessRunner));

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let namespaces = rt
    .block_on(deployer.deploy(&builds))
    .context("Deploy failed")?;

  if namespaces.is_empty() {
    output::print_success("Deploy complete");
  } else {
    output::print_success(&format!(
      "Deploy complete (namespaces: {})",
      namespaces.join(", ")
    ));
  }

  Ok(())
}
