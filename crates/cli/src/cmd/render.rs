//! Implementation of the `drydock render` command.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use drydock_lib::{Deployer, ProcessRunner};

use crate::opts::DeployOpts;

/// Hydrate the configuration and write the result to stdout or a file.
pub fn cmd_render(opts: &DeployOpts, output_path: Option<&Path>) -> Result<()> {
  let builds = opts.artifacts()?;
  let deployer = Deployer::new(opts.to_config(), opts.labels(), Arc::new(ProcessRunner));

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let manifests = rt
    .block_on(deployer.render_manifests(&builds))
    .context("Render failed")?;

  match output_path {
    Some(path) => {
      std::fs::write(path, manifests.to_string())
        .with_context(|| format!("writing manifests to {}", path.display()))?;
    }
    None => print!("{manifests}"),
  }

  Ok(())
}
