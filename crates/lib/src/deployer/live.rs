//! Deploy and cleanup via `kpt live`.
//!
//! The apply dir is where the apply engine persists its inventory of
//! previously-applied resources, which is what makes declarative pruning
//! accurate. An explicitly configured dir must already exist; otherwise a
//! hidden dir is created and initialized exactly once.

use std::path::PathBuf;

use thiserror::Error;
use tracing::{info, warn};

use crate::artifact::Artifact;
use crate::consts::{INVENTORY_TEMPLATE, RESOURCES_FILE};
use crate::exec::CmdError;
use crate::exec::args::kpt_command_args;
use crate::manifest::transform;

use super::Deployer;
use super::render::RenderError;

/// Errors from resolving or initializing the apply directory.
#[derive(Debug, Error)]
pub enum ApplyDirError {
  /// An explicitly configured apply dir is never auto-created: it is assumed
  /// to carry prior inventory state.
  #[error("apply directory does not exist: {}", .0.display())]
  Missing(PathBuf),

  #[error("creating apply directory {}: {source}", path.display())]
  Create {
    path: PathBuf,
    source: std::io::Error,
  },

  #[error("kpt live init: {0}")]
  Init(#[source] CmdError),
}

/// Errors from the deploy operation.
#[derive(Debug, Error)]
pub enum DeployError {
  #[error(transparent)]
  Render(#[from] RenderError),

  #[error("resolving apply directory: {0}")]
  ApplyDir(#[from] ApplyDirError),

  #[error("writing hydrated manifests to {}: {source}", path.display())]
  WriteManifests {
    path: PathBuf,
    source: std::io::Error,
  },

  #[error("kpt live apply: {0}")]
  Apply(#[source] CmdError),
}

/// Errors from the cleanup operation.
#[derive(Debug, Error)]
pub enum CleanupError {
  #[error("resolving apply directory: {0}")]
  ApplyDir(#[from] ApplyDirError),

  #[error("kpt live destroy: {0}")]
  Destroy(#[source] CmdError),
}

impl Deployer {
  /// Hydrate, write the result into the apply dir, and `kpt live apply` it.
  ///
  /// Returns the namespaces the deployed resources live in. Namespace
  /// collection is advisory: a malformed document degrades it to a logged
  /// warning and an empty list rather than aborting the deploy.
  pub async fn deploy(&self, builds: &[Artifact]) -> Result<Vec<String>, DeployError> {
    let manifests = self.render_manifests(builds).await?;
    if manifests.is_empty() {
      info!("nothing to deploy");
      return Ok(Vec::new());
    }

    let namespaces = match transform::collect_namespaces(&manifests) {
      Ok(namespaces) => namespaces,
      Err(error) => {
        warn!(
          %error,
          "could not collect deployed resource namespaces; port-forward and health checks may misbehave"
        );
        Vec::new()
      }
    };

    let apply_dir = self.apply_dir().await?;
    let resources = apply_dir.join(RESOURCES_FILE);
    tokio::fs::write(&resources, manifests.to_string())
      .await
      .map_err(|source| DeployError::WriteManifests {
        path: resources.clone(),
        source,
      })?;

    let args = kpt_command_args(
      Some(&apply_dir),
      &["live", "apply"],
      &self.config.live.options.live_apply_args(),
      &[],
    );
    self
      .runner
      .run("kpt", &args)
      .await
      .map_err(DeployError::Apply)?;

    info!(resources = manifests.len(), "applied");
    Ok(namespaces)
  }

  /// Delete what was deployed, via `kpt live destroy`.
  pub async fn cleanup(&self) -> Result<(), CleanupError> {
    let apply_dir = self.apply_dir().await?;

    let args = kpt_command_args(Some(&apply_dir), &["live", "destroy"], &[], &[]);
    self
      .runner
      .run("kpt", &args)
      .await
      .map_err(CleanupError::Destroy)
  }

  /// Resolve the apply directory.
  ///
  /// With no explicit dir configured, the hidden hydrated dir is created and
  /// `kpt live init` runs once; the inventory marker file's presence is the
  /// sole signal that initialization already happened.
  pub async fn apply_dir(&self) -> Result<PathBuf, ApplyDirError> {
    if let Some(dir) = &self.config.live.apply.dir {
      if !dir.exists() {
        return Err(ApplyDirError::Missing(dir.clone()));
      }
      return Ok(dir.clone());
    }

    let hydrated = self.config.hydrated_dir();
    tokio::fs::create_dir_all(&hydrated)
      .await
      .map_err(|source| ApplyDirError::Create {
        path: hydrated.clone(),
        source,
      })?;

    if !hydrated.join(INVENTORY_TEMPLATE).exists() {
      let args = kpt_command_args(
        Some(&hydrated),
        &["live", "init"],
        &self.config.live.apply.live_init_args(),
        &[],
      );
      self
        .runner
        .output("kpt", &args)
        .await
        .map_err(ApplyDirError::Init)?;
    }

    Ok(hydrated)
  }
}
