//! The kpt deployer.
//!
//! [`Deployer`] ties the pipeline together: `render` hydrates the source
//! directory into a concrete manifest set, `deploy`/`cleanup` drive the
//! external apply engine against the resolved apply directory, and
//! `dependencies` reports which files a dev loop should watch.

pub mod live;
pub mod render;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::artifact::Artifact;
use crate::config::KptDeployConfig;
use crate::deps::{self, DepsError};
use crate::exec::CommandRunner;
use crate::manifest::ManifestList;

pub use crate::config::Registries;

/// Error returned by a caller-supplied manifest transform. Aborts the
/// pipeline.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct TransformError {
  pub message: String,
}

impl TransformError {
  pub fn new(message: impl Into<String>) -> Self {
    Self {
      message: message.into(),
    }
  }
}

/// A pluggable transformation applied between image substitution and label
/// injection. Receives the current set, the build results, and registry
/// configuration; returns a new set or an error that aborts the pipeline.
pub type ManifestTransform =
  fn(ManifestList, &[Artifact], &Registries) -> Result<ManifestList, TransformError>;

/// Orchestrates hydration and deployment over an injected command runner.
pub struct Deployer {
  config: KptDeployConfig,
  labels: BTreeMap<String, String>,
  registries: Registries,
  transforms: Vec<ManifestTransform>,
  runner: Arc<dyn CommandRunner>,
}

impl Deployer {
  pub fn new(
    config: KptDeployConfig,
    labels: BTreeMap<String, String>,
    runner: Arc<dyn CommandRunner>,
  ) -> Self {
    Self {
      config,
      labels,
      registries: Registries::default(),
      transforms: Vec::new(),
      runner,
    }
  }

  pub fn with_registries(mut self, registries: Registries) -> Self {
    self.registries = registries;
    self
  }

  /// Register an additional transform. Transforms run in registration order.
  pub fn add_transform(&mut self, transform: ManifestTransform) {
    self.transforms.push(transform);
  }

  pub fn config(&self) -> &KptDeployConfig {
    &self.config
  }

  /// Files a redeploy should be triggered by. Recomputed on every call;
  /// never includes the apply dir (output, not input).
  pub fn dependencies(&self) -> Result<Vec<PathBuf>, DepsError> {
    deps::dependencies(&self.config)
  }
}
