//! Deployer configuration.
//!
//! Optional settings are `Option`s rather than empty-string sentinels, so
//! "unset" and "explicitly empty" stay distinguishable (an explicitly empty
//! mount list still emits a `--mount` flag; an unset one emits nothing).

use std::path::PathBuf;

use thiserror::Error;

use crate::consts::{HYDRATED_DIR, PIPELINE_DIR};

/// Errors detected before any subprocess runs.
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("only one of `fn-path` or `image` may be specified")]
  ExclusiveFnSource,
}

/// Configuration for a kpt-driven deployment.
#[derive(Debug, Clone, Default)]
pub struct KptDeployConfig {
  /// Project root. Scratch directories (`.pipeline`, `.kpt-hydrated`) are
  /// created under it.
  pub work_dir: PathBuf,
  /// Source directory holding the dry manifests, relative to `work_dir`.
  pub dir: PathBuf,
  pub fn_config: FnConfig,
  pub live: LiveConfig,
}

impl KptDeployConfig {
  pub fn new(work_dir: impl Into<PathBuf>, dir: impl Into<PathBuf>) -> Self {
    Self {
      work_dir: work_dir.into(),
      dir: dir.into(),
      ..Self::default()
    }
  }

  /// The source directory as passed to external tools.
  pub fn source_dir(&self) -> PathBuf {
    self.work_dir.join(&self.dir)
  }

  /// Root of the pipeline scratch tree.
  pub fn pipeline_root(&self) -> PathBuf {
    self.work_dir.join(PIPELINE_DIR)
  }

  /// Scratch subtree mirroring the source directory's relative path.
  pub fn pipeline_dir(&self) -> PathBuf {
    self.pipeline_root().join(&self.dir)
  }

  /// The hidden apply dir used when none is configured explicitly.
  pub fn hydrated_dir(&self) -> PathBuf {
    self.work_dir.join(HYDRATED_DIR)
  }
}

/// kpt function execution settings (`kpt fn run`).
#[derive(Debug, Clone, Default)]
pub struct FnConfig {
  /// Path to function manifests, mutually exclusive with `image`.
  pub fn_path: Option<PathBuf>,
  /// Inline function image reference, mutually exclusive with `fn_path`.
  pub image: Option<String>,
  pub global_scope: bool,
  /// Mount specs passed through verbatim, comma-joined.
  pub mount: Option<Vec<String>>,
  pub network: bool,
  pub network_name: Option<String>,
}

impl FnConfig {
  /// Assemble the `kpt fn run` flag list.
  ///
  /// `--dry-run` is always set so the pipeline's output lands on stdout
  /// instead of a sink directory. Specifying both a function path and an
  /// inline image is a configuration error, reported before anything runs.
  pub fn fn_run_args(&self) -> Result<Vec<String>, ConfigError> {
    if self.fn_path.is_some() && self.image.is_some() {
      return Err(ConfigError::ExclusiveFnSource);
    }

    let mut flags = vec!["--dry-run".to_string()];

    if self.global_scope {
      flags.push("--global-scope".to_string());
    }

    if let Some(mount) = &self.mount {
      flags.push("--mount".to_string());
      flags.push(mount.join(","));
    }

    if self.network {
      flags.push("--network".to_string());
    }

    if let Some(name) = &self.network_name {
      flags.push("--network-name".to_string());
      flags.push(name.clone());
    }

    if let Some(path) = &self.fn_path {
      flags.push("--fn-path".to_string());
      flags.push(path.display().to_string());
    }

    if let Some(image) = &self.image {
      flags.push("--image".to_string());
      flags.push(image.clone());
    }

    Ok(flags)
  }
}

/// `kpt live` settings.
#[derive(Debug, Clone, Default)]
pub struct LiveConfig {
  pub apply: ApplyConfig,
  pub options: LiveOptions,
}

/// Inventory/apply-directory settings (`kpt live init`).
#[derive(Debug, Clone, Default)]
pub struct ApplyConfig {
  /// Explicit apply dir. Must already exist; never auto-created, since an
  /// explicit dir is assumed to carry prior inventory state.
  pub dir: Option<PathBuf>,
  pub inventory_id: Option<String>,
  pub inventory_namespace: Option<String>,
}

impl ApplyConfig {
  /// Assemble the `kpt live init` flag list.
  pub fn live_init_args(&self) -> Vec<String> {
    let mut flags = Vec::new();

    if let Some(id) = &self.inventory_id {
      flags.push("--inventory-id".to_string());
      flags.push(id.clone());
    }

    if let Some(ns) = &self.inventory_namespace {
      flags.push("--namespace".to_string());
      flags.push(ns.clone());
    }

    flags
  }
}

/// Flags for `kpt live apply`, passed through verbatim.
#[derive(Debug, Clone, Default)]
pub struct LiveOptions {
  pub poll_period: Option<String>,
  pub prune_propagation_policy: Option<String>,
  pub prune_timeout: Option<String>,
  pub reconcile_timeout: Option<String>,
}

impl LiveOptions {
  /// Assemble the `kpt live apply` flag list.
  pub fn live_apply_args(&self) -> Vec<String> {
    let mut flags = Vec::new();

    let pairs: [(&str, &Option<String>); 4] = [
      ("--poll-period", &self.poll_period),
      ("--prune-propagation-policy", &self.prune_propagation_policy),
      ("--prune-timeout", &self.prune_timeout),
      ("--reconcile-timeout", &self.reconcile_timeout),
    ];

    for (flag, value) in pairs {
      if let Some(value) = value {
        flags.push(flag.to_string());
        flags.push(value.clone());
      }
    }

    flags
  }
}

/// Registry configuration handed to manifest transform hooks.
#[derive(Debug, Clone, Default)]
pub struct Registries {
  pub insecure: Vec<String>,
  pub debug_helpers: Option<String>,
}
