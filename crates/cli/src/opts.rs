//! Shared deployment flags and their conversion into library configuration.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use drydock_lib::{
  Artifact, ApplyConfig, BuildOutput, FnConfig, KptDeployConfig, LiveConfig, LiveOptions,
};

#[derive(Debug, Args)]
pub struct DeployOpts {
  /// Directory containing the dry configuration, relative to the current directory
  #[arg(short, long, default_value = ".")]
  pub dir: PathBuf,

  /// Path to kpt function manifests (mutually exclusive with --fn-image)
  #[arg(long)]
  pub fn_path: Option<PathBuf>,

  /// Inline kpt function image (mutually exclusive with --fn-path)
  #[arg(long)]
  pub fn_image: Option<String>,

  /// Run functions against the global scope
  #[arg(long)]
  pub global_scope: bool,

  /// Mount spec for function containers (repeatable)
  #[arg(long = "mount")]
  pub mounts: Vec<String>,

  /// Allow function containers network access
  #[arg(long)]
  pub network: bool,

  /// Docker network to run function containers in
  #[arg(long)]
  pub network_name: Option<String>,

  /// Existing directory holding the apply inventory (default: .kpt-hydrated)
  #[arg(long)]
  pub apply_dir: Option<PathBuf>,

  /// Identifier for the inventory object
  #[arg(long)]
  pub inventory_id: Option<String>,

  /// Namespace for the inventory object
  #[arg(long)]
  pub inventory_namespace: Option<String>,

  /// Polling period for resource statuses during apply (e.g. 10s)
  #[arg(long, value_parser = parse_duration)]
  pub poll_period: Option<String>,

  /// Propagation policy for pruning (background, foreground, orphan)
  #[arg(long)]
  pub prune_propagation_policy: Option<String>,

  /// How long to wait for pruned resources to be deleted (e.g. 1m)
  #[arg(long, value_parser = parse_duration)]
  pub prune_timeout: Option<String>,

  /// How long to wait for applied resources to reconcile (e.g. 2m)
  #[arg(long, value_parser = parse_duration)]
  pub reconcile_timeout: Option<String>,

  /// Label to set on every rendered resource (key=value, repeatable)
  #[arg(short = 'l', long = "label", value_parser = parse_label)]
  pub labels: Vec<(String, String)>,

  /// JSON file with build results: {"builds": [{"imageName": ..., "tag": ...}]}
  #[arg(short = 'a', long)]
  pub build_artifacts: Option<PathBuf>,
}

impl DeployOpts {
  pub fn to_config(&self) -> KptDeployConfig {
    KptDeployConfig {
      work_dir: PathBuf::from("."),
      dir: self.dir.clone(),
      fn_config: FnConfig {
        fn_path: self.fn_path.clone(),
        image: self.fn_image.clone(),
        global_scope: self.global_scope,
        mount: if self.mounts.is_empty() {
          None
        } else {
          Some(self.mounts.clone())
        },
        network: self.network,
        network_name: self.network_name.clone(),
      },
      live: LiveConfig {
        apply: ApplyConfig {
          dir: self.apply_dir.clone(),
          inventory_id: self.inventory_id.clone(),
          inventory_namespace: self.inventory_namespace.clone(),
        },
        options: LiveOptions {
          poll_period: self.poll_period.clone(),
          prune_propagation_policy: self.prune_propagation_policy.clone(),
          prune_timeout: self.prune_timeout.clone(),
          reconcile_timeout: self.reconcile_timeout.clone(),
        },
      },
    }
  }

  pub fn labels(&self) -> BTreeMap<String, String> {
    self.labels.iter().cloned().collect()
  }

  pub fn artifacts(&self) -> Result<Vec<Artifact>> {
    let Some(path) = &self.build_artifacts else {
      return Ok(Vec::new());
    };

    let bytes = std::fs::read(path)
      .with_context(|| format!("reading build artifacts {}", path.display()))?;
    let output = BuildOutput::from_json(&bytes)
      .with_context(|| format!("parsing build artifacts {}", path.display()))?;

    Ok(output.builds)
  }
}

fn parse_label(s: &str) -> Result<(String, String), String> {
  s.split_once('=')
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .ok_or_else(|| format!("expected key=value, got `{s}`"))
}

/// Durations are validated here but handed to kpt verbatim.
fn parse_duration(s: &str) -> Result<String, String> {
  s.parse::<humantime::Duration>()
    .map(|_| s.to_string())
    .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parse_label_requires_key_value() {
    assert_eq!(
      parse_label("run=123").unwrap(),
      ("run".to_string(), "123".to_string())
    );
    assert!(parse_label("run").is_err());
  }

  #[test]
  fn parse_duration_keeps_original_text() {
    assert_eq!(parse_duration("10s").unwrap(), "10s");
    assert!(parse_duration("soon").is_err());
  }
}
