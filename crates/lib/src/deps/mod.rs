//! Watched-file resolution.
//!
//! A dev loop re-hydrates when any of these files change: every manifest-like
//! file under the source directory, the configured function path, and every
//! input referenced by a kustomization found directly under the source
//! directory. The set is recomputed on every query so it always reflects the
//! current filesystem state.

pub mod kustomize;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use thiserror::Error;
use walkdir::WalkDir;

use crate::config::KptDeployConfig;

/// Errors from resolving the dependency set.
#[derive(Debug, Error)]
pub enum DepsError {
  /// The source root does not exist. Distinct from an empty directory, which
  /// resolves to an empty set.
  #[error("config directory not found: {}", .0.display())]
  NotFound(PathBuf),

  #[error("walking {}: {source}", path.display())]
  Walk {
    path: PathBuf,
    source: walkdir::Error,
  },

  #[error("reading kustomization {}: {source}", path.display())]
  ReadConfig {
    path: PathBuf,
    source: std::io::Error,
  },
}

/// Resolve the deduplicated, sorted set of files the deployment depends on.
///
/// The apply dir is deliberately excluded; it holds output, not input.
pub fn dependencies(config: &KptDeployConfig) -> Result<Vec<PathBuf>, DepsError> {
  let mut deps: BTreeSet<PathBuf> = BTreeSet::new();

  // Function paths are typically standalone function manifests, not template
  // sources, so they are unioned in without a kustomization lookup.
  if let Some(fn_path) = &config.fn_config.fn_path {
    if fn_path.is_dir() {
      deps.extend(resources(fn_path)?);
    } else {
      deps.insert(fn_path.clone());
    }
  }

  let source_dir = config.source_dir();
  deps.extend(resources(&source_dir)?);
  deps.extend(kustomize::dependencies_for_kustomization(&source_dir)?);

  Ok(deps.into_iter().collect())
}

/// Every file under `root` (recursively) named `*.yaml` or `*.yml`.
///
/// The extension match is exact; the stem does not matter.
pub fn resources(root: &Path) -> Result<Vec<PathBuf>, DepsError> {
  if !root.exists() {
    return Err(DepsError::NotFound(root.to_path_buf()));
  }

  let mut files = Vec::new();
  for entry in WalkDir::new(root) {
    let entry = entry.map_err(|source| DepsError::Walk {
      path: root.to_path_buf(),
      source,
    })?;
    if entry.file_type().is_file() && is_resource(entry.path()) {
      files.push(entry.into_path());
    }
  }

  Ok(files)
}

fn is_resource(path: &Path) -> bool {
  matches!(path.extension().and_then(|e| e.to_str()), Some("yaml" | "yml"))
}
