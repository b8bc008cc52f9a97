//! Kustomization detection and input extraction.
//!
//! The pipeline assumes the kustomization to build lives directly under the
//! source directory. Its referenced inputs become watched dependencies, and
//! the hydrated copies of those inputs are what the template stage replaces.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::warn;

use crate::consts::KUSTOMIZATION_FILES;

use super::DepsError;

/// The subset of kustomization fields that reference filesystem inputs.
#[derive(Debug, Default, Deserialize)]
struct Kustomization {
  #[serde(default)]
  bases: Vec<String>,
  #[serde(default)]
  resources: Vec<String>,
  #[serde(default)]
  components: Vec<String>,
  #[serde(default)]
  crds: Vec<String>,
  #[serde(default)]
  configurations: Vec<String>,
  #[serde(default)]
  generators: Vec<String>,
  #[serde(default)]
  transformers: Vec<String>,
  #[serde(default)]
  patches: Vec<Patch>,
  #[serde(default, rename = "patchesStrategicMerge")]
  patches_strategic_merge: Vec<String>,
  #[serde(default, rename = "patchesJson6902")]
  patches_json_6902: Vec<Patch>,
  #[serde(default, rename = "configMapGenerator")]
  config_map_generator: Vec<Generator>,
  #[serde(default, rename = "secretGenerator")]
  secret_generator: Vec<Generator>,
}

/// A patch entry: either a bare path or an object with an optional `path`
/// (inline patches have none).
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Patch {
  Path(String),
  Detailed {
    #[serde(default)]
    path: Option<String>,
  },
}

#[derive(Debug, Default, Deserialize)]
struct Generator {
  #[serde(default)]
  files: Vec<String>,
  #[serde(default)]
  envs: Vec<String>,
  #[serde(default)]
  env: Option<String>,
}

impl Kustomization {
  /// Every filesystem path this kustomization references, relative to its
  /// own directory.
  fn input_paths(&self) -> Vec<&str> {
    let mut paths: Vec<&str> = Vec::new();

    for list in [
      &self.bases,
      &self.resources,
      &self.components,
      &self.crds,
      &self.configurations,
      &self.generators,
      &self.transformers,
      &self.patches_strategic_merge,
    ] {
      paths.extend(list.iter().map(String::as_str));
    }

    for patch in self.patches.iter().chain(self.patches_json_6902.iter()) {
      match patch {
        Patch::Path(path) => paths.push(path),
        Patch::Detailed { path: Some(path) } => paths.push(path),
        Patch::Detailed { path: None } => {}
      }
    }

    for generator in self.config_map_generator.iter().chain(self.secret_generator.iter()) {
      paths.extend(generator.files.iter().map(|f| generator_file_path(f)));
      paths.extend(generator.envs.iter().map(String::as_str));
      if let Some(env) = &generator.env {
        paths.push(env);
      }
    }

    paths
  }
}

/// Generator file entries may be `key=path`; only the path part is a file.
fn generator_file_path(entry: &str) -> &str {
  match entry.split_once('=') {
    Some((_, path)) => path,
    None => entry,
  }
}

/// Find a kustomization config directly under `dir`, if any.
pub fn find_kustomization_config(dir: &Path) -> Option<PathBuf> {
  KUSTOMIZATION_FILES
    .iter()
    .map(|name| dir.join(name))
    .find(|path| path.is_file())
}

/// The kustomization file under `dir` plus every input it references,
/// recursing into referenced directories (bases).
///
/// A malformed kustomization is still reported as a dependency: its content
/// cannot resolve further indirections, but the file itself stays watched.
pub fn dependencies_for_kustomization(dir: &Path) -> Result<BTreeSet<PathBuf>, DepsError> {
  let mut deps = BTreeSet::new();

  let Some(path) = find_kustomization_config(dir) else {
    return Ok(deps);
  };
  deps.insert(path.clone());

  let content = std::fs::read_to_string(&path).map_err(|source| DepsError::ReadConfig {
    path: path.clone(),
    source,
  })?;

  let kustomization: Kustomization = match serde_yaml::from_str(&content) {
    Ok(k) => k,
    Err(error) => {
      warn!(path = %path.display(), %error, "malformed kustomization, watching the file only");
      return Ok(deps);
    }
  };

  for input in kustomization.input_paths() {
    let full = dir.join(input);
    if full.is_dir() {
      deps.extend(dependencies_for_kustomization(&full)?);
    } else {
      deps.insert(full);
    }
  }

  Ok(deps)
}
