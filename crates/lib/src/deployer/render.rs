//! The hydration pipeline.
//!
//! A linear state machine with no back-edges: reset the scratch tree, copy
//! the dry manifests into it, optionally run the kustomize template stage,
//! run the kpt function stage, then apply the in-memory transformations
//! (filter, image substitution, caller hooks, label injection). Every stage
//! failure is wrapped with the stage's identity and propagated unchanged;
//! nothing is retried and no partial result is returned.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::artifact::Artifact;
use crate::config::ConfigError;
use crate::deps::{DepsError, kustomize};
use crate::exec::CmdError;
use crate::exec::args::kpt_command_args;
use crate::manifest::{ManifestError, ManifestList, filter, transform};

use super::{Deployer, TransformError};

/// Errors from the hydration pipeline, one variant per stage.
#[derive(Debug, Error)]
pub enum RenderError {
  #[error("invalid function configuration: {0}")]
  Config(#[from] ConfigError),

  #[error("resetting pipeline directory {}: {source}", path.display())]
  PipelineReset {
    path: PathBuf,
    source: std::io::Error,
  },

  #[error("reading source manifests: {0}")]
  Source(#[source] CmdError),

  #[error("sinking manifests into the pipeline directory: {0}")]
  Sink(#[source] CmdError),

  #[error("kustomize build: {0}")]
  KustomizeBuild(#[source] CmdError),

  #[error("resolving kustomization dependencies: {0}")]
  KustomizeDeps(#[source] DepsError),

  #[error("removing dry config {}: {source}", path.display())]
  RemoveDryConfig {
    path: PathBuf,
    source: std::io::Error,
  },

  #[error("running kpt functions: {0}")]
  FnRun(#[source] CmdError),

  #[error("excluding kpt fn configs: {0}")]
  ExcludeFn(#[source] ManifestError),

  #[error("replacing images: {0}")]
  ReplaceImages(#[source] ManifestError),

  #[error("applying manifest transform: {0}")]
  Transform(#[from] TransformError),

  #[error("setting labels: {0}")]
  SetLabels(#[source] ManifestError),
}

impl Deployer {
  /// Hydrate the source directory into a fully resolved manifest set.
  ///
  /// An empty function-stage result short-circuits to an empty set with no
  /// error; nothing remains to filter or relabel.
  pub async fn render_manifests(&self, builds: &[Artifact]) -> Result<ManifestList, RenderError> {
    // Configuration conflicts are reported before the scratch tree is
    // touched and before any subprocess spawns.
    let fn_flags = self.config.fn_config.fn_run_args()?;

    let pipeline_dir = self.config.pipeline_dir();
    reset_dir(&pipeline_dir).await?;

    self.read_configs(&pipeline_dir).await?;
    self.kustomize_build(&pipeline_dir).await?;

    let manifests = self.fn_run(&fn_flags).await?;
    if manifests.is_empty() {
      info!("function stage produced no documents");
      return Ok(manifests);
    }

    let manifests = filter::exclude_fn_configs(&manifests).map_err(RenderError::ExcludeFn)?;
    let mut manifests =
      transform::replace_images(&manifests, builds).map_err(RenderError::ReplaceImages)?;

    for hook in &self.transforms {
      manifests = hook(manifests, builds, &self.registries)?;
    }

    transform::set_labels(&manifests, &self.labels).map_err(RenderError::SetLabels)
  }

  /// Copy the dry manifests into the scratch tree without mutation, via
  /// `kpt fn source` piped into `kpt fn sink`.
  async fn read_configs(&self, pipeline_dir: &Path) -> Result<(), RenderError> {
    let source_args = kpt_command_args(Some(&self.config.source_dir()), &["fn", "source"], &[], &[]);
    let stream = self
      .runner
      .output("kpt", &source_args)
      .await
      .map_err(RenderError::Source)?;

    let sink_args = kpt_command_args(Some(pipeline_dir), &["fn", "sink"], &[], &[]);
    self
      .runner
      .output_with_input("kpt", &sink_args, &stream)
      .await
      .map_err(RenderError::Sink)?;

    Ok(())
  }

  /// Run `kustomize build` into the scratch tree if a kustomization exists
  /// directly under the source directory; otherwise skip silently.
  async fn kustomize_build(&self, pipeline_dir: &Path) -> Result<(), RenderError> {
    let source_dir = self.config.source_dir();
    if kustomize::find_kustomization_config(&source_dir).is_none() {
      debug!(dir = %source_dir.display(), "no kustomization found, skipping template stage");
      return Ok(());
    }

    let args = vec![
      "build".to_string(),
      source_dir.display().to_string(),
      "-o".to_string(),
      pipeline_dir.display().to_string(),
    ];
    self
      .runner
      .output("kustomize", &args)
      .await
      .map_err(RenderError::KustomizeBuild)?;

    // The build re-emits hydrated versions of its declared inputs, so the
    // dry copies staged earlier must not survive alongside them.
    let deps =
      kustomize::dependencies_for_kustomization(&source_dir).map_err(RenderError::KustomizeDeps)?;
    for dep in deps {
      let Ok(rel) = dep.strip_prefix(&source_dir) else {
        // Outside the source dir, so it was never copied into the scratch tree.
        continue;
      };
      let target = pipeline_dir.join(rel);
      remove_path(&target)
        .await
        .map_err(|source| RenderError::RemoveDryConfig {
          path: target.clone(),
          source,
        })?;
    }

    Ok(())
  }

  /// Run the kpt function stage against the scratch tree, capturing the
  /// resulting manifest stream from stdout.
  async fn fn_run(&self, flags: &[String]) -> Result<ManifestList, RenderError> {
    let args = kpt_command_args(Some(&self.config.pipeline_root()), &["fn", "run"], flags, &[]);
    let out = self
      .runner
      .output("kpt", &args)
      .await
      .map_err(RenderError::FnRun)?;

    Ok(ManifestList::parse(&String::from_utf8_lossy(&out)))
  }
}

async fn reset_dir(path: &Path) -> Result<(), RenderError> {
  if let Err(source) = tokio::fs::remove_dir_all(path).await {
    if source.kind() != ErrorKind::NotFound {
      return Err(RenderError::PipelineReset {
        path: path.to_path_buf(),
        source,
      });
    }
  }

  tokio::fs::create_dir_all(path)
    .await
    .map_err(|source| RenderError::PipelineReset {
      path: path.to_path_buf(),
      source,
    })
}

async fn remove_path(path: &Path) -> std::io::Result<()> {
  let result = if path.is_dir() {
    tokio::fs::remove_dir_all(path).await
  } else {
    tokio::fs::remove_file(path).await
  };

  match result {
    Err(source) if source.kind() == ErrorKind::NotFound => Ok(()),
    other => other,
  }
}

#[cfg(test)]
mod tests {
  use std::collections::BTreeMap;
  use std::fs;
  use std::sync::Arc;

  use tempfile::TempDir;

  use crate::config::{FnConfig, KptDeployConfig};
  use crate::util::testutil::FakeRunner;

  use super::*;

  const POD: &str = "apiVersion: v1\nkind: Pod\nmetadata:\n  name: app\nspec:\n  containers:\n  - name: app\n    image: myapp\n";

  struct Fixture {
    temp: TempDir,
    runner: Arc<FakeRunner>,
  }

  impl Fixture {
    fn new(fn_run_output: &str) -> Self {
      let temp = TempDir::new().unwrap();
      fs::create_dir_all(temp.path().join("config")).unwrap();

      let source = temp.path().join("config");
      let pipeline = temp.path().join(".pipeline/config");
      let pipeline_root = temp.path().join(".pipeline");

      let runner = FakeRunner::new()
        .on(format!("kpt fn source {}", source.display()), "")
        .on(format!("kpt fn sink {}", pipeline.display()), "")
        .on(
          format!("kpt fn run {} --dry-run", pipeline_root.display()),
          fn_run_output,
        );

      Self {
        temp,
        runner: Arc::new(runner),
      }
    }

    fn deployer(&self, labels: BTreeMap<String, String>) -> Deployer {
      let config = KptDeployConfig::new(self.temp.path(), "config");
      Deployer::new(config, labels, self.runner.clone())
    }
  }

  #[tokio::test]
  async fn empty_function_output_short_circuits() {
    let fixture = Fixture::new("");
    let deployer = fixture.deployer(BTreeMap::new());

    let manifests = deployer.render_manifests(&[]).await.unwrap();

    assert!(manifests.is_empty());
    assert_eq!(fixture.runner.calls().len(), 3, "no stage may run after the short-circuit");
  }

  #[tokio::test]
  async fn full_pipeline_rewrites_images_and_sets_labels() {
    let fixture = Fixture::new(POD);
    let mut labels = BTreeMap::new();
    labels.insert("run-id".to_string(), "1234".to_string());
    let deployer = fixture.deployer(labels);

    let builds = vec![Artifact {
      image_name: "myapp".to_string(),
      tag: "myapp:tag123".to_string(),
    }];
    let manifests = deployer.render_manifests(&builds).await.unwrap();

    assert_eq!(manifests.len(), 1);
    let doc = manifests.iter().next().unwrap();
    assert!(doc.contains("image: myapp:tag123"), "got: {doc}");
    assert!(doc.contains("run-id"), "got: {doc}");
  }

  #[tokio::test]
  async fn pipeline_directory_is_reset_each_run() {
    let fixture = Fixture::new("");
    let deployer = fixture.deployer(BTreeMap::new());

    let stale = fixture.temp.path().join(".pipeline/config/stale.yaml");
    fs::create_dir_all(stale.parent().unwrap()).unwrap();
    fs::write(&stale, "kind: Stale").unwrap();

    deployer.render_manifests(&[]).await.unwrap();

    assert!(!stale.exists(), "stale intermediate artifact must not survive a reset");
    assert!(fixture.temp.path().join(".pipeline/config").is_dir());
  }

  #[tokio::test]
  async fn conflicting_fn_config_fails_before_any_subprocess() {
    let fixture = Fixture::new("");
    let mut deployer = fixture.deployer(BTreeMap::new());
    deployer.config.fn_config = FnConfig {
      fn_path: Some("fns".into()),
      image: Some("gcr.io/example/fn".to_string()),
      ..FnConfig::default()
    };

    let err = deployer.render_manifests(&[]).await.unwrap_err();

    assert!(matches!(err, RenderError::Config(_)));
    assert!(fixture.runner.calls().is_empty());
  }

  #[tokio::test]
  async fn kustomize_stage_runs_only_when_config_present() {
    let fixture = Fixture::new("");
    let source = fixture.temp.path().join("config");
    let pipeline = fixture.temp.path().join(".pipeline/config");
    fs::write(source.join("kustomization.yaml"), "resources: [deployment.yaml]\n").unwrap();
    fs::write(source.join("deployment.yaml"), "kind: Deployment\n").unwrap();

    let runner = FakeRunner::new()
      .on(format!("kpt fn source {}", source.display()), "")
      // Emulate fn sink staging a dry copy into the scratch tree.
      .on_create(
        format!("kpt fn sink {}", pipeline.display()),
        "",
        pipeline.join("deployment.yaml"),
      )
      .on(
        format!("kustomize build {} -o {}", source.display(), pipeline.display()),
        "",
      )
      .on(
        format!("kpt fn run {} --dry-run", fixture.temp.path().join(".pipeline").display()),
        "",
      );
    let runner = Arc::new(runner);
    let config = KptDeployConfig::new(fixture.temp.path(), "config");
    let deployer = Deployer::new(config, BTreeMap::new(), runner.clone());

    deployer.render_manifests(&[]).await.unwrap();

    let calls = runner.calls();
    assert!(calls.iter().any(|c| c.starts_with("kustomize build")));
    assert!(
      !pipeline.join("deployment.yaml").exists(),
      "dry copies of templated inputs must be removed after the build"
    );
  }

  #[tokio::test]
  async fn function_annotation_filter_runs_in_pipeline() {
    let fn_doc = "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: fn\n  annotations:\n    config.kubernetes.io/function: image\n";
    let fixture = Fixture::new(fn_doc);
    let deployer = fixture.deployer(BTreeMap::new());

    let manifests = deployer.render_manifests(&[]).await.unwrap();

    assert!(
      manifests.iter().next().unwrap().contains("config.kubernetes.io/local-config"),
      "fn config must be marked local"
    );
  }

  #[tokio::test]
  async fn transform_hooks_run_in_order_and_can_abort() {
    let fixture = Fixture::new(POD);
    let mut deployer = fixture.deployer(BTreeMap::new());
    deployer.add_transform(|_, _, _| Err(TransformError::new("boom")));

    let err = deployer.render_manifests(&[]).await.unwrap_err();
    assert!(matches!(err, RenderError::Transform(_)));
  }

  #[tokio::test]
  async fn failed_stage_is_wrapped_with_its_identity() {
    let temp = TempDir::new().unwrap();
    fs::create_dir_all(temp.path().join("config")).unwrap();
    let source = temp.path().join("config");

    let runner = Arc::new(FakeRunner::new().fail_on(format!("kpt fn source {}", source.display()), "no kpt"));
    let config = KptDeployConfig::new(temp.path(), "config");
    let deployer = Deployer::new(config, BTreeMap::new(), runner);

    let err = deployer.render_manifests(&[]).await.unwrap_err();
    assert!(matches!(err, RenderError::Source(_)), "got: {err}");
  }
}
