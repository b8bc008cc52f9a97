//! drydock-lib: Core types and logic for drydock
//!
//! This crate implements the manifest hydration pipeline and its supporting
//! pieces:
//! - `ManifestList`: ordered multi-document manifest sets with the
//!   transformations the pipeline applies to them
//! - `Deployer`: the staged render/deploy/destroy orchestrator driving the
//!   external `kpt` and `kustomize` engines
//! - `deps`: the watched-file resolver used to trigger re-hydration
//! - `exec`: the injected subprocess capability the orchestrator runs on

pub mod artifact;
pub mod config;
pub mod consts;
pub mod deployer;
pub mod deps;
pub mod exec;
pub mod manifest;
pub mod util;

pub use artifact::{Artifact, BuildOutput};
pub use config::{ApplyConfig, ConfigError, FnConfig, KptDeployConfig, LiveConfig, LiveOptions};
pub use deployer::live::{ApplyDirError, CleanupError, DeployError};
pub use deployer::render::RenderError;
pub use deployer::{Deployer, ManifestTransform, Registries, TransformError};
pub use deps::DepsError;
pub use exec::{CmdError, CommandRunner, ProcessRunner};
pub use manifest::{ManifestError, ManifestList};
