//! Build results fed into image substitution.

use serde::{Deserialize, Serialize};

/// One built image: the name manifests refer to it by, and the fully
/// qualified reference (including tag or digest) to substitute in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
  pub image_name: String,
  pub tag: String,
}

/// The JSON build-output file produced by an image build step, e.g.
/// `{"builds": [{"imageName": "myapp", "tag": "myapp:tag123"}]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildOutput {
  #[serde(default)]
  pub builds: Vec<Artifact>,
}

impl BuildOutput {
  pub fn from_json(bytes: &[u8]) -> Result<Self, serde_json::Error> {
    serde_json::from_slice(bytes)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_build_output_json() {
    let json = br#"{"builds": [{"imageName": "myapp", "tag": "myapp:tag123"}]}"#;
    let out = BuildOutput::from_json(json).unwrap();
    assert_eq!(out.builds.len(), 1);
    assert_eq!(out.builds[0].image_name, "myapp");
    assert_eq!(out.builds[0].tag, "myapp:tag123");
  }

  #[test]
  fn missing_builds_key_is_empty() {
    let out = BuildOutput::from_json(b"{}").unwrap();
    assert!(out.builds.is_empty());
  }
}
