//! Function-annotation filter.
//!
//! kpt function configs are inputs to hydration, not outputs to be deployed.
//! Marking them with the local-config annotation makes `kpt live apply` skip
//! them without removing them from the rendered stream.

use serde_yaml::{Mapping, Value};

use crate::consts::{FN_ANNOTATION, FN_LOCAL_CONFIG_ANNOTATION};

use super::{ManifestError, ManifestList};

/// Mark kpt function configs as local-only.
///
/// Documents carrying the function annotation get
/// `config.kubernetes.io/local-config: "true"` added, unless that annotation
/// is already present with any value. All other documents pass through
/// byte-identical. Idempotent: the presence check short-circuits on a second
/// application.
pub fn exclude_fn_configs(manifests: &ManifestList) -> Result<ManifestList, ManifestError> {
  let mut out = ManifestList::new();

  for doc in manifests.iter() {
    let mut value: Value = serde_yaml::from_str(doc).map_err(ManifestError::Parse)?;

    let Some(annotations) = annotations_mut(&mut value) else {
      out.push(doc.to_string());
      continue;
    };

    let fn_key = Value::String(FN_ANNOTATION.to_string());
    let local_key = Value::String(FN_LOCAL_CONFIG_ANNOTATION.to_string());

    if annotations.get(&fn_key).is_none() || annotations.get(&local_key).is_some() {
      out.push(doc.to_string());
      continue;
    }

    annotations.insert(local_key, Value::String("true".to_string()));
    out.push(serde_yaml::to_string(&value).map_err(ManifestError::Serialize)?);
  }

  Ok(out)
}

fn annotations_mut(value: &mut Value) -> Option<&mut Mapping> {
  value
    .as_mapping_mut()?
    .get_mut(Value::String("metadata".to_string()))?
    .as_mapping_mut()?
    .get_mut(Value::String("annotations".to_string()))?
    .as_mapping_mut()
}

#[cfg(test)]
mod tests {
  use super::*;

  const FN_CONFIG: &str = "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: set-ns\n  annotations:\n    config.kubernetes.io/function: |\n      container:\n        image: gcr.io/example/fn\n";

  const PLAIN: &str = "apiVersion: v1\nkind: Pod\nmetadata:\n  name: app\n";

  fn list_of(docs: &[&str]) -> ManifestList {
    docs.iter().map(|d| d.to_string()).collect()
  }

  #[test]
  fn marks_fn_configs_local() {
    let out = exclude_fn_configs(&list_of(&[FN_CONFIG])).unwrap();
    assert!(
      out.iter().next().unwrap().contains("config.kubernetes.io/local-config"),
      "fn config should gain the local-config annotation"
    );
  }

  #[test]
  fn documents_without_fn_annotation_are_byte_identical() {
    let input = list_of(&[PLAIN]);
    let out = exclude_fn_configs(&input).unwrap();
    assert_eq!(out, input);
  }

  #[test]
  fn explicit_local_config_is_left_untouched() {
    let doc = "metadata:\n  annotations:\n    config.kubernetes.io/function: fn\n    config.kubernetes.io/local-config: \"false\"\n";
    let input = list_of(&[doc]);
    let out = exclude_fn_configs(&input).unwrap();
    assert_eq!(out, input);
  }

  #[test]
  fn filter_is_idempotent() {
    let input = list_of(&[FN_CONFIG, PLAIN]);
    let once = exclude_fn_configs(&input).unwrap();
    let twice = exclude_fn_configs(&once).unwrap();
    assert_eq!(once, twice);
  }
}
