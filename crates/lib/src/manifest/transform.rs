//! Whole-set manifest transformations.
//!
//! These run near the end of the hydration pipeline: image references are
//! rewritten to the tags produced by the build, then the caller's labels are
//! merged into every document. Namespace collection is read-only metadata
//! used by the deploy operation.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde_yaml::{Mapping, Value};

use crate::artifact::Artifact;

use super::{ManifestError, ManifestList};

/// Collect the distinct `metadata.namespace` values across all documents.
///
/// Documents without a namespace field are skipped. A document that fails to
/// parse propagates an error; callers treat this as a non-fatal, reduced
/// functionality event.
pub fn collect_namespaces(manifests: &ManifestList) -> Result<Vec<String>, ManifestError> {
  let mut namespaces = BTreeSet::new();

  for doc in manifests.iter() {
    let value: Value = serde_yaml::from_str(doc).map_err(ManifestError::Parse)?;
    if let Some(ns) = value
      .get("metadata")
      .and_then(|m| m.get("namespace"))
      .and_then(Value::as_str)
    {
      if !ns.is_empty() {
        namespaces.insert(ns.to_string());
      }
    }
  }

  Ok(namespaces.into_iter().collect())
}

/// Rewrite every container image reference whose name matches a build result.
///
/// References with no matching build are left untouched; documents in which
/// nothing matched are carried over byte-identical.
pub fn replace_images(manifests: &ManifestList, builds: &[Artifact]) -> Result<ManifestList, ManifestError> {
  if builds.is_empty() {
    return Ok(manifests.clone());
  }

  let replacements: HashMap<&str, &str> = builds
    .iter()
    .map(|b| (b.image_name.as_str(), b.tag.as_str()))
    .collect();

  let mut out = ManifestList::new();
  for doc in manifests.iter() {
    let mut value: Value = serde_yaml::from_str(doc).map_err(ManifestError::Parse)?;
    let mut replaced = false;
    replace_in_value(&mut value, &replacements, &mut replaced);

    if replaced {
      out.push(serde_yaml::to_string(&value).map_err(ManifestError::Serialize)?);
    } else {
      out.push(doc.to_string());
    }
  }

  Ok(out)
}

/// Merge `labels` into every document's `metadata.labels`, creating the
/// mapping if absent. Existing keys with the same name are overwritten.
pub fn set_labels(
  manifests: &ManifestList,
  labels: &BTreeMap<String, String>,
) -> Result<ManifestList, ManifestError> {
  if labels.is_empty() {
    return Ok(manifests.clone());
  }

  let mut out = ManifestList::new();
  for doc in manifests.iter() {
    let mut value: Value = serde_yaml::from_str(doc).map_err(ManifestError::Parse)?;

    let Some(root) = value.as_mapping_mut() else {
      // Not a resource object; nothing to label.
      out.push(doc.to_string());
      continue;
    };

    let metadata = root
      .entry(Value::String("metadata".to_string()))
      .or_insert_with(|| Value::Mapping(Mapping::new()));
    let Some(metadata) = metadata.as_mapping_mut() else {
      out.push(doc.to_string());
      continue;
    };

    let label_map = metadata
      .entry(Value::String("labels".to_string()))
      .or_insert_with(|| Value::Mapping(Mapping::new()));
    let Some(label_map) = label_map.as_mapping_mut() else {
      out.push(doc.to_string());
      continue;
    };

    for (key, val) in labels {
      label_map.insert(Value::String(key.clone()), Value::String(val.clone()));
    }

    out.push(serde_yaml::to_string(&value).map_err(ManifestError::Serialize)?);
  }

  Ok(out)
}

fn replace_in_value(value: &mut Value, replacements: &HashMap<&str, &str>, replaced: &mut bool) {
  match value {
    Value::Mapping(map) => {
      for (key, val) in map.iter_mut() {
        if key.as_str() == Some("image") {
          if let Value::String(image) = val {
            if let Some(tag) = replacements.get(base_image_name(image)) {
              if image != tag {
                *image = (*tag).to_string();
                *replaced = true;
              }
              continue;
            }
          }
        }
        replace_in_value(val, replacements, replaced);
      }
    }
    Value::Sequence(seq) => {
      for val in seq {
        replace_in_value(val, replacements, replaced);
      }
    }
    _ => {}
  }
}

/// Strip the tag and digest from an image reference, leaving its name.
///
/// A `:` only counts as a tag separator when it appears after the last `/`,
/// so registry ports (`localhost:5000/app`) are not mistaken for tags.
fn base_image_name(reference: &str) -> &str {
  let name = match reference.find('@') {
    Some(at) => &reference[..at],
    None => reference,
  };

  match name.rfind(':') {
    Some(colon) if name.rfind('/').is_none_or(|slash| colon > slash) => &name[..colon],
    _ => name,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const POD: &str = "apiVersion: v1\nkind: Pod\nmetadata:\n  name: app\n  namespace: a\nspec:\n  containers:\n  - name: app\n    image: myapp\n";

  fn list_of(docs: &[&str]) -> ManifestList {
    docs.iter().map(|d| d.to_string()).collect()
  }

  #[test]
  fn collect_namespaces_dedups() {
    let list = list_of(&[
      "metadata:\n  namespace: a",
      "metadata:\n  namespace: b",
      "metadata:\n  namespace: a",
    ]);
    assert_eq!(collect_namespaces(&list).unwrap(), vec!["a", "b"]);
  }

  #[test]
  fn collect_namespaces_skips_documents_without_namespace() {
    let list = list_of(&["metadata:\n  name: x", "kind: Namespace"]);
    assert!(collect_namespaces(&list).unwrap().is_empty());
  }

  #[test]
  fn collect_namespaces_propagates_parse_errors() {
    let list = list_of(&["{bad yaml"]);
    assert!(matches!(collect_namespaces(&list), Err(ManifestError::Parse(_))));
  }

  #[test]
  fn replace_images_rewrites_matching_reference() {
    let list = list_of(&[POD]);
    let builds = vec![Artifact {
      image_name: "myapp".to_string(),
      tag: "myapp:tag123".to_string(),
    }];

    let out = replace_images(&list, &builds).unwrap();
    let doc = out.iter().next().unwrap();
    assert!(doc.contains("image: myapp:tag123"), "got: {doc}");
  }

  #[test]
  fn replace_images_leaves_unmatched_reference_untouched() {
    let list = list_of(&[POD]);
    let builds = vec![Artifact {
      image_name: "other".to_string(),
      tag: "other:v1".to_string(),
    }];

    let out = replace_images(&list, &builds).unwrap();
    assert_eq!(out.iter().next().unwrap(), list.iter().next().unwrap());
  }

  #[test]
  fn replace_images_matches_tagged_references_by_name() {
    let list = list_of(&["spec:\n  image: myapp:old"]);
    let builds = vec![Artifact {
      image_name: "myapp".to_string(),
      tag: "myapp:new".to_string(),
    }];

    let out = replace_images(&list, &builds).unwrap();
    assert!(out.iter().next().unwrap().contains("myapp:new"));
  }

  #[test]
  fn set_labels_creates_and_overwrites() {
    let list = list_of(&["metadata:\n  labels:\n    keep: old\n    run: old"]);
    let mut labels = BTreeMap::new();
    labels.insert("run".to_string(), "new".to_string());

    let out = set_labels(&list, &labels).unwrap();
    let doc = out.iter().next().unwrap();
    assert!(doc.contains("keep: old"));
    assert!(doc.contains("run: new"));
    assert!(!doc.contains("run: old"));
  }

  #[test]
  fn set_labels_creates_missing_metadata() {
    let list = list_of(&["kind: Pod"]);
    let mut labels = BTreeMap::new();
    labels.insert("run".to_string(), "id".to_string());

    let out = set_labels(&list, &labels).unwrap();
    assert!(out.iter().next().unwrap().contains("run: id"));
  }

  #[test]
  fn base_image_name_handles_tags_digests_and_ports() {
    assert_eq!(base_image_name("myapp"), "myapp");
    assert_eq!(base_image_name("myapp:v1"), "myapp");
    assert_eq!(base_image_name("myapp@sha256:abc"), "myapp");
    assert_eq!(base_image_name("localhost:5000/app"), "localhost:5000/app");
    assert_eq!(base_image_name("localhost:5000/app:v1"), "localhost:5000/app");
  }
}
