//! Manifest document sets.
//!
//! A [`ManifestList`] is an ordered sequence of YAML resource documents,
//! serialized as a `---`-separated multi-document stream. Order is preserved
//! for output determinism; resources are applied as a set.
//!
//! Documents are stored as raw text and only re-serialized by the
//! transformations that actually mutate them, so untouched documents survive
//! the pipeline byte-identical.

pub mod filter;
pub mod transform;

use std::fmt;

use thiserror::Error;

/// Errors from parsing or re-serializing individual manifest documents.
#[derive(Debug, Error)]
pub enum ManifestError {
  /// A document in the set is not valid YAML.
  #[error("parsing manifest document: {0}")]
  Parse(#[source] serde_yaml::Error),

  /// A mutated document could not be re-serialized.
  #[error("serializing manifest document: {0}")]
  Serialize(#[source] serde_yaml::Error),
}

/// An ordered set of manifest documents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestList(Vec<String>);

impl ManifestList {
  pub fn new() -> Self {
    Self::default()
  }

  /// Split a multi-document YAML stream into its documents.
  ///
  /// Boundaries are lines consisting of `---` alone. Blank documents (such as
  /// the empty segment before a leading boundary) are dropped, so an empty or
  /// whitespace-only stream yields an empty set rather than an error.
  pub fn parse(stream: &str) -> Self {
    let mut docs = Vec::new();
    let mut current = String::new();

    for line in stream.lines() {
      if line.trim_end() == "---" {
        push_document(&mut docs, &mut current);
      } else {
        current.push_str(line);
        current.push('\n');
      }
    }
    push_document(&mut docs, &mut current);

    Self(docs)
  }

  /// Append one document. The text is normalized to end with a newline.
  pub fn push(&mut self, doc: String) {
    let mut doc = doc;
    if !doc.ends_with('\n') {
      doc.push('\n');
    }
    self.0.push(doc);
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn iter(&self) -> impl Iterator<Item = &str> {
    self.0.iter().map(String::as_str)
  }
}

impl fmt::Display for ManifestList {
  /// Serialize the set as a `---`-separated stream.
  ///
  /// An empty set yields the empty string; a non-empty set ends after the
  /// last document with no trailing boundary.
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (i, doc) in self.0.iter().enumerate() {
      if i > 0 {
        f.write_str("---\n")?;
      }
      f.write_str(doc)?;
    }
    Ok(())
  }
}

impl FromIterator<String> for ManifestList {
  fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
    let mut list = ManifestList::new();
    for doc in iter {
      list.push(doc);
    }
    list
  }
}

fn push_document(docs: &mut Vec<String>, current: &mut String) {
  if !current.trim().is_empty() {
    docs.push(std::mem::take(current));
  } else {
    current.clear();
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parse_empty_stream_is_empty_set() {
    assert!(ManifestList::parse("").is_empty());
    assert!(ManifestList::parse("\n---\n\n").is_empty());
  }

  #[test]
  fn serialize_empty_set_is_empty_string() {
    assert_eq!(ManifestList::new().to_string(), "");
  }

  #[test]
  fn parse_splits_on_document_boundaries() {
    let stream = "apiVersion: v1\nkind: Pod\n---\napiVersion: v1\nkind: Service\n";
    let list = ManifestList::parse(stream);
    assert_eq!(list.len(), 2);
    assert_eq!(list.iter().next().unwrap(), "apiVersion: v1\nkind: Pod\n");
  }

  #[test]
  fn leading_boundary_is_ignored() {
    let list = ManifestList::parse("---\nkind: Pod\n");
    assert_eq!(list.len(), 1);
  }

  #[test]
  fn serialize_has_no_trailing_boundary() {
    let mut list = ManifestList::new();
    list.push("kind: Pod".to_string());
    list.push("kind: Service".to_string());
    assert_eq!(list.to_string(), "kind: Pod\n---\nkind: Service\n");
  }

  #[test]
  fn serialization_round_trip_is_stable() {
    let mut list = ManifestList::new();
    list.push("apiVersion: v1\nkind: Pod\nmetadata:\n  name: a".to_string());
    list.push("apiVersion: v1\nkind: Service\nmetadata:\n  name: b".to_string());

    let serialized = list.to_string();
    let reparsed = ManifestList::parse(&serialized);
    assert_eq!(reparsed.to_string(), serialized);
    assert_eq!(reparsed, list);
  }
}
