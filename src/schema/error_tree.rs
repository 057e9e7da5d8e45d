//! Field-path → messages tree produced by failed validation.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// Validation errors arranged by field path.
///
/// Serializes as
/// `{"errors": [...], "properties": {"field": {...}}, "items": {"0": {...}}}`,
/// omitting empty `properties` and `items`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ErrorTree {
    /// Messages attached to this node.
    pub errors: Vec<String>,
    /// Errors of named object properties.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, ErrorTree>,
    /// Errors of array items, by index.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub items: BTreeMap<usize, ErrorTree>,
}

impl ErrorTree {
    /// Creates an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a tree with a single root message.
    #[must_use]
    pub fn message(text: impl Into<String>) -> Self {
        let mut tree = Self::new();
        tree.push(text);
        tree
    }

    /// Appends a message to this node.
    pub fn push(&mut self, text: impl Into<String>) {
        self.errors.push(text.into());
    }

    /// Sub-tree of property `name`, created on demand.
    pub fn property(&mut self, name: &str) -> &mut ErrorTree {
        self.properties.entry(name.to_string()).or_default()
    }

    /// Sub-tree of array item `index`, created on demand.
    pub fn item(&mut self, index: usize) -> &mut ErrorTree {
        self.items.entry(index).or_default()
    }

    /// Returns `true` when no node carries a message.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
            && self.properties.values().all(ErrorTree::is_empty)
            && self.items.values().all(ErrorTree::is_empty)
    }

    /// Deep union with `other`: messages are concatenated per path,
    /// duplicates dropped.
    pub fn merge(&mut self, other: ErrorTree) {
        for message in other.errors {
            if !self.errors.contains(&message) {
                self.errors.push(message);
            }
        }
        for (name, sub) in other.properties {
            self.properties.entry(name).or_default().merge(sub);
        }
        for (index, sub) in other.items {
            self.items.entry(index).or_default().merge(sub);
        }
    }

    /// Flattens the tree into `(dotted.path, messages)` pairs; the root
    /// path is the empty string.
    #[must_use]
    pub fn flatten(&self) -> Vec<(String, Vec<String>)> {
        let mut out = Vec::new();
        self.flatten_into(String::new(), &mut out);
        out
    }

    /// Messages at `path` (`"metadata.color"`, `"items.0.name"`).
    #[must_use]
    pub fn messages_at(&self, path: &str) -> Vec<String> {
        self.flatten()
            .into_iter()
            .find(|(p, _)| p == path)
            .map(|(_, messages)| messages)
            .unwrap_or_default()
    }

    fn flatten_into(&self, path: String, out: &mut Vec<(String, Vec<String>)>) {
        if !self.errors.is_empty() {
            out.push((path.clone(), self.errors.clone()));
        }
        for (name, sub) in &self.properties {
            sub.flatten_into(join(&path, name), out);
        }
        for (index, sub) in &self.items {
            sub.flatten_into(join(&path, &index.to_string()), out);
        }
    }
}

fn join(path: &str, segment: &str) -> String {
    if path.is_empty() {
        segment.to_string()
    } else {
        format!("{path}.{segment}")
    }
}

impl fmt::Display for ErrorTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (path, messages) in self.flatten() {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                first = false;
                if path.is_empty() {
                    write!(f, "{message}")?;
                } else {
                    write!(f, "{path}: {message}")?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_tree_has_no_paths() {
        let mut tree = ErrorTree::new();
        let _ = tree.property("name");
        assert!(tree.is_empty());
        assert!(tree.flatten().is_empty());
    }

    #[test]
    fn flatten_produces_dotted_paths() {
        let mut tree = ErrorTree::new();
        tree.property("metadata").property("color").push("Expected string, received number");
        tree.property("stops").item(1).property("name").push("Required");
        let paths: Vec<String> = tree.flatten().into_iter().map(|(p, _)| p).collect();
        assert_eq!(paths, ["metadata.color", "stops.1.name"]);
        assert_eq!(tree.messages_at("stops.1.name"), ["Required"]);
    }

    #[test]
    fn merge_unions_messages_per_path() {
        let mut left = ErrorTree::new();
        left.property("name").push("Required");
        left.property("age").push("Expected number, received string");

        let mut right = ErrorTree::new();
        right.property("name").push("Required");
        right.property("breed").push("Required");

        left.merge(right);
        assert_eq!(left.messages_at("name"), ["Required"]);
        assert_eq!(left.messages_at("age").len(), 1);
        assert_eq!(left.messages_at("breed"), ["Required"]);
    }

    #[test]
    fn merge_concatenates_distinct_messages() {
        let mut left = ErrorTree::message("Expected object, received string");
        left.merge(ErrorTree::message("Invalid input"));
        assert_eq!(left.errors.len(), 2);
    }

    #[test]
    fn serializes_without_empty_branches() {
        let mut tree = ErrorTree::new();
        tree.property("id").push("Required");
        let json = serde_json::to_value(&tree).ok();
        assert_eq!(
            json,
            Some(serde_json::json!({
                "errors": [],
                "properties": {"id": {"errors": ["Required"]}}
            }))
        );
    }

    #[test]
    fn display_joins_paths() {
        let mut tree = ErrorTree::message("bad");
        tree.property("id").push("Required");
        assert_eq!(tree.to_string(), "bad; id: Required");
    }
}
