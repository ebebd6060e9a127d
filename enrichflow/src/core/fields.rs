//! Insertion-ordered string map used for result columns and context data.

use serde::{Deserialize, Serialize};

/// An ordered mapping of label to value.
///
/// Keeps the order in which entries were first inserted. Re-inserting an
/// existing label replaces the value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fields {
    entries: Vec<(String, String)>,
}

impl Fields {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a value. Returns the previous value, if any.
    pub fn insert(&mut self, label: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let label = label.into();
        let value = value.into();
        if let Some((_, existing)) = self.entries.iter_mut().find(|(l, _)| *l == label) {
            return Some(std::mem::replace(existing, value));
        }
        self.entries.push((label, value));
        None
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, label: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(label, value);
        self
    }

    /// Returns the value stored under `label`.
    #[must_use]
    pub fn get(&self, label: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, v)| v.as_str())
    }

    /// Iterates entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(l, v)| (l.as_str(), v.as_str()))
    }

    /// Returns the labels in insertion order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(l, _)| l.as_str())
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for Fields
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut fields = Self::new();
        for (k, v) in iter {
            fields.insert(k, v);
        }
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_insertion_order_is_kept() {
        let fields = Fields::new()
            .with("Part Number", "X-100")
            .with("Manufacturer", "Acme")
            .with("Cavities", "12");

        let labels: Vec<_> = fields.labels().collect();
        assert_eq!(labels, vec!["Part Number", "Manufacturer", "Cavities"]);
    }

    #[test]
    fn test_reinsert_replaces_in_place() {
        let mut fields: Fields = [("a", "1"), ("b", "2")].into_iter().collect();
        assert_eq!(fields.insert("a", "3"), Some("1".to_string()));

        let entries: Vec<_> = fields.iter().collect();
        assert_eq!(entries, vec![("a", "3"), ("b", "2")]);
        assert_eq!(fields.len(), 2);
    }

    #[test]
    fn test_get_missing() {
        let fields = Fields::new();
        assert!(fields.is_empty());
        assert_eq!(fields.get("nope"), None);
    }

    #[test]
    fn test_serializes_as_pairs() {
        let fields = Fields::new().with("k", "v");
        let json = serde_json::to_value(&fields).unwrap();
        assert_eq!(json, serde_json::json!([["k", "v"]]));
    }
}
