use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// Deduplicated set of photo labels.
///
/// Equality between labels is case-sensitive and iteration follows first
/// insertion, so the order in which labels were collected is the order in
/// which they are searched for. Empty labels are never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>")]
pub struct LabelSet(IndexSet<String>);

impl LabelSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses operator-supplied labels, e.g. `"cat, garden,,Cat"`.
    pub fn parse_comma_separated(raw: &str) -> Self {
        raw.split(',').collect()
    }

    /// Returns `true` if the label was not already present.
    pub fn insert(&mut self, label: impl AsRef<str>) -> bool {
        let label = label.as_ref().trim();
        if label.is_empty() {
            return false;
        }
        self.0.insert(label.to_string())
    }

    /// Adds every label of `other` not already present.
    pub fn merge(&mut self, other: LabelSet) {
        self.0.extend(other.0);
    }

    #[cfg(test)]
    pub fn contains(&self, label: &str) -> bool {
        self.0.contains(label)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<S> for LabelSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = LabelSet::new();
        for label in iter {
            set.insert(label);
        }
        set
    }
}

impl From<Vec<String>> for LabelSet {
    fn from(labels: Vec<String>) -> Self {
        labels.into_iter().collect()
    }
}

impl IntoIterator for LabelSet {
    type Item = String;
    type IntoIter = indexmap::set::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_collapses_overlap() {
        let mut supplied: LabelSet = ["cat", "garden"].into_iter().collect();
        let detected: LabelSet = ["Cat", "cat", "pet"].into_iter().collect();

        supplied.merge(detected);

        let labels: Vec<&str> = supplied.iter().collect();
        assert_eq!(labels, vec!["cat", "garden", "Cat", "pet"]);
    }

    #[test]
    fn parse_drops_empty_entries() {
        let labels = LabelSet::parse_comma_separated(" sunset ,,beach, sunset,");
        assert_eq!(labels.iter().collect::<Vec<_>>(), vec!["sunset", "beach"]);

        assert!(LabelSet::parse_comma_separated("").is_empty());
    }

    #[test]
    fn serializes_as_plain_array() {
        let labels: LabelSet = ["cat", "pet"].into_iter().collect();
        assert_eq!(serde_json::to_string(&labels).unwrap(), r#"["cat","pet"]"#);

        let parsed: LabelSet = serde_json::from_str(r#"["dog","dog","","pet"]"#).unwrap();
        assert_eq!(parsed.iter().collect::<Vec<_>>(), vec!["dog", "pet"]);
    }
}
