use serde::Serialize;
use std::fmt;

/// Separator used in the serialized (DB) form of an attachment list.
pub const ATTACHMENT_SEPARATOR: char = ',';

/// Ordered set of attachment names.
///
/// - no duplicates
/// - order of first appearance is preserved
/// - serialized comma-joined, without spaces
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AttachmentList {
    items: Vec<String>,
}

impl AttachmentList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the DB column. Entries are trimmed, empties dropped, and
    /// repeated names collapse onto their first occurrence.
    pub fn parse(serialized: &str) -> Self {
        Self::from_names(serialized.split(ATTACHMENT_SEPARATOR))
    }

    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut list = Self::new();
        for n in names {
            list.push_unique(n.as_ref());
        }
        list
    }

    /// Append `name` unless already present. Returns true if it was added.
    pub fn push_unique(&mut self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() || self.contains(name) {
            return false;
        }
        self.items.push(name.to_string());
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.items.iter().any(|n| n == name)
    }

    /// Set union: `self` first, then the new names of `other` in their order.
    pub fn union(&self, other: &AttachmentList) -> AttachmentList {
        let mut merged = self.clone();
        for n in &other.items {
            merged.push_unique(n);
        }
        merged
    }

    /// Length in chars of the serialized form, computed without allocating it.
    pub fn serialized_len(&self) -> usize {
        let names: usize = self.items.iter().map(|n| n.chars().count()).sum();
        names + self.items.len().saturating_sub(1)
    }

    pub fn serialized(&self) -> String {
        self.items.join(&ATTACHMENT_SEPARATOR.to_string())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(String::as_str)
    }
}

impl fmt::Display for AttachmentList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serialized())
    }
}
