//! `tag=value; tag=value` parsing shared by DKIM key records and DMARC records.

use serde::Serialize;

use super::issue::Issue;

/// Ordered tag map. Keys are lowercased; a repeated key overwrites the
/// earlier value in place, keeping the position of its first appearance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TagRecord {
    entries: Vec<(String, String)>,
}

impl TagRecord {
    /// Parse a semicolon-separated tag list.
    ///
    /// Segments without `=` are dropped and reported as warnings; parsing
    /// always continues with the next segment.
    pub fn parse(input: &str) -> (Self, Vec<Issue>) {
        let mut record = TagRecord::default();
        let mut issues = Vec::new();

        for part in input.split(';') {
            let trimmed = part.trim();
            if trimmed.is_empty() {
                continue;
            }
            match trimmed.split_once('=') {
                Some((key, value)) => record.insert(&key.trim().to_ascii_lowercase(), value.trim()),
                None => issues.push(Issue::warning(format!(
                    "Malformed tag \"{}\" (missing '='), ignored",
                    trimmed
                ))),
            }
        }

        (record, issues)
    }

    fn insert(&mut self, key: &str, value: &str) {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.entries.push((key.to_string(), value.to_string())),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
