//! Alias → primary company lookup.
//!
//! The index is a plain hash map keyed by normalized alias. It is rebuilt by
//! the mapping store after every change and shared with readers as an
//! immutable snapshot.

use std::collections::HashMap;

use crate::types::CompanyRecord;

/// Lookup key for an alias: trimmed and lower-cased.
pub fn normalize(alias: &str) -> String {
    alias.trim().to_lowercase()
}

#[derive(Debug, Clone, Default)]
pub struct AliasIndex {
    by_alias: HashMap<String, String>,
}

impl AliasIndex {
    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a CompanyRecord>,
    {
        let mut by_alias = HashMap::new();
        for record in records {
            for alias in &record.aliases {
                by_alias.insert(normalize(alias), record.primary.clone());
            }
        }
        Self { by_alias }
    }

    /// Returns the primary company for `candidate`, or `None` when the alias
    /// is unknown.
    pub fn resolve(&self, candidate: &str) -> Option<&str> {
        let key = normalize(candidate);
        if key.is_empty() {
            return None;
        }
        self.by_alias.get(&key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_alias.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_alias.is_empty()
    }
}
