//! Persisted company mappings.
//!
//! On disk the store is a JSON object of primary name → ordered aliases:
//!
//! ```json
//! { "Disney": ["Disney", "ESPN", "Pixar"] }
//! ```
//!
//! A missing file is an empty store. A file that exists but does not parse,
//! or that assigns one alias to two companies, is reported as
//! [`Error::MappingCorrupt`] and never replaced by an empty mapping.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::resolver::{normalize, AliasIndex};
use crate::tagging::TagDeclaration;
use crate::types::{CompanyFold, CompanyRecord};

/// What a declaration did to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeKind {
    Created,
    Extended,
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub primary: String,
    pub kind: MergeKind,
    pub added: Vec<String>,
    /// Primaries of records folded into `primary` by this declaration.
    pub folded: Vec<String>,
}

/// Result of merging a document's declarations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyOutcome {
    /// Records created or changed, each listed once.
    pub updated: Vec<CompanyRecord>,
    /// Folds in the order they happened. Chunks already stored under a
    /// `from` primary have to be moved to `into`.
    pub folds: Vec<CompanyFold>,
}

#[derive(Debug, Default)]
pub struct MappingStore {
    records: BTreeMap<String, CompanyRecord>,
    index: Arc<AliasIndex>,
}

impl MappingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the store from `path`. A missing file yields an empty store.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "no mapping file yet, starting empty");
                return Ok(Self::new());
            }
            Err(e) => return Err(Error::io(path, e)),
        };
        let corrupt = |reason: String| Error::MappingCorrupt { path: path.to_path_buf(), reason };

        let persisted: BTreeMap<String, Vec<String>> =
            serde_json::from_str(&raw).map_err(|e| corrupt(e.to_string()))?;

        let mut store = Self::new();
        let mut owner: BTreeMap<String, String> = BTreeMap::new();
        for (primary, aliases) in persisted {
            if primary.trim().is_empty() {
                return Err(corrupt("empty primary company name".to_string()));
            }
            let mut record = CompanyRecord::new(primary.clone());
            for alias in aliases {
                if alias.trim().is_empty() || record.has_alias(&alias) {
                    continue;
                }
                record.aliases.push(alias);
            }
            for alias in &record.aliases {
                if let Some(other) = owner.insert(normalize(alias), primary.clone()) {
                    return Err(corrupt(format!("alias {alias:?} belongs to both {other:?} and {primary:?}")));
                }
            }
            store.records.insert(primary, record);
        }
        store.rebuild_index();
        info!(path = %path.display(), companies = store.records.len(), "loaded company mappings");
        Ok(store)
    }

    /// Writes the store to `path` atomically (temp file + rename).
    pub fn persist(&self, path: &Path) -> Result<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;

        let persisted: BTreeMap<&str, &[String]> =
            self.records.iter().map(|(primary, record)| (primary.as_str(), record.aliases.as_slice())).collect();
        let json = serde_json::to_string_pretty(&persisted)
            .map_err(|e| Error::Operation(format!("failed to serialize mappings: {e}")))?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| Error::io(dir, e))?;
        tmp.write_all(json.as_bytes()).map_err(|e| Error::io(tmp.path(), e))?;
        tmp.persist(path).map_err(|e| Error::io(path, e.error))?;
        debug!(path = %path.display(), companies = self.records.len(), "persisted company mappings");
        Ok(())
    }

    /// Merges one declaration into the store.
    ///
    /// The first alias becomes the primary of a new record unless some listed
    /// alias is already known, in which case every alias joins the record
    /// that owns it. Returns `None` for a declaration without aliases.
    pub fn merge(&mut self, aliases: &[String]) -> Option<MergeOutcome> {
        let aliases: Vec<&str> = aliases.iter().map(|a| a.trim()).filter(|a| !a.is_empty()).collect();
        let first = *aliases.first()?;

        let mut claimed: Vec<String> = Vec::new();
        for alias in &aliases {
            if let Some(primary) = self.index.resolve(alias) {
                if !claimed.iter().any(|p| p == primary) {
                    claimed.push(primary.to_string());
                }
            }
        }

        let (primary, mut kind) = match claimed.first() {
            Some(primary) => (primary.clone(), MergeKind::Unchanged),
            None => {
                self.records.insert(first.to_string(), CompanyRecord::new(first));
                (first.to_string(), MergeKind::Created)
            }
        };

        let mut added = Vec::new();
        let mut folded = Vec::new();
        for other in claimed.iter().skip(1) {
            let Some(record) = self.records.remove(other) else { continue };
            warn!(into = %primary, folded = %other, "declaration links two known companies, folding records");
            added.extend(record.aliases);
            folded.push(other.clone());
        }
        added.extend(aliases.iter().map(|a| a.to_string()));

        let record = self.records.entry(primary.clone()).or_insert_with(|| CompanyRecord::new(primary.clone()));
        let mut newly_added = Vec::new();
        for alias in added {
            if record.has_alias(&alias) {
                continue;
            }
            record.aliases.push(alias.clone());
            newly_added.push(alias);
        }
        if kind == MergeKind::Unchanged && (!newly_added.is_empty() || claimed.len() > 1) {
            kind = MergeKind::Extended;
        }
        if kind != MergeKind::Unchanged {
            self.rebuild_index();
        }
        Some(MergeOutcome { primary, kind, added: newly_added, folded })
    }

    /// Merges every declaration, returning the records that were created or
    /// changed and any folds between existing records.
    pub fn apply(&mut self, declarations: &[TagDeclaration]) -> ApplyOutcome {
        let mut touched: Vec<String> = Vec::new();
        let mut folds = Vec::new();
        for declaration in declarations {
            let Some(outcome) = self.merge(&declaration.aliases) else { continue };
            if outcome.kind == MergeKind::Unchanged {
                continue;
            }
            debug!(primary = %outcome.primary, kind = ?outcome.kind, added = ?outcome.added, "merged company declaration");
            folds.extend(outcome.folded.into_iter().map(|from| CompanyFold { from, into: outcome.primary.clone() }));
            if !touched.contains(&outcome.primary) {
                touched.push(outcome.primary);
            }
        }
        // A later declaration may fold an earlier touched record away.
        let updated = touched.iter().filter_map(|p| self.records.get(p).cloned()).collect();
        ApplyOutcome { updated, folds }
    }

    pub fn resolve(&self, candidate: &str) -> Option<&str> {
        self.index.resolve(candidate)
    }

    pub fn get(&self, primary: &str) -> Option<&CompanyRecord> {
        self.records.get(primary)
    }

    /// Records ordered by primary name.
    pub fn records(&self) -> impl Iterator<Item = &CompanyRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Current alias index, shared with readers.
    pub fn index(&self) -> Arc<AliasIndex> {
        Arc::clone(&self.index)
    }

    fn rebuild_index(&mut self) {
        self.index = Arc::new(AliasIndex::from_records(self.records.values()));
    }
}

/// Single-writer handle to a [`MappingStore`] shared across workers.
///
/// Merges take the write lock one at a time; readers grab an index snapshot
/// and resolve without holding any lock.
#[derive(Debug, Clone, Default)]
pub struct SharedMappingStore {
    inner: Arc<RwLock<MappingStore>>,
}

impl SharedMappingStore {
    pub fn new(store: MappingStore) -> Self {
        Self { inner: Arc::new(RwLock::new(store)) }
    }

    pub fn load(path: &Path) -> Result<Self> {
        MappingStore::load(path).map(Self::new)
    }

    pub fn apply(&self, declarations: &[TagDeclaration]) -> ApplyOutcome {
        self.inner.write().apply(declarations)
    }

    pub fn snapshot(&self) -> Arc<AliasIndex> {
        self.inner.read().index()
    }

    pub fn resolve(&self, candidate: &str) -> Option<String> {
        self.inner.read().resolve(candidate).map(str::to_string)
    }

    pub fn records(&self) -> Vec<CompanyRecord> {
        self.inner.read().records().cloned().collect()
    }

    pub fn persist(&self, path: &Path) -> Result<()> {
        self.inner.read().persist(path)
    }
}
