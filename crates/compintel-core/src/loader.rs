use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// A document read from disk, before tag parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    pub doc_id: String,
    pub source: String,
    pub path: PathBuf,
    pub priority: usize,
    pub text: String,
}

impl SourceDocument {
    /// An in-memory document, e.g. from a crawler.
    pub fn from_text(source: impl Into<String>, text: impl Into<String>) -> Self {
        let source = source.into();
        Self { doc_id: source.clone(), path: PathBuf::from(&source), source, priority: 0, text: text.into() }
    }
}

/// A file selected for ingestion, not yet read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredFile {
    pub root: PathBuf,
    pub path: PathBuf,
    pub priority: usize,
}

/// A document that could not be read. Reported per item; never aborts a
/// batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentFailure {
    pub path: PathBuf,
    pub error: String,
}

/// Outcome of walking the input roots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Discovery {
    pub files: Vec<DiscoveredFile>,
    /// Entries the walk could not read, e.g. unreadable directories or
    /// symlink loops.
    pub failures: Vec<DocumentFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderConfig {
    pub extensions: Vec<String>,
    pub priority_dirs: Vec<String>,
    pub limit: Option<usize>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self { extensions: vec!["txt".to_string()], priority_dirs: vec!["internal_data".to_string()], limit: None }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DocumentLoader {
    config: LoaderConfig,
}

impl DocumentLoader {
    pub fn new(config: LoaderConfig) -> Self {
        Self { config }
    }

    /// Files under `roots` with a configured extension, ordered by
    /// (priority, path) and cut to the configured limit. Symlinks are
    /// followed; entries that cannot be walked are returned as failures.
    pub fn discover(&self, roots: &[PathBuf]) -> Discovery {
        let mut files = Vec::new();
        let mut failures = Vec::new();
        for root in roots {
            if !root.exists() {
                info!(root = %root.display(), "input root does not exist, skipping");
                continue;
            }
            for entry in walkdir::WalkDir::new(root).follow_links(true) {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        let path = e.path().map_or_else(|| root.clone(), Path::to_path_buf);
                        warn!(path = %path.display(), error = %e, "failed to walk input entry");
                        failures.push(DocumentFailure { path, error: e.to_string() });
                        continue;
                    }
                };
                let path = entry.path();
                if !entry.file_type().is_file() || !self.wants(path) {
                    continue;
                }
                files.push(DiscoveredFile { root: root.clone(), path: path.to_path_buf(), priority: self.priority_of(path) });
            }
        }
        files.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.path.cmp(&b.path)));
        if let Some(limit) = self.config.limit {
            if files.len() > limit {
                info!(found = files.len(), limit, "limiting input files");
                files.truncate(limit);
            }
        }
        Discovery { files, failures }
    }

    pub fn load(&self, file: &DiscoveredFile) -> Result<SourceDocument> {
        let bytes = fs::read(&file.path).map_err(|e| Error::io(&file.path, e))?;
        let text = match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => {
                debug!(path = %file.path.display(), "file is not valid UTF-8, decoding lossily");
                String::from_utf8_lossy(e.as_bytes()).into_owned()
            }
        };
        Ok(SourceDocument {
            doc_id: doc_id(&file.root, &file.path),
            source: file.path.file_name().map_or_else(|| file.path.display().to_string(), |n| n.to_string_lossy().into_owned()),
            path: file.path.clone(),
            priority: file.priority,
            text,
        })
    }

    /// Reads every file in parallel, keeping input order.
    pub fn load_all(&self, files: &[DiscoveredFile]) -> Vec<std::result::Result<SourceDocument, DocumentFailure>> {
        files
            .par_iter()
            .map(|file| {
                self.load(file).map_err(|e| {
                    warn!(path = %file.path.display(), error = %e, "failed to read document");
                    DocumentFailure { path: file.path.clone(), error: e.to_string() }
                })
            })
            .collect()
    }

    fn wants(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|s| s.to_str())
            .is_some_and(|ext| self.config.extensions.iter().any(|want| want.eq_ignore_ascii_case(ext)))
    }

    fn priority_of(&self, path: &Path) -> usize {
        let path = path.to_string_lossy();
        self.config.priority_dirs.iter().position(|dir| path.contains(dir.as_str())).unwrap_or(self.config.priority_dirs.len())
    }
}

/// Root name plus the path below it, `/`-separated, so files with the same
/// name in different folders or roots stay distinct.
fn doc_id(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let mut parts: Vec<String> = Vec::new();
    if let Some(name) = root.file_name() {
        parts.push(name.to_string_lossy().into_owned());
    }
    parts.extend(relative.components().map(|c| c.as_os_str().to_string_lossy().into_owned()));
    parts.join("/")
}
