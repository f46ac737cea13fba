//! Last gate before storage.
//!
//! Every chunk ends up either accepted or rejected with a reason; nothing
//! is dropped without a [`Rejection`] being recorded and logged.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::ChunkMetadata;

pub const DEFAULT_MIN_TEXT_CHARS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationConfig {
    pub min_text_chars: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self { min_text_chars: DEFAULT_MIN_TEXT_CHARS }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RejectReason {
    MissingMetadata,
    TooShort { chars: usize, min: usize },
    MissingSource,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingMetadata => write!(f, "metadata is missing"),
            Self::TooShort { chars, min } => write!(f, "text has {chars} non-blank chars, need {min}"),
            Self::MissingSource => write!(f, "metadata has no source"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    Rejected(RejectReason),
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}

/// A chunk that did not make it into storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    pub doc_id: String,
    pub chunk_index: usize,
    pub reason: RejectReason,
}

#[derive(Debug, Clone, Default)]
pub struct Validator {
    config: ValidationConfig,
}

impl Validator {
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// Checks, in order: metadata present, text long enough once trimmed,
    /// source present.
    pub fn check(&self, text: &str, metadata: Option<&ChunkMetadata>) -> Verdict {
        let Some(metadata) = metadata else {
            return Verdict::Rejected(RejectReason::MissingMetadata);
        };
        let chars = text.trim().chars().count();
        if chars < self.config.min_text_chars {
            return Verdict::Rejected(RejectReason::TooShort { chars, min: self.config.min_text_chars });
        }
        if metadata.source.trim().is_empty() {
            return Verdict::Rejected(RejectReason::MissingSource);
        }
        Verdict::Accepted
    }
}
