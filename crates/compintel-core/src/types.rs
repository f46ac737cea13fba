//! Domain types shared by the ingestion pipeline and the search backends.

use serde::{Deserialize, Serialize};

pub type ChunkId = String;

/// A company and every name it is known by.
///
/// `aliases` is ordered, starts with `primary`, and never holds two entries
/// that differ only by case or surrounding whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyRecord {
    pub primary: String,
    pub aliases: Vec<String>,
}

impl CompanyRecord {
    pub fn new(primary: impl Into<String>) -> Self {
        let primary = primary.into();
        Self { aliases: vec![primary.clone()], primary }
    }

    /// Case-insensitive membership test.
    pub fn has_alias(&self, alias: &str) -> bool {
        let key = crate::resolver::normalize(alias);
        self.aliases.iter().any(|a| crate::resolver::normalize(a) == key)
    }
}

/// Record `from` was folded into record `into`; `from` is no longer a
/// primary.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompanyFold {
    pub from: String,
    pub into: String,
}

/// Whether a chunk carries a resolved company identity.
///
/// `Unscoped` means "no company scoping available" and is never a
/// placeholder company name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "scope", content = "company", rename_all = "snake_case")]
pub enum CompanyScope {
    #[default]
    Unscoped,
    Scoped(String),
}

impl CompanyScope {
    pub fn company(&self) -> Option<&str> {
        match self {
            Self::Unscoped => None,
            Self::Scoped(primary) => Some(primary),
        }
    }

    pub fn is_scoped(&self) -> bool {
        matches!(self, Self::Scoped(_))
    }
}

/// A contiguous slice of a document body.
///
/// `start`/`end` are character offsets into the tag-stripped body, `index`
/// is the position in the document and `total` the document's chunk count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub text: String,
    pub start: usize,
    pub end: usize,
    pub index: usize,
    pub total: usize,
}

impl Chunk {
    pub fn char_len(&self) -> usize {
        self.end - self.start
    }
}

/// Coarse topic of a chunk, detected from keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Pricing,
    Features,
    Competitive,
    General,
}

impl ContentType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pricing => "pricing",
            Self::Features => "features",
            Self::Competitive => "competitive",
            Self::General => "general",
        }
    }

    pub const ALL: [Self; 4] = [Self::Pricing, Self::Features, Self::Competitive, Self::General];

    /// Inverse of [`ContentType::as_str`].
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }
}

/// Metadata stored alongside every accepted chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub source: String,
    pub company: CompanyScope,
    pub chunk_index: usize,
    pub total_chunks: usize,
    pub word_count: usize,
    pub content_type: ContentType,
}

/// A validated chunk, ready for the storage collaborators.
///
/// - `id`: `<doc_id>#<chunk_index>`, unique across a corpus
/// - `doc_id`: stable document identity (path relative to its input root)
/// - `doc_path`: original path to the source file
/// - `content`: the text payload of the chunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub id: ChunkId,
    pub doc_id: String,
    pub doc_path: String,
    pub content: String,
    pub metadata: ChunkMetadata,
}

impl DocumentChunk {
    pub fn chunk_id(doc_id: &str, chunk_index: usize) -> ChunkId {
        format!("{doc_id}#{chunk_index}")
    }
}

/// The minimal surface returned by search backends.
///
/// `id` matches `DocumentChunk::id`. `score` is backend-specific; the
/// bundled keyword store ranks higher as better.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: ChunkId,
    pub score: f32,
    pub source: String,
    pub company: Option<String>,
    pub snippet: String,
}
