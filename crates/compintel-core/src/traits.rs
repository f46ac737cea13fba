use crate::query::CompanyFilter;
use crate::types::{CompanyFold, DocumentChunk, SearchHit};

/// Storage collaborator that receives accepted chunks.
pub trait ChunkSink: Send + Sync {
    fn store(&self, chunks: &[DocumentChunk]) -> anyhow::Result<()>;

    /// Drops every stored chunk of the given documents. Called for each
    /// re-processed document, including ones that now yield no chunks.
    fn remove_documents(&self, doc_ids: &[String]) -> anyhow::Result<()>;

    /// Moves chunks scoped to `fold.from` over to `fold.into`. Returns the
    /// number of chunks moved.
    fn reassign_company(&self, fold: &CompanyFold) -> anyhow::Result<u64>;
}

/// A keyword backend that can also answer company-filtered queries.
pub trait TextIndexer: ChunkSink {
    fn search(&self, query: &str, filter: &CompanyFilter, k: usize) -> anyhow::Result<Vec<SearchHit>>;
}
