//! Batch ingestion: tags → mapping merge → chunks → metadata → validation.
//!
//! Documents are independent except for the mapping store. A batch is run
//! in three passes so the store sees one writer at a time and every worker
//! resolves against the same snapshot:
//!
//! 1. parse tag lines of every document (parallel)
//! 2. merge declarations into the store in input order (sequential)
//! 3. chunk, enrich and validate against one index snapshot (parallel)
//!
//! [`store_batch`] then applies the batch to a [`ChunkSink`].

use std::collections::HashMap;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::chunker::{Chunker, ChunkingConfig};
use crate::enrich::MetadataEnricher;
use crate::error::Result;
use crate::loader::{DocumentFailure, SourceDocument};
use crate::mapping::{ApplyOutcome, SharedMappingStore};
use crate::resolver::AliasIndex;
use crate::tagging::{TagParseWarning, TagParser, TaggedDocument};
use crate::traits::ChunkSink;
use crate::types::{CompanyFold, CompanyRecord, CompanyScope, DocumentChunk};
use crate::validate::{Rejection, ValidationConfig, Validator, Verdict};

/// Everything that happened to one document.
#[derive(Debug, Clone)]
pub struct DocumentOutcome {
    pub doc_id: String,
    pub source: String,
    pub company: CompanyScope,
    /// Company records this document created or extended.
    pub updated_companies: Vec<CompanyRecord>,
    /// Existing records this document's declarations folded together.
    pub folded_companies: Vec<CompanyFold>,
    pub accepted: Vec<DocumentChunk>,
    pub rejected: Vec<Rejection>,
    pub tag_warnings: Vec<TagParseWarning>,
}

#[derive(Debug, Clone)]
pub enum DocumentReport {
    Processed(DocumentOutcome),
    Failed(DocumentFailure),
}

/// Per-document results of one batch, in input order.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub documents: Vec<DocumentReport>,
}

impl BatchReport {
    pub fn outcomes(&self) -> impl Iterator<Item = &DocumentOutcome> {
        self.documents.iter().filter_map(|d| match d {
            DocumentReport::Processed(outcome) => Some(outcome),
            DocumentReport::Failed(_) => None,
        })
    }

    pub fn failures(&self) -> impl Iterator<Item = &DocumentFailure> {
        self.documents.iter().filter_map(|d| match d {
            DocumentReport::Failed(failure) => Some(failure),
            DocumentReport::Processed(_) => None,
        })
    }

    pub fn accepted(&self) -> impl Iterator<Item = &DocumentChunk> {
        self.outcomes().flat_map(|o| o.accepted.iter())
    }

    pub fn rejections(&self) -> impl Iterator<Item = &Rejection> {
        self.outcomes().flat_map(|o| o.rejected.iter())
    }

    pub fn accepted_count(&self) -> usize {
        self.outcomes().map(|o| o.accepted.len()).sum()
    }

    pub fn rejection_count(&self) -> usize {
        self.outcomes().map(|o| o.rejected.len()).sum()
    }

    pub fn failed_count(&self) -> usize {
        self.failures().count()
    }

    /// Folds from every document, in input order.
    pub fn folds(&self) -> impl Iterator<Item = &CompanyFold> {
        self.outcomes().flat_map(|o| o.folded_companies.iter())
    }

    /// Documents whose stored chunks are superseded by this batch. Failed
    /// loads are not listed; their earlier chunks stay.
    pub fn processed_doc_ids(&self) -> Vec<String> {
        self.outcomes().map(|o| o.doc_id.clone()).collect()
    }

    /// Latest state of every record touched in this batch, by primary.
    pub fn updated_companies(&self) -> Vec<&CompanyRecord> {
        let mut latest: HashMap<&str, &CompanyRecord> = HashMap::new();
        for record in self.outcomes().flat_map(|o| o.updated_companies.iter()) {
            latest.insert(record.primary.as_str(), record);
        }
        for fold in self.folds() {
            latest.remove(fold.from.as_str());
        }
        let mut records: Vec<&CompanyRecord> = latest.into_values().collect();
        records.sort_by(|a, b| a.primary.cmp(&b.primary));
        records
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    Store,
    RemoveDocument,
    ReassignCompany,
}

/// One storage operation that failed. `id` is the chunk id, the doc id or
/// the folded primary, depending on `op`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreFailure {
    pub op: StoreOp,
    pub id: String,
    pub error: String,
}

#[derive(Debug, Clone, Default)]
pub struct StoreReport {
    pub stored: usize,
    pub removed_documents: usize,
    pub reassigned_chunks: u64,
    pub failures: Vec<StoreFailure>,
}

pub struct IngestPipeline {
    tags: TagParser,
    chunker: Chunker,
    validator: Validator,
    mappings: SharedMappingStore,
}

impl IngestPipeline {
    pub fn new(chunking: ChunkingConfig, validation: ValidationConfig, mappings: SharedMappingStore) -> Result<Self> {
        Ok(Self {
            tags: TagParser::new()?,
            chunker: Chunker::new(chunking)?,
            validator: Validator::new(validation),
            mappings,
        })
    }

    pub fn mappings(&self) -> &SharedMappingStore {
        &self.mappings
    }

    pub fn process_document(&self, doc: &SourceDocument) -> DocumentOutcome {
        let tagged = self.tags.parse(&doc.text);
        let applied = self.mappings.apply(&tagged.declarations);
        let index = self.mappings.snapshot();
        self.finish(doc, tagged, applied, &index)
    }

    pub fn process_batch(&self, docs: Vec<std::result::Result<SourceDocument, DocumentFailure>>) -> BatchReport {
        let parsed: Vec<_> = docs
            .into_par_iter()
            .map(|loaded| {
                loaded.map(|doc| {
                    let tagged = self.tags.parse(&doc.text);
                    (doc, tagged)
                })
            })
            .collect();

        let merged: Vec<_> = parsed
            .into_iter()
            .map(|parsed| {
                parsed.map(|(doc, tagged)| {
                    let applied = self.mappings.apply(&tagged.declarations);
                    (doc, tagged, applied)
                })
            })
            .collect();

        let index = self.mappings.snapshot();
        let documents: Vec<DocumentReport> = merged
            .into_par_iter()
            .map(|merged| match merged {
                Ok((doc, tagged, applied)) => DocumentReport::Processed(self.finish(&doc, tagged, applied, &index)),
                Err(failure) => DocumentReport::Failed(failure),
            })
            .collect();

        let report = BatchReport { documents };
        info!(
            documents = report.documents.len(),
            accepted = report.accepted_count(),
            rejected = report.rejection_count(),
            failed = report.failed_count(),
            "batch processed"
        );
        report
    }

    fn finish(
        &self,
        doc: &SourceDocument,
        tagged: TaggedDocument,
        applied: ApplyOutcome,
        index: &AliasIndex,
    ) -> DocumentOutcome {
        let enricher = MetadataEnricher::new(index);
        let company = enricher.resolve_company(&tagged);
        let chunks = self.chunker.chunk(&tagged.body);
        if chunks.is_empty() {
            info!(doc = %doc.doc_id, "document has no body text after tag stripping");
        }

        let mut accepted = Vec::new();
        let mut rejected = Vec::new();
        for chunk in chunks {
            let enriched = enricher.enrich(chunk, &doc.source, &company);
            match self.validator.check(&enriched.chunk.text, Some(&enriched.metadata)) {
                Verdict::Accepted => accepted.push(DocumentChunk {
                    id: DocumentChunk::chunk_id(&doc.doc_id, enriched.metadata.chunk_index),
                    doc_id: doc.doc_id.clone(),
                    doc_path: doc.path.to_string_lossy().into_owned(),
                    content: enriched.chunk.text,
                    metadata: enriched.metadata,
                }),
                Verdict::Rejected(reason) => {
                    warn!(doc = %doc.doc_id, chunk = enriched.chunk.index, reason = %reason, "rejected chunk");
                    rejected.push(Rejection { doc_id: doc.doc_id.clone(), chunk_index: enriched.chunk.index, reason });
                }
            }
        }

        debug!(
            doc = %doc.doc_id,
            company = ?company.company(),
            accepted = accepted.len(),
            rejected = rejected.len(),
            "document processed"
        );
        DocumentOutcome {
            doc_id: doc.doc_id.clone(),
            source: doc.source.clone(),
            company,
            updated_companies: applied.updated,
            folded_companies: applied.folds,
            accepted,
            rejected,
            tag_warnings: tagged.warnings,
        }
    }
}

/// Hands chunks to `sink` in batches of `batch_size`. A failing batch is
/// retried one chunk at a time so one bad chunk cannot sink its neighbours.
pub fn store_in_batches(sink: &dyn ChunkSink, chunks: &[DocumentChunk], batch_size: usize) -> StoreReport {
    let mut report = StoreReport::default();
    for batch in chunks.chunks(batch_size.max(1)) {
        match sink.store(batch) {
            Ok(()) => report.stored += batch.len(),
            Err(e) => {
                warn!(size = batch.len(), error = %e, "batch store failed, retrying chunks individually");
                for chunk in batch {
                    match sink.store(std::slice::from_ref(chunk)) {
                        Ok(()) => report.stored += 1,
                        Err(e) => {
                            warn!(id = %chunk.id, error = %e, "failed to store chunk");
                            report.failures.push(StoreFailure { op: StoreOp::Store, id: chunk.id.clone(), error: e.to_string() });
                        }
                    }
                }
            }
        }
    }
    report
}

/// Brings `sink` up to date with one processed batch: moves chunks of
/// folded companies, clears every processed document, then stores the
/// accepted chunks. Failures are collected per item.
pub fn store_batch(sink: &dyn ChunkSink, batch: &BatchReport, batch_size: usize) -> StoreReport {
    let mut report = StoreReport::default();

    for fold in batch.folds() {
        match sink.reassign_company(fold) {
            Ok(moved) => {
                info!(from = %fold.from, into = %fold.into, chunks = moved, "reassigned chunks of folded company");
                report.reassigned_chunks += moved;
            }
            Err(e) => {
                warn!(from = %fold.from, into = %fold.into, error = %e, "failed to reassign folded company");
                report.failures.push(StoreFailure { op: StoreOp::ReassignCompany, id: fold.from.clone(), error: e.to_string() });
            }
        }
    }

    let doc_ids = batch.processed_doc_ids();
    if !doc_ids.is_empty() {
        match sink.remove_documents(&doc_ids) {
            Ok(()) => report.removed_documents += doc_ids.len(),
            Err(e) => {
                warn!(documents = doc_ids.len(), error = %e, "document removal failed, retrying documents individually");
                for doc_id in &doc_ids {
                    match sink.remove_documents(std::slice::from_ref(doc_id)) {
                        Ok(()) => report.removed_documents += 1,
                        Err(e) => {
                            warn!(doc = %doc_id, error = %e, "failed to remove stored chunks of document");
                            report.failures.push(StoreFailure {
                                op: StoreOp::RemoveDocument,
                                id: doc_id.clone(),
                                error: e.to_string(),
                            });
                        }
                    }
                }
            }
        }
    }

    let chunks: Vec<DocumentChunk> = batch.accepted().cloned().collect();
    let stored = store_in_batches(sink, &chunks, batch_size);
    report.stored = stored.stored;
    report.failures.extend(stored.failures);
    report
}
