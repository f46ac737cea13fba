use std::path::Path;

use anyhow::Result;
use parking_lot::Mutex;
use tantivy::collector::DocSetCollector;
use tantivy::directory::MmapDirectory;
use tantivy::query::TermQuery;
use tantivy::schema::{Facet, IndexRecordOption, Value};
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, Searcher, TantivyDocument, Term};
use tracing::{debug, info};

use compintel_core::traits::ChunkSink;
use compintel_core::types::{ChunkMetadata, CompanyFold, CompanyScope, ContentType, DocumentChunk};

use crate::tantivy_utils::{build_schema, register_tokenizer, ChunkFields};

const WRITER_MEMORY_BYTES: usize = 50_000_000;

/// Tantivy-backed keyword store.
///
/// One writer is held for the lifetime of the store. Every write commits
/// and reloads the reader, so changes are searchable as soon as the call
/// returns; a failed write is rolled back.
pub struct TantivyStore {
	pub(crate) index: Index,
	pub(crate) reader: IndexReader,
	writer: Mutex<IndexWriter>,
	pub(crate) fields: ChunkFields,
}

impl TantivyStore {
	/// Opens the index in `index_dir`, creating it if needed. Existing
	/// chunks are kept.
	pub fn open(index_dir: &Path) -> Result<Self> {
		std::fs::create_dir_all(index_dir)?;
		let index = Index::open_or_create(MmapDirectory::open(index_dir)?, build_schema())?;
		info!(dir = %index_dir.display(), "opened tantivy index");
		Self::from_index(index)
	}

	pub fn in_memory() -> Result<Self> {
		Self::from_index(Index::create_in_ram(build_schema()))
	}

	fn from_index(index: Index) -> Result<Self> {
		register_tokenizer(&index);
		let fields = ChunkFields::from_schema(&index.schema())?;
		let writer: IndexWriter = index.writer(WRITER_MEMORY_BYTES)?;
		let reader: IndexReader = index.reader_builder().reload_policy(ReloadPolicy::Manual).try_into()?;
		Ok(Self { index, reader, writer: Mutex::new(writer), fields })
	}

	pub fn num_chunks(&self) -> u64 {
		self.reader.searcher().num_docs()
	}

	/// Every stored chunk scoped to `primary`.
	pub(crate) fn chunks_of(&self, searcher: &Searcher, primary: &str) -> Result<Vec<DocumentChunk>> {
		let query = TermQuery::new(Term::from_field_text(self.fields.company, primary), IndexRecordOption::Basic);
		let mut chunks = Vec::new();
		for addr in searcher.search(&query, &DocSetCollector)? {
			let doc: TantivyDocument = searcher.doc(addr)?;
			chunks.push(self.to_chunk(&doc)?);
		}
		chunks.sort_by(|a, b| a.id.cmp(&b.id));
		Ok(chunks)
	}

	fn to_document(&self, chunk: &DocumentChunk) -> TantivyDocument {
		let f = &self.fields;
		let meta = &chunk.metadata;
		let mut doc = TantivyDocument::default();
		doc.add_text(f.id, &chunk.id);
		doc.add_text(f.doc_id, &chunk.doc_id);
		doc.add_text(f.doc_path, &chunk.doc_path);
		doc.add_text(f.source, &meta.source);
		doc.add_text(f.text, &chunk.content);
		if let Some(primary) = meta.company.company() {
			doc.add_text(f.company, primary);
			doc.add_facet(f.company_facet, Facet::from_path([primary]));
		}
		doc.add_u64(f.chunk_index, meta.chunk_index as u64);
		doc.add_u64(f.total_chunks, meta.total_chunks as u64);
		doc.add_u64(f.word_count, meta.word_count as u64);
		doc.add_text(f.content_type, meta.content_type.as_str());
		doc
	}

	fn to_chunk(&self, doc: &TantivyDocument) -> Result<DocumentChunk> {
		let f = &self.fields;
		let text = |field| doc.get_first(field).and_then(|v| v.as_str()).map(str::to_string);
		let number = |field| doc.get_first(field).and_then(|v| v.as_u64()).unwrap_or(0) as usize;
		let id = text(f.id).ok_or_else(|| anyhow::anyhow!("stored chunk has no id"))?;
		let content_type = text(f.content_type).as_deref().and_then(ContentType::from_name).unwrap_or(ContentType::General);
		Ok(DocumentChunk {
			doc_id: text(f.doc_id).unwrap_or_default(),
			doc_path: text(f.doc_path).unwrap_or_default(),
			content: text(f.text).unwrap_or_default(),
			metadata: ChunkMetadata {
				source: text(f.source).unwrap_or_default(),
				company: text(f.company).map_or(CompanyScope::Unscoped, CompanyScope::Scoped),
				chunk_index: number(f.chunk_index),
				total_chunks: number(f.total_chunks),
				word_count: number(f.word_count),
				content_type,
			},
			id,
		})
	}

	/// Runs `op` under the writer lock and commits it.
	fn write<T>(&self, op: impl FnOnce(&mut IndexWriter) -> Result<T>) -> Result<T> {
		let mut writer = self.writer.lock();
		let value = match op(&mut *writer).and_then(|value| {
			writer.commit()?;
			Ok(value)
		}) {
			Ok(value) => value,
			Err(e) => {
				writer.rollback()?;
				return Err(e);
			}
		};
		drop(writer);
		self.reader.reload()?;
		Ok(value)
	}
}

impl ChunkSink for TantivyStore {
	fn store(&self, chunks: &[DocumentChunk]) -> Result<()> {
		if chunks.is_empty() {
			return Ok(());
		}
		self.write(|writer| {
			for chunk in chunks {
				writer.delete_term(Term::from_field_text(self.fields.id, &chunk.id));
				writer.add_document(self.to_document(chunk))?;
			}
			Ok(())
		})?;
		debug!(chunks = chunks.len(), "stored chunks in tantivy");
		Ok(())
	}

	fn remove_documents(&self, doc_ids: &[String]) -> Result<()> {
		if doc_ids.is_empty() {
			return Ok(());
		}
		self.write(|writer| {
			for doc_id in doc_ids {
				writer.delete_term(Term::from_field_text(self.fields.doc_id, doc_id));
			}
			Ok(())
		})?;
		debug!(documents = doc_ids.len(), "removed documents from tantivy");
		Ok(())
	}

	fn reassign_company(&self, fold: &CompanyFold) -> Result<u64> {
		let moved = self.write(|writer| {
			// The reader reflects the last commit and every commit goes
			// through this lock, so nothing can change underneath us here.
			let mut chunks = self.chunks_of(&self.reader.searcher(), &fold.from)?;
			writer.delete_term(Term::from_field_text(self.fields.company, &fold.from));
			for chunk in &mut chunks {
				chunk.metadata.company = CompanyScope::Scoped(fold.into.clone());
				writer.add_document(self.to_document(chunk))?;
			}
			Ok(chunks.len() as u64)
		})?;
		info!(from = %fold.from, into = %fold.into, chunks = moved, "reassigned company in tantivy");
		Ok(moved)
	}
}
