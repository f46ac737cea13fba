use std::collections::{BTreeMap, BTreeSet};

use anyhow::Result;
use tantivy::collector::{FacetCollector, TopDocs};
use tantivy::query::{AllQuery, BooleanQuery, Occur, Query, QueryParser, TermQuery};
use tantivy::schema::{Facet, IndexRecordOption, Value};
use tantivy::snippet::SnippetGenerator;
use tantivy::{TantivyDocument, Term};
use tracing::debug;

use compintel_core::query::CompanyFilter;
use compintel_core::traits::TextIndexer;
use compintel_core::types::{ContentType, SearchHit};

use crate::index::TantivyStore;

const FALLBACK_SNIPPET_CHARS: usize = 160;

/// What the store holds for one company.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanySummary {
	pub primary: String,
	pub chunks: u64,
	/// Chunk count per content type, most chunks first.
	pub content_types: Vec<(ContentType, u64)>,
	/// Distinct source file names, sorted.
	pub sources: Vec<String>,
}

impl TantivyStore {
	fn build_query(&self, query_text: &str, filter: &CompanyFilter) -> Result<Box<dyn Query>> {
		let text_query: Box<dyn Query> = if query_text.trim().is_empty() {
			Box::new(AllQuery)
		} else {
			let (query, errors) = QueryParser::for_index(&self.index, vec![self.fields.text]).parse_query_lenient(query_text);
			if !errors.is_empty() {
				debug!(query = query_text, errors = ?errors, "query parsed leniently");
			}
			query
		};
		Ok(match filter {
			CompanyFilter::All => text_query,
			CompanyFilter::Company(primary) => {
				let company = TermQuery::new(Term::from_field_text(self.fields.company, primary), IndexRecordOption::Basic);
				Box::new(BooleanQuery::new(vec![(Occur::Must, text_query), (Occur::Must, Box::new(company))]))
			}
		})
	}

	/// Stored chunks per primary company, most chunks first. Unscoped chunks
	/// are not counted.
	pub fn company_counts(&self) -> Result<Vec<(String, u64)>> {
		let searcher = self.reader.searcher();
		let mut facet_collector = FacetCollector::for_field("company_facet");
		facet_collector.add_facet(Facet::root());
		let facet_counts = searcher.search(&AllQuery, &facet_collector)?;
		let mut counts: Vec<(String, u64)> = facet_counts
			.get(Facet::root())
			.filter_map(|(facet, count)| facet.to_path().last().map(|name| (name.to_string(), count)))
			.collect();
		counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
		Ok(counts)
	}

	/// Content-type breakdown and source files of one primary company.
	pub fn company_summary(&self, primary: &str) -> Result<CompanySummary> {
		let chunks = self.chunks_of(&self.reader.searcher(), primary)?;
		let mut by_type: BTreeMap<ContentType, u64> = BTreeMap::new();
		let mut sources = BTreeSet::new();
		for chunk in &chunks {
			*by_type.entry(chunk.metadata.content_type).or_default() += 1;
			sources.insert(chunk.metadata.source.clone());
		}
		let mut content_types: Vec<(ContentType, u64)> = by_type.into_iter().collect();
		content_types.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.as_str().cmp(b.0.as_str())));
		Ok(CompanySummary {
			primary: primary.to_string(),
			chunks: chunks.len() as u64,
			content_types,
			sources: sources.into_iter().collect(),
		})
	}
}

impl TextIndexer for TantivyStore {
	fn search(&self, query_text: &str, filter: &CompanyFilter, k: usize) -> Result<Vec<SearchHit>> {
		if k == 0 {
			return Ok(Vec::new());
		}
		let query = self.build_query(query_text, filter)?;
		let searcher = self.reader.searcher();
		let top_docs = searcher.search(&*query, &TopDocs::with_limit(k))?;
		let snippet_generator = SnippetGenerator::create(&searcher, &*query, self.fields.text)?;

		let mut hits = Vec::with_capacity(top_docs.len());
		for (score, addr) in top_docs {
			let doc: TantivyDocument = searcher.doc(addr)?;
			let stored = |field| doc.get_first(field).and_then(|v| v.as_str()).map(str::to_string);
			let snippet = snippet_generator.snippet_from_doc(&doc);
			let snippet = if snippet.fragment().is_empty() {
				stored(self.fields.text).unwrap_or_default().chars().take(FALLBACK_SNIPPET_CHARS).collect()
			} else {
				snippet.fragment().to_string()
			};
			hits.push(SearchHit {
				id: stored(self.fields.id).unwrap_or_default(),
				score,
				source: stored(self.fields.source).unwrap_or_default(),
				company: stored(self.fields.company),
				snippet,
			});
		}
		Ok(hits)
	}
}
