use tantivy::schema::{Field, FacetOptions, IndexRecordOption, Schema, TextFieldIndexing, TextOptions, STORED, STRING};
use tantivy::tokenizer::{LowerCaser, SimpleTokenizer, StopWordFilter, TextAnalyzer};
use tantivy::Index;

pub const TEXT_TOKENIZER: &str = "text_with_stopwords";

/// Handles to every field of the chunk schema.
#[derive(Debug, Clone, Copy)]
pub struct ChunkFields {
	pub id: Field,
	pub doc_id: Field,
	pub doc_path: Field,
	pub source: Field,
	pub text: Field,
	pub company: Field,
	pub company_facet: Field,
	pub chunk_index: Field,
	pub total_chunks: Field,
	pub word_count: Field,
	pub content_type: Field,
}

impl ChunkFields {
	pub fn from_schema(schema: &Schema) -> anyhow::Result<Self> {
		Ok(Self {
			id: schema.get_field("id")?,
			doc_id: schema.get_field("doc_id")?,
			doc_path: schema.get_field("doc_path")?,
			source: schema.get_field("source")?,
			text: schema.get_field("text")?,
			company: schema.get_field("company")?,
			company_facet: schema.get_field("company_facet")?,
			chunk_index: schema.get_field("chunk_index")?,
			total_chunks: schema.get_field("total_chunks")?,
			word_count: schema.get_field("word_count")?,
			content_type: schema.get_field("content_type")?,
		})
	}
}

pub fn build_schema() -> Schema {
	let mut schema_builder = Schema::builder();
	schema_builder.add_text_field("id", STRING | STORED);
	schema_builder.add_text_field("doc_id", STRING | STORED);
	schema_builder.add_text_field("doc_path", STRING | STORED);
	schema_builder.add_text_field("source", STRING | STORED);
	let text_field_indexing = TextFieldIndexing::default().set_tokenizer(TEXT_TOKENIZER).set_index_option(IndexRecordOption::WithFreqsAndPositions);
	let text_options = TextOptions::default().set_indexing_options(text_field_indexing).set_stored();
	schema_builder.add_text_field("text", text_options);
	// Primary company name, exact match. Absent on unscoped chunks.
	schema_builder.add_text_field("company", STRING | STORED);
	schema_builder.add_facet_field("company_facet", FacetOptions::default());
	schema_builder.add_u64_field("chunk_index", STORED);
	schema_builder.add_u64_field("total_chunks", STORED);
	schema_builder.add_u64_field("word_count", STORED);
	schema_builder.add_text_field("content_type", STRING | STORED);
	schema_builder.build()
}

pub fn register_tokenizer(index: &Index) {
	let stop_words = vec![
		"a","an","and","are","as","at","be","by","for","from","has","he","in","is","it","its","of","on","that","the","to","was","will","with","or","but","not","this","these","they","them","their","there","then","than","so","if","when","where","why","how","what","which","who","whom","whose","can","could","should","would","may","might","must","shall","do","does","did","have","had","having",
	];
	let tokenizer = TextAnalyzer::builder(SimpleTokenizer::default())
		.filter(LowerCaser)
		.filter(StopWordFilter::remove(stop_words.into_iter().map(|s| s.to_string())))
		.build();
	index.tokenizers().register(TEXT_TOKENIZER, tokenizer);
}
