use crate::resolver::AliasIndex;
use crate::tagging::TaggedDocument;
use crate::types::{Chunk, ChunkMetadata, CompanyScope, ContentType};

/// A chunk with its metadata attached, not yet validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichedChunk {
    pub chunk: Chunk,
    pub metadata: ChunkMetadata,
}

pub struct MetadataEnricher<'a> {
    index: &'a AliasIndex,
}

impl<'a> MetadataEnricher<'a> {
    pub fn new(index: &'a AliasIndex) -> Self {
        Self { index }
    }

    /// Company of a tagged document: the primary of the first declaration
    /// with a known alias. Untagged documents are `Unscoped`.
    pub fn resolve_company(&self, doc: &TaggedDocument) -> CompanyScope {
        doc.declarations
            .iter()
            .flat_map(|d| d.aliases.iter())
            .find_map(|alias| self.index.resolve(alias))
            .map_or(CompanyScope::Unscoped, |primary| CompanyScope::Scoped(primary.to_string()))
    }

    pub fn enrich(&self, chunk: Chunk, source: &str, company: &CompanyScope) -> EnrichedChunk {
        let metadata = ChunkMetadata {
            source: source.to_string(),
            company: company.clone(),
            chunk_index: chunk.index,
            total_chunks: chunk.total,
            word_count: chunk.text.split_whitespace().count(),
            content_type: detect_content_type(&chunk.text),
        };
        EnrichedChunk { chunk, metadata }
    }
}

// Whole words only, so "costume" or "priceless" stay general.
const PRICING: &[&str] = &[
    "price", "prices", "priced", "pricing", "cost", "costs", "costing", "costly", "license", "licenses",
    "licensed", "licensing", "licence", "licences", "subscription", "subscriptions",
];
const FEATURES: &[&str] = &[
    "feature", "features", "featured", "featuring", "capability", "capabilities", "functionality",
    "functionalities",
];
const COMPETITIVE: &[&str] = &["competitor", "competitors", "comparison", "comparisons", "vs", "versus"];

/// Keyword topic of a chunk; pricing wins over features, features over
/// competitive.
pub fn detect_content_type(text: &str) -> ContentType {
    let lower = text.to_lowercase();
    let words: Vec<&str> = lower.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()).collect();
    let any_word = |keys: &[&str]| words.iter().any(|w| keys.contains(w));

    if any_word(PRICING) {
        ContentType::Pricing
    } else if any_word(FEATURES) {
        ContentType::Features
    } else if any_word(COMPETITIVE) {
        ContentType::Competitive
    } else {
        ContentType::General
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tagging::TagDeclaration;
    use crate::types::CompanyRecord;

    fn chunk(text: &str) -> Chunk {
        Chunk { text: text.to_string(), start: 0, end: text.chars().count(), index: 0, total: 1 }
    }

    #[test]
    fn untagged_document_is_unscoped() {
        let index = AliasIndex::default();
        let enricher = MetadataEnricher::new(&index);
        let doc = TaggedDocument { body: "text".to_string(), ..Default::default() };
        assert_eq!(enricher.resolve_company(&doc), CompanyScope::Unscoped);
    }

    #[test]
    fn tagged_document_resolves_through_index() {
        let records = [CompanyRecord {
            primary: "Disney".to_string(),
            aliases: vec!["Disney".to_string(), "ESPN".to_string()],
        }];
        let index = AliasIndex::from_records(&records);
        let enricher = MetadataEnricher::new(&index);
        let doc = TaggedDocument {
            body: String::new(),
            declarations: vec![TagDeclaration { line: 1, aliases: vec!["espn".to_string()] }],
            warnings: Vec::new(),
        };
        assert_eq!(enricher.resolve_company(&doc), CompanyScope::Scoped("Disney".to_string()));
    }

    #[test]
    fn metadata_carries_position_and_word_count() {
        let index = AliasIndex::default();
        let enricher = MetadataEnricher::new(&index);
        let mut c = chunk("Falcon pricing starts at $8.99 per endpoint.");
        c.index = 2;
        c.total = 5;
        let enriched = enricher.enrich(c, "crowdstrike.txt", &CompanyScope::Unscoped);
        assert_eq!(enriched.metadata.source, "crowdstrike.txt");
        assert_eq!(enriched.metadata.chunk_index, 2);
        assert_eq!(enriched.metadata.total_chunks, 5);
        assert_eq!(enriched.metadata.word_count, 7);
        assert_eq!(enriched.metadata.content_type, ContentType::Pricing);
    }

    #[test]
    fn content_type_keywords() {
        assert_eq!(detect_content_type("Licensing is per asset"), ContentType::Pricing);
        assert_eq!(detect_content_type("Key capabilities include EDR"), ContentType::Features);
        assert_eq!(detect_content_type("Tenable vs. Qualys"), ContentType::Competitive);
        assert_eq!(detect_content_type("We offer vulnerability scanning."), ContentType::General);
        assert_eq!(detect_content_type("A canvas of services"), ContentType::General);
    }

    #[test]
    fn content_type_ignores_words_that_only_share_a_prefix() {
        assert_eq!(detect_content_type("A priceless costume for the featurette"), ContentType::General);
        assert_eq!(detect_content_type("Costs are listed per seat"), ContentType::Pricing);
        assert_eq!(detect_content_type("Competitors include Qualys"), ContentType::Competitive);
    }
}
