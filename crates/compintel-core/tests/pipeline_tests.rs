use compintel_core::chunker::ChunkingConfig;
use compintel_core::loader::{DocumentFailure, SourceDocument};
use compintel_core::mapping::{MappingStore, SharedMappingStore};
use compintel_core::pipeline::{store_batch, store_in_batches, DocumentReport, IngestPipeline, StoreOp};
use compintel_core::traits::ChunkSink;
use compintel_core::types::{CompanyFold, CompanyScope, DocumentChunk};
use compintel_core::validate::{RejectReason, ValidationConfig};
use parking_lot::Mutex;
use std::path::PathBuf;

fn pipeline(chunk_size: usize, overlap: usize) -> IngestPipeline {
    let chunking = ChunkingConfig { chunk_size, overlap, min_chunk_length: 50.min(chunk_size) };
    IngestPipeline::new(chunking, ValidationConfig::default(), SharedMappingStore::default()).expect("pipeline")
}

#[test]
fn tagged_document_end_to_end() {
    let p = pipeline(512, 64);
    let doc = SourceDocument::from_text("doc1", "Company_Names: Tenable,Tenable.com\nWe offer vulnerability scanning.");
    let outcome = p.process_document(&doc);

    assert_eq!(outcome.company, CompanyScope::Scoped("Tenable".to_string()));
    assert!(outcome.rejected.is_empty());
    assert_eq!(outcome.accepted.len(), 1);
    let chunk = &outcome.accepted[0];
    assert_eq!(chunk.content, "We offer vulnerability scanning.");
    assert_eq!(chunk.id, "doc1#0");
    assert_eq!(chunk.metadata.source, "doc1");
    assert_eq!(chunk.metadata.chunk_index, 0);
    assert_eq!(chunk.metadata.total_chunks, 1);
    assert_eq!(chunk.metadata.word_count, 4);
    assert_eq!(chunk.metadata.company.company(), Some("Tenable"));

    for alias in ["tenable.com", "TENABLE.COM", "  Tenable.Com "] {
        assert_eq!(p.mappings().resolve(alias).as_deref(), Some("Tenable"));
    }
    assert_eq!(outcome.updated_companies.len(), 1);
}

#[test]
fn alias_sets_union_across_documents() {
    let p = pipeline(512, 64);
    let docs = vec![
        Ok(SourceDocument::from_text("disney.txt", "Company_Names: Disney,ESPN\nStreaming and parks business overview.")),
        Ok(SourceDocument::from_text("pixar.txt", "Company_Names: ESPN,Pixar,Marvel\nAnimation studio pipeline notes.")),
    ];
    let report = p.process_batch(docs);

    let marvel = p.mappings().resolve("Marvel").expect("marvel");
    let disney = p.mappings().resolve("disney").expect("disney");
    assert_eq!(marvel, disney);

    let records = p.mappings().records();
    assert_eq!(records.len(), 1);
    let mut aliases = records[0].aliases.clone();
    aliases.sort();
    assert_eq!(aliases, vec!["Disney", "ESPN", "Marvel", "Pixar"]);

    for outcome in report.outcomes() {
        assert_eq!(outcome.company, CompanyScope::Scoped(marvel.clone()));
    }
    let updated = report.updated_companies();
    assert_eq!(updated.len(), 1);
    assert_eq!(updated[0].aliases.len(), 4);
}

#[test]
fn untagged_document_is_unscoped_and_accepted() {
    let p = pipeline(512, 64);
    let outcome = p.process_document(&SourceDocument::from_text("notes.txt", "General market notes without any tags."));
    assert_eq!(outcome.company, CompanyScope::Unscoped);
    assert_eq!(outcome.accepted.len(), 1);
    assert!(outcome.accepted[0].metadata.company.company().is_none());
    assert!(outcome.updated_companies.is_empty());
}

#[test]
fn short_and_blank_bodies_are_rejected_not_dropped() {
    let p = pipeline(512, 64);
    let docs = vec![
        Ok(SourceDocument::from_text("tiny.txt", "Company_Names: Rapid7\nok")),
        Ok(SourceDocument::from_text("blank.txt", "Company_Names: Qualys\n   \n  ")),
        Ok(SourceDocument::from_text("tag-only.txt", "Company_Names: Snyk")),
    ];
    let report = p.process_batch(docs);

    assert_eq!(report.accepted_count(), 0);
    assert_eq!(report.rejection_count(), 2);
    for rejection in report.rejections() {
        assert!(matches!(rejection.reason, RejectReason::TooShort { .. }), "{rejection:?}");
    }
    // Tag-only document has no body, so no chunk is produced at all.
    let tag_only = report.outcomes().find(|o| o.doc_id == "tag-only.txt").expect("outcome");
    assert!(tag_only.accepted.is_empty() && tag_only.rejected.is_empty());
    assert_eq!(p.mappings().resolve("snyk").as_deref(), Some("Snyk"));
}

#[test]
fn malformed_tag_line_is_reported_and_skipped() {
    let p = pipeline(512, 64);
    let outcome = p.process_document(&SourceDocument::from_text("odd.txt", "Company_Names: ,\nBody text that is long enough."));
    assert_eq!(outcome.tag_warnings.len(), 1);
    assert_eq!(outcome.company, CompanyScope::Unscoped);
    assert_eq!(outcome.accepted[0].content, "Body text that is long enough.");
}

#[test]
fn long_document_chunks_carry_positions() {
    let p = pipeline(120, 20);
    let body: String = "CrowdStrike Falcon is a cloud-native endpoint protection platform. ".repeat(10);
    let text = format!("Company_Names: CrowdStrike,Falcon\n{body}");
    let outcome = p.process_document(&SourceDocument::from_text("cs.txt", text));

    let total = outcome.accepted.len();
    assert!(total > 1);
    for (i, chunk) in outcome.accepted.iter().enumerate() {
        assert_eq!(chunk.metadata.chunk_index, i);
        assert_eq!(chunk.metadata.total_chunks, total);
        assert_eq!(chunk.id, format!("cs.txt#{i}"));
        assert_eq!(chunk.metadata.company.company(), Some("CrowdStrike"));
        assert!(!chunk.content.contains("Company_Names"));
    }
}

#[test]
fn failed_loads_are_reported_per_item() {
    let p = pipeline(512, 64);
    let docs = vec![
        Err(DocumentFailure { path: PathBuf::from("missing.txt"), error: "not found".to_string() }),
        Ok(SourceDocument::from_text("ok.txt", "A perfectly readable document body.")),
    ];
    let report = p.process_batch(docs);
    assert_eq!(report.documents.len(), 2);
    assert!(matches!(report.documents[0], DocumentReport::Failed(_)));
    assert!(matches!(report.documents[1], DocumentReport::Processed(_)));
    assert_eq!(report.failed_count(), 1);
    assert_eq!(report.accepted_count(), 1);
}

#[test]
fn batch_result_does_not_depend_on_thread_order() {
    let texts = [
        "Company_Names: Palo Alto Networks,PANW\nFirewall platform overview text.",
        "Company_Names: PANW,Prisma Cloud\nCloud security posture notes here.",
        "Company_Names: Cortex,Prisma Cloud\nSecurity operations platform notes.",
    ];
    for _ in 0..5 {
        let p = pipeline(512, 64);
        let docs = texts.iter().enumerate().map(|(i, t)| Ok(SourceDocument::from_text(format!("d{i}"), *t))).collect();
        p.process_batch(docs);
        let records = p.mappings().records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].primary, "Palo Alto Networks");
        assert_eq!(records[0].aliases, vec!["Palo Alto Networks", "PANW", "Prisma Cloud", "Cortex"]);
    }
}

#[test]
fn mappings_survive_a_restart() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let path = tmp.path().join("company_mappings.json");

    let first = pipeline(512, 64);
    first.process_document(&SourceDocument::from_text("a.txt", "Company_Names: Disney,ESPN\nFirst run body text."));
    first.mappings().persist(&path).expect("persist");

    let store = SharedMappingStore::new(MappingStore::load(&path).expect("load"));
    let second = IngestPipeline::new(ChunkingConfig::default(), ValidationConfig::default(), store).expect("pipeline");
    let outcome = second.process_document(&SourceDocument::from_text("b.txt", "Company_Names: ESPN,Pixar\nSecond run body text."));
    assert_eq!(outcome.company, CompanyScope::Scoped("Disney".to_string()));
    assert_eq!(second.mappings().records().len(), 1);
}

#[derive(Default)]
struct FlakySink {
    stored: Mutex<Vec<DocumentChunk>>,
    poison: String,
}

impl ChunkSink for FlakySink {
    fn store(&self, chunks: &[DocumentChunk]) -> anyhow::Result<()> {
        if chunks.iter().any(|c| c.id == self.poison) {
            anyhow::bail!("refusing {}", self.poison);
        }
        self.stored.lock().extend_from_slice(chunks);
        Ok(())
    }

    fn remove_documents(&self, doc_ids: &[String]) -> anyhow::Result<()> {
        self.stored.lock().retain(|c| !doc_ids.contains(&c.doc_id));
        Ok(())
    }

    fn reassign_company(&self, _fold: &CompanyFold) -> anyhow::Result<u64> {
        Ok(0)
    }
}

#[test]
fn store_retries_failed_batch_item_by_item() {
    let p = pipeline(60, 10);
    let body = "Endpoint detection and response with managed threat hunting. ".repeat(8);
    let outcome = p.process_document(&SourceDocument::from_text("edr.txt", body));
    assert!(outcome.accepted.len() >= 4);

    let sink = FlakySink { poison: "edr.txt#1".to_string(), ..FlakySink::default() };
    let report = store_in_batches(&sink, &outcome.accepted, 3);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].id, "edr.txt#1");
    assert_eq!(report.stored, outcome.accepted.len() - 1);
    assert_eq!(sink.stored.lock().len(), outcome.accepted.len() - 1);
}

/// Keeps chunks in memory and records every call, in order.
#[derive(Default)]
struct RecordingSink {
    chunks: Mutex<Vec<DocumentChunk>>,
    calls: Mutex<Vec<String>>,
    fail_removal_of: Option<String>,
}

impl ChunkSink for RecordingSink {
    fn store(&self, chunks: &[DocumentChunk]) -> anyhow::Result<()> {
        self.calls.lock().push(format!("store {}", chunks.len()));
        self.chunks.lock().extend_from_slice(chunks);
        Ok(())
    }

    fn remove_documents(&self, doc_ids: &[String]) -> anyhow::Result<()> {
        if let Some(bad) = &self.fail_removal_of {
            if doc_ids.contains(bad) {
                anyhow::bail!("cannot remove {bad}");
            }
        }
        self.calls.lock().push(format!("remove {}", doc_ids.join(",")));
        self.chunks.lock().retain(|c| !doc_ids.contains(&c.doc_id));
        Ok(())
    }

    fn reassign_company(&self, fold: &CompanyFold) -> anyhow::Result<u64> {
        self.calls.lock().push(format!("reassign {} -> {}", fold.from, fold.into));
        let mut moved = 0;
        for chunk in self.chunks.lock().iter_mut() {
            if chunk.metadata.company.company() == Some(fold.from.as_str()) {
                chunk.metadata.company = CompanyScope::Scoped(fold.into.clone());
                moved += 1;
            }
        }
        Ok(moved)
    }
}

#[test]
fn store_batch_moves_chunks_of_folded_companies() {
    let p = pipeline(512, 64);
    let sink = RecordingSink::default();
    let batches = [
        ("pixar.txt", "Company_Names: Pixar,Lucasfilm\nAnimated feature production notes."),
        ("disney.txt", "Company_Names: Disney,ESPN\nTheme parks and sports media notes."),
        ("espn-lucas.txt", "Company_Names: ESPN,Lucasfilm\nJoint streaming bundle announcement."),
    ];
    let mut last = None;
    for (name, text) in batches {
        let report = p.process_batch(vec![Ok(SourceDocument::from_text(name, text))]);
        let stored = store_batch(&sink, &report, 50);
        assert!(stored.failures.is_empty());
        last = Some((report, stored));
    }

    let (report, stored) = last.expect("last batch");
    let folds: Vec<&CompanyFold> = report.folds().collect();
    assert_eq!(folds, vec![&CompanyFold { from: "Pixar".to_string(), into: "Disney".to_string() }]);
    assert_eq!(stored.reassigned_chunks, 1);
    assert!(report.updated_companies().iter().all(|r| r.primary != "Pixar"));

    let chunks = sink.chunks.lock();
    assert_eq!(chunks.len(), 3);
    assert!(chunks.iter().all(|c| c.metadata.company.company() == Some("Disney")), "{chunks:?}");
    let calls = sink.calls.lock();
    assert_eq!(calls[calls.len() - 3..], ["reassign Pixar -> Disney", "remove espn-lucas.txt", "store 1"]);
}

#[test]
fn store_batch_clears_documents_that_now_yield_nothing() {
    let p = pipeline(512, 64);
    let sink = RecordingSink::default();
    let first = p.process_batch(vec![Ok(SourceDocument::from_text("a.txt", "Company_Names: Tenable\nVulnerability scanning notes."))]);
    store_batch(&sink, &first, 50);
    assert_eq!(sink.chunks.lock().len(), 1);

    let second = p.process_batch(vec![Ok(SourceDocument::from_text("a.txt", "Company_Names: Qualys\n"))]);
    assert_eq!(second.accepted_count(), 0);
    let stored = store_batch(&sink, &second, 50);
    assert_eq!(stored.removed_documents, 1);
    assert!(sink.chunks.lock().is_empty());
}

#[test]
fn failed_loads_keep_their_stored_chunks() {
    let p = pipeline(512, 64);
    let sink = RecordingSink::default();
    let first = p.process_batch(vec![Ok(SourceDocument::from_text("a.txt", "Readable the first time around."))]);
    store_batch(&sink, &first, 50);

    let second = p.process_batch(vec![Err(DocumentFailure { path: PathBuf::from("a.txt"), error: "gone".to_string() })]);
    let stored = store_batch(&sink, &second, 50);
    assert_eq!(stored.removed_documents, 0);
    assert_eq!(sink.chunks.lock().len(), 1);
}

#[test]
fn removal_failure_is_reported_per_document() {
    let p = pipeline(512, 64);
    let sink = RecordingSink { fail_removal_of: Some("bad.txt".to_string()), ..RecordingSink::default() };
    let report = p.process_batch(vec![
        Ok(SourceDocument::from_text("good.txt", "Good document body text.")),
        Ok(SourceDocument::from_text("bad.txt", "Another document body text.")),
    ]);
    let stored = store_batch(&sink, &report, 50);
    assert_eq!(stored.removed_documents, 1);
    assert_eq!(stored.failures.len(), 1);
    assert_eq!(stored.failures[0].op, StoreOp::RemoveDocument);
    assert_eq!(stored.failures[0].id, "bad.txt");
    assert_eq!(stored.stored, 2);
}
