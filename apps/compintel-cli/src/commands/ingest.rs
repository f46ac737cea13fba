use std::path::PathBuf;

use anyhow::{Context, Result};
use compintel_core::loader::DocumentLoader;
use compintel_core::pipeline::{store_batch, IngestPipeline};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use crate::cli::IngestArgs;
use crate::commands::Workspace;

#[derive(Debug, Default)]
struct Totals {
    documents: usize,
    failed: usize,
    accepted: usize,
    rejected: usize,
    stored: usize,
    removed_documents: usize,
    reassigned_chunks: u64,
    store_failures: usize,
    companies_updated: usize,
}

pub fn run(args: IngestArgs) -> Result<()> {
    let ws = Workspace::load()?;
    let ingest = &ws.settings.ingest;

    let roots: Vec<PathBuf> = if args.roots.is_empty() {
        ingest.roots.iter().map(|r| ws.config.path(r)).collect()
    } else {
        args.roots.clone()
    };
    let mut loader_config = ingest.loader_config();
    if args.limit.is_some() {
        loader_config.limit = args.limit;
    }
    let loader = DocumentLoader::new(loader_config);
    let discovery = loader.discover(&roots);
    let files = discovery.files;
    info!(files = files.len(), unreadable = discovery.failures.len(), roots = ?roots, "discovered input files");

    if args.dry_run {
        for file in &files {
            println!("{}\t{}", file.priority, file.path.display());
        }
        for failure in &discovery.failures {
            println!("!\t{}\t{}", failure.path.display(), failure.error);
        }
        return Ok(());
    }

    let mappings_path = ws.mappings_path();
    let pipeline = IngestPipeline::new(ws.settings.chunking, ws.settings.validation, ws.open_mappings()?)?;
    let store = ws.open_store()?;

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} docs ({percent}%) {msg}")?
            .progress_chars("#>-"),
    );

    let mut totals = Totals::default();
    // Entries the walk could not read are reported alongside the first batch.
    let mut walk_failures = Some(discovery.failures);
    let batches = files.chunks(ingest.batch_docs.max(1));
    let batches: Vec<_> = if files.is_empty() { vec![&files[..]] } else { batches.collect() };
    for batch in batches {
        let mut loaded: Vec<_> = walk_failures.take().unwrap_or_default().into_iter().map(Err).collect();
        loaded.extend(loader.load_all(batch));
        if loaded.is_empty() {
            continue;
        }
        let report = pipeline.process_batch(loaded);
        let stored = store_batch(&store, &report, ingest.store_batch_size);
        pipeline
            .mappings()
            .persist(&mappings_path)
            .with_context(|| format!("failed to persist company mappings to {}", mappings_path.display()))?;

        totals.documents += report.documents.len();
        totals.failed += report.failed_count();
        totals.accepted += report.accepted_count();
        totals.rejected += report.rejection_count();
        totals.stored += stored.stored;
        totals.removed_documents += stored.removed_documents;
        totals.reassigned_chunks += stored.reassigned_chunks;
        totals.store_failures += stored.failures.len();
        totals.companies_updated += report.updated_companies().len();

        pb.inc(batch.len() as u64);
        pb.set_message(format!("{} chunks", totals.stored));
    }
    pb.finish_and_clear();

    if totals.failed > 0 || totals.store_failures > 0 {
        warn!(failed_documents = totals.failed, store_failures = totals.store_failures, "ingest finished with failures");
    }
    info!(
        documents = totals.documents,
        accepted = totals.accepted,
        rejected = totals.rejected,
        stored = totals.stored,
        replaced_documents = totals.removed_documents,
        reassigned_chunks = totals.reassigned_chunks,
        companies_updated = totals.companies_updated,
        "ingest finished"
    );
    println!(
        "documents: {}  failed: {}  chunks accepted: {}  rejected: {}  stored: {}  store failures: {}",
        totals.documents, totals.failed, totals.accepted, totals.rejected, totals.stored, totals.store_failures
    );
    Ok(())
}
