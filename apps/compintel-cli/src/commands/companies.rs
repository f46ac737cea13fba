use std::collections::HashMap;

use anyhow::{bail, Result};
use compintel_core::mapping::SharedMappingStore;

use crate::cli::CompaniesArgs;
use crate::commands::Workspace;

pub fn run(args: CompaniesArgs) -> Result<()> {
    let ws = Workspace::load()?;
    let mappings = ws.open_mappings()?;

    if let Some(alias) = &args.summary {
        return summary(&ws, &mappings, alias);
    }

    let records = mappings.records();
    let counts: HashMap<String, u64> = if args.counts {
        ws.open_store()?.company_counts()?.into_iter().collect()
    } else {
        HashMap::new()
    };

    for record in &records {
        let aliases = record.aliases.join(", ");
        if args.counts {
            let chunks = counts.get(&record.primary).copied().unwrap_or(0);
            println!("{}\t{}\t{}", record.primary, chunks, aliases);
        } else {
            println!("{}\t{}", record.primary, aliases);
        }
    }
    if records.is_empty() {
        println!("no companies recorded yet");
    }
    Ok(())
}

fn summary(ws: &Workspace, mappings: &SharedMappingStore, alias: &str) -> Result<()> {
    let Some(primary) = mappings.resolve(alias) else {
        bail!("no company is known by '{}'", alias.trim());
    };
    let summary = ws.open_store()?.company_summary(&primary)?;
    println!("{}: {} chunks", summary.primary, summary.chunks);
    for (content_type, count) in &summary.content_types {
        println!("  {}: {}", content_type.as_str(), count);
    }
    println!("sources ({}):", summary.sources.len());
    for source in &summary.sources {
        println!("  {source}");
    }
    Ok(())
}
