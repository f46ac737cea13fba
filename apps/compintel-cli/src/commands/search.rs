use anyhow::{bail, Result};
use compintel_core::query::{scoped_search, ScopedSearch};

use crate::cli::SearchArgs;
use crate::commands::Workspace;

pub fn run(args: SearchArgs) -> Result<()> {
    let ws = Workspace::load()?;
    let index = ws.open_mappings()?.snapshot();
    let store = ws.open_store()?;

    match scoped_search(&store, &index, &args.query, args.company.as_deref(), args.k)? {
        ScopedSearch::UnknownCompany(name) => bail!("no company is known by '{name}'"),
        ScopedSearch::Hits { filter, hits } => {
            println!("{} hits ({:?})", hits.len(), filter);
            for (rank, hit) in hits.iter().enumerate() {
                let company = hit.company.as_deref().unwrap_or("-");
                println!("{:>2}. [{:.3}] {} ({}, {})", rank + 1, hit.score, hit.id, hit.source, company);
                println!("    {}", hit.snippet.replace('\n', " "));
            }
        }
    }
    Ok(())
}
