use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "compintel",
    version,
    about = "Company-tagged ingestion and scoped keyword search"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Tag, chunk, validate and index documents.
    Ingest(IngestArgs),
    /// Print the primary company for an alias.
    Resolve(ResolveArgs),
    /// List known companies and their aliases.
    Companies(CompaniesArgs),
    /// Keyword search, optionally scoped to one company.
    Search(SearchArgs),
}

#[derive(Args, Debug, Clone)]
pub struct IngestArgs {
    /// Input roots; defaults to `ingest.roots` from the config.
    pub roots: Vec<PathBuf>,

    #[arg(long)]
    pub limit: Option<usize>,

    /// List the files that would be ingested and exit.
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ResolveArgs {
    pub alias: String,
}

#[derive(Args, Debug, Clone)]
pub struct CompaniesArgs {
    /// Also show how many indexed chunks each company has.
    #[arg(long, default_value_t = false)]
    pub counts: bool,

    /// Content types and source files of one company, by primary or alias.
    #[arg(long, value_name = "ALIAS", conflicts_with = "counts")]
    pub summary: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct SearchArgs {
    pub query: String,

    /// Primary name or any alias.
    #[arg(long)]
    pub company: Option<String>,

    #[arg(short, long, default_value_t = 10)]
    pub k: usize,
}
