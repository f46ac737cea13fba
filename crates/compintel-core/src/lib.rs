#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

//! compintel-core
//!
//! Company tagging and chunk-metadata pipeline for competitive-intelligence
//! ingestion: tag parsing, alias resolution, chunking, enrichment and
//! validation, plus the configuration and loader around them.

pub mod chunker;
pub mod config;
pub mod enrich;
pub mod error;
pub mod loader;
pub mod mapping;
pub mod pipeline;
pub mod query;
pub mod resolver;
pub mod tagging;
pub mod traits;
pub mod types;
pub mod validate;
