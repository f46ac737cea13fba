//! compintel-text
//!
//! Tantivy keyword store for accepted chunks. Stores chunk text with its
//! metadata, answers company-filtered queries and counts chunks per company.

pub mod index;
pub mod search;
pub mod tantivy_utils;

pub use index::TantivyStore;
pub use search::CompanySummary;
