//! Query-time company scoping.
//!
//! A caller may name a company by any alias. The alias is resolved to its
//! primary before any backend is asked to filter, so filters only ever see
//! primary names.

use tracing::{debug, warn};

use crate::resolver::AliasIndex;
use crate::traits::TextIndexer;
use crate::types::SearchHit;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompanyFilter {
    /// No company given: search everything.
    All,
    /// Only chunks scoped to this primary company.
    Company(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeResolution {
    Filter(CompanyFilter),
    /// A scope was given but no company is known by that name.
    Unknown(String),
}

pub fn resolve_scope(index: &AliasIndex, scope: Option<&str>) -> ScopeResolution {
    match scope.map(str::trim).filter(|s| !s.is_empty()) {
        None => ScopeResolution::Filter(CompanyFilter::All),
        Some(name) => match index.resolve(name) {
            Some(primary) => ScopeResolution::Filter(CompanyFilter::Company(primary.to_string())),
            None => ScopeResolution::Unknown(name.to_string()),
        },
    }
}

#[derive(Debug, Clone)]
pub enum ScopedSearch {
    Hits { filter: CompanyFilter, hits: Vec<SearchHit> },
    UnknownCompany(String),
}

/// Resolves `scope` and runs the query against `backend`.
///
/// An unknown company yields [`ScopedSearch::UnknownCompany`] without
/// querying, rather than widening to all companies.
pub fn scoped_search(
    backend: &dyn TextIndexer,
    index: &AliasIndex,
    query: &str,
    scope: Option<&str>,
    k: usize,
) -> anyhow::Result<ScopedSearch> {
    match resolve_scope(index, scope) {
        ScopeResolution::Unknown(name) => {
            warn!(company = %name, "unknown company scope, not searching");
            Ok(ScopedSearch::UnknownCompany(name))
        }
        ScopeResolution::Filter(filter) => {
            let hits = backend.search(query, &filter, k)?;
            debug!(filter = ?filter, hits = hits.len(), "scoped search finished");
            Ok(ScopedSearch::Hits { filter, hits })
        }
    }
}
