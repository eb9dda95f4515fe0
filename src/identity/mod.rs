//! Ticker and CIK resolution against the company catalog
//!
//! Tickers map to CIKs case-insensitively. Display names are enrichment
//! only, so their lookup failures are logged and swallowed.

use crate::error::Result;
use crate::storage::Database;
use ahash::AHashMap;
use rusqlite::{params_from_iter, OptionalExtension};
use std::sync::Arc;

/// Identifier filter for one request, after ticker resolution
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityFilter {
    /// CIKs resolved from the request's tickers
    pub ticker_ciks: Option<Vec<String>>,
    /// CIKs supplied directly by the request
    pub ciks: Option<Vec<String>>,
}

impl EntityFilter {
    /// Every clause must hold; each clause is an `IN` list
    pub fn clauses(&self) -> impl Iterator<Item = &[String]> {
        self.ticker_ciks
            .as_deref()
            .into_iter()
            .chain(self.ciks.as_deref())
    }

    pub fn is_unfiltered(&self) -> bool {
        self.ticker_ciks.is_none() && self.ciks.is_none()
    }
}

/// Result of resolving a request's entity filters
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterResolution {
    /// Filter to apply (possibly unfiltered)
    Filter(EntityFilter),
    /// Tickers were given but none matched; the request must yield nothing
    Unresolved(Vec<String>),
}

/// Maps tickers to CIKs and CIKs to company names
pub struct IdentityResolver {
    database: Arc<Database>,
}

impl IdentityResolver {
    pub fn new(database: Arc<Database>) -> Self {
        Self { database }
    }

    /// Resolve ticker symbols to distinct CIKs, in catalog order
    ///
    /// Unknown tickers are dropped. An empty result means the filter matches
    /// nothing; callers must not fall back to an unfiltered query.
    pub fn resolve_identifiers(&self, tickers: &[String]) -> Result<Vec<String>> {
        let upper: Vec<String> = tickers
            .iter()
            .map(|t| t.trim().to_uppercase())
            .filter(|t| !t.is_empty())
            .collect();
        if upper.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; upper.len()].join(",");
        let sql = format!(
            "SELECT CAST(cik AS TEXT) AS cik, MIN(rowid) AS first_seen
             FROM company_tickers_exchange
             WHERE UPPER(ticker) IN ({})
             GROUP BY CAST(cik AS TEXT)
             ORDER BY first_seen",
            placeholders
        );

        let conn = self.database.get_conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let ciks = stmt
            .query_map(params_from_iter(upper.iter()), |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        tracing::debug!(?tickers, ?ciks, "Resolved ticker filter");
        Ok(ciks)
    }

    /// Resolve the request's ticker and CIK filters into one [`EntityFilter`]
    pub fn resolve_filter(
        &self,
        tickers: Option<&[String]>,
        ciks: Option<&[String]>,
    ) -> Result<FilterResolution> {
        let ticker_ciks = match tickers {
            Some(tickers) if !tickers.is_empty() => {
                let resolved = self.resolve_identifiers(tickers)?;
                if resolved.is_empty() {
                    return Ok(FilterResolution::Unresolved(tickers.to_vec()));
                }
                Some(resolved)
            }
            _ => None,
        };

        let ciks = ciks
            .filter(|c| !c.is_empty())
            .map(|c| c.iter().map(|cik| cik.trim().to_string()).collect());

        Ok(FilterResolution::Filter(EntityFilter { ticker_ciks, ciks }))
    }

    /// Company display name for a CIK, or `None` if unknown or the lookup fails
    pub fn resolve_display_name(&self, cik: &str) -> Option<String> {
        if cik.is_empty() {
            return None;
        }

        let lookup = || -> Result<Option<String>> {
            let conn = self.database.get_conn()?;
            let name = conn
                .query_row(
                    "SELECT name FROM company_tickers_exchange
                     WHERE CAST(cik AS TEXT) = ?1
                     ORDER BY rowid LIMIT 1",
                    [cik],
                    |row| row.get::<_, Option<String>>(0),
                )
                .optional()?;
            Ok(name.flatten())
        };

        lookup().unwrap_or_else(|e| {
            tracing::debug!(cik, error = %e, "Display name lookup failed");
            None
        })
    }

    /// Request-scoped name memo, so a result page resolves each CIK once
    pub fn name_memo(&self) -> NameMemo<'_> {
        NameMemo {
            resolver: self,
            names: AHashMap::new(),
        }
    }
}

/// Display-name lookups memoized for the lifetime of one request
pub struct NameMemo<'a> {
    resolver: &'a IdentityResolver,
    names: AHashMap<String, Option<String>>,
}

impl NameMemo<'_> {
    pub fn get(&mut self, cik: &str) -> Option<String> {
        if let Some(name) = self.names.get(cik) {
            return name.clone();
        }
        let name = self.resolver.resolve_display_name(cik);
        self.names.insert(cik.to_string(), name.clone());
        name
    }
}
