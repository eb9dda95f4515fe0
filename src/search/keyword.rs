//! Keyword search over the FTS5 chunk index, ranked by BM25
//!
//! FTS5's `bm25()` is lower-is-better, so scores are negated to make higher
//! mean more relevant. When the index is missing the engine falls back to
//! unscored case-insensitive substring matching.

use super::outcome::{DegradeReason, ResultItem, ResultSet, SearchOutcome};
use super::query::KeywordQuery;
use super::rows::{and_clauses, push_entity_clauses, query_rows, CHUNK_COLUMNS, CHUNK_JOINS};
use crate::error::Result;
use crate::identity::{EntityFilter, FilterResolution, IdentityResolver};
use crate::storage::Database;
use rusqlite::types::Value;
use std::sync::Arc;

/// FTS5 table indexing `chunks.chunk_text`
pub const FTS_TABLE: &str = "chunks_fts";

/// Quote each token and join with OR, dropping FTS5 operator characters
///
/// Disjunctive matching lets any query term contribute, as BM25 ranking
/// expects.
pub fn sanitize_fts_query(query: &str) -> String {
    let tokens: Vec<String> = query
        .split_whitespace()
        .filter_map(|token| {
            let clean: String = token
                .chars()
                .filter(|c| {
                    !matches!(
                        c,
                        '*' | '"' | '(' | ')' | '{' | '}' | '[' | ']' | '^' | '~' | ':'
                    )
                })
                .collect();
            if clean.is_empty() {
                None
            } else {
                Some(format!("\"{}\"", clean))
            }
        })
        .collect();

    tokens.join(" OR ")
}

/// Keyword search engine
pub struct KeywordEngine {
    database: Arc<Database>,
    resolver: Arc<IdentityResolver>,
    available: bool,
}

impl KeywordEngine {
    /// Create the engine, probing the lexical scoring function once
    pub fn new(database: Arc<Database>, resolver: Arc<IdentityResolver>) -> Self {
        let available = match Self::probe_lexical_scoring(&database) {
            Ok(()) => {
                tracing::info!("Keyword engine initialized with BM25 scoring");
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "BM25 scoring unavailable, falling back to substring search");
                false
            }
        };

        Self {
            database,
            resolver,
            available,
        }
    }

    fn probe_lexical_scoring(database: &Database) -> Result<()> {
        let conn = database.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT -bm25({t}) FROM {t} WHERE {t} MATCH '\"test\"' LIMIT 1",
            t = FTS_TABLE
        ))?;
        let mut rows = stmt.query([])?;
        rows.next()?;
        Ok(())
    }

    /// Whether BM25 scoring is available (fixed at construction)
    pub fn is_available(&self) -> bool {
        self.available
    }

    /// Run a keyword search
    pub fn search(&self, query: &KeywordQuery) -> SearchOutcome {
        if let Err(e) = query.validate() {
            return SearchOutcome::Failed(e);
        }

        let filter = match self
            .resolver
            .resolve_filter(query.base.tickers.as_deref(), query.base.ciks.as_deref())
        {
            Ok(FilterResolution::Filter(filter)) => filter,
            Ok(FilterResolution::Unresolved(tickers)) => {
                tracing::debug!(?tickers, "Ticker filter matched nothing");
                return SearchOutcome::Degraded(
                    ResultSet::empty(),
                    DegradeReason::UnresolvedTickers(tickers),
                );
            }
            Err(e) => {
                tracing::error!(error = %e, "Keyword search filter resolution failed");
                return SearchOutcome::Failed(e);
            }
        };

        self.search_filtered(query, &filter)
    }

    /// Run a keyword search with an already-resolved entity filter
    pub(crate) fn search_filtered(&self, query: &KeywordQuery, filter: &EntityFilter) -> SearchOutcome {
        if self.available {
            match self.search_bm25(query, filter) {
                Ok(items) => {
                    tracing::debug!(query = %query.base.query, results = items.len(), "Keyword search complete");
                    SearchOutcome::Ok(ResultSet::new(items))
                }
                Err(e) => {
                    tracing::error!(error = %e, "Keyword search failed");
                    SearchOutcome::Failed(e)
                }
            }
        } else {
            match self.search_substring(query, filter) {
                Ok(items) => {
                    tracing::debug!(query = %query.base.query, results = items.len(), "Substring search complete");
                    SearchOutcome::Degraded(ResultSet::new(items), DegradeReason::SubstringFallback)
                }
                Err(e) => {
                    tracing::error!(error = %e, "Substring search failed");
                    SearchOutcome::Failed(e)
                }
            }
        }
    }

    fn search_bm25(&self, query: &KeywordQuery, filter: &EntityFilter) -> Result<Vec<ResultItem>> {
        let match_expr = sanitize_fts_query(&query.base.query);
        if match_expr.is_empty() {
            return Ok(Vec::new());
        }

        let mut conditions = Vec::new();
        let mut params = vec![Value::Text(match_expr)];
        push_entity_clauses(filter, &mut conditions, &mut params);
        params.push(Value::Integer(query.base.limit as i64));

        // One scoring pass over the index; ties keep corpus order.
        let sql = format!(
            "SELECT {cols}, -bm25({t}) AS score
             FROM {t}
             JOIN chunks c ON c.chunk_id = {t}.chunk_id
             {joins}
             WHERE {t} MATCH ?{filters}
             ORDER BY score DESC, c.rowid ASC
             LIMIT ?",
            cols = CHUNK_COLUMNS,
            t = FTS_TABLE,
            joins = CHUNK_JOINS,
            filters = and_clauses(&conditions),
        );

        let rows = query_rows(&self.database, &sql, &params)?;
        let mut names = self.resolver.name_memo();

        // Rows arrive score-descending, so the threshold keeps a prefix.
        let items = rows
            .into_iter()
            .filter_map(|row| {
                let score = row.raw.filter(|s| s.is_finite())?;
                if query.min_score.is_some_and(|min| score < min) {
                    return None;
                }
                let mut item = row.into_item(&mut names);
                item.keyword_score = Some(score);
                Some(item)
            })
            .collect();

        Ok(items)
    }

    fn search_substring(
        &self,
        query: &KeywordQuery,
        filter: &EntityFilter,
    ) -> Result<Vec<ResultItem>> {
        let mut conditions = Vec::new();
        let mut params = vec![Value::Text(query.base.query.clone())];
        push_entity_clauses(filter, &mut conditions, &mut params);
        params.push(Value::Integer(query.base.limit as i64));

        let sql = format!(
            "SELECT {cols}, NULL AS score
             FROM chunks c
             {joins}
             WHERE instr(lower(c.chunk_text), lower(?)) > 0{filters}
             ORDER BY c.rowid ASC
             LIMIT ?",
            cols = CHUNK_COLUMNS,
            joins = CHUNK_JOINS,
            filters = and_clauses(&conditions),
        );

        let rows = query_rows(&self.database, &sql, &params)?;
        let mut names = self.resolver.name_memo();
        Ok(rows
            .into_iter()
            .map(|row| row.into_item(&mut names))
            .collect())
    }
}
