//! SQL plumbing shared by the keyword and semantic engines

use super::outcome::ResultItem;
use crate::error::Result;
use crate::identity::{EntityFilter, NameMemo};
use crate::storage::Database;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Row};

/// Chunk provenance columns, in the order [`ChunkRow::from_row`] reads them
pub(crate) const CHUNK_COLUMNS: &str = "CAST(c.chunk_id AS TEXT), CAST(d.doc_id AS TEXT), CAST(d.cik AS TEXT), d.filename, \
     s.section_name, c.chunk_text, c.char_count";

/// Joins from a chunk to its section and parent document
pub(crate) const CHUNK_JOINS: &str = "JOIN sections s ON s.section_id = c.section_id \
     JOIN documents d ON d.doc_id = c.doc_id";

/// One joined chunk row plus the engine's raw score column
#[derive(Debug)]
pub(crate) struct ChunkRow {
    pub chunk_id: String,
    pub doc_id: String,
    pub cik: String,
    pub filename: String,
    pub section_name: String,
    pub chunk_text: String,
    pub char_count: i64,
    pub raw: Option<f64>,
}

impl ChunkRow {
    /// Read [`CHUNK_COLUMNS`] followed by one nullable numeric column
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            chunk_id: row.get(0)?,
            doc_id: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
            cik: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
            filename: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
            section_name: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
            chunk_text: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
            char_count: row.get::<_, Option<i64>>(6)?.unwrap_or(0),
            raw: row.get(7)?,
        })
    }

    /// Build a result item with provenance only; scores are set by the engine
    pub fn into_item(self, names: &mut NameMemo<'_>) -> ResultItem {
        let company_name = names.get(&self.cik);
        ResultItem {
            chunk_id: self.chunk_id,
            doc_id: self.doc_id,
            cik: self.cik,
            company_name,
            filename: self.filename,
            section_name: self.section_name,
            chunk_text: self.chunk_text,
            char_count: self.char_count.max(0) as usize,
            keyword_score: None,
            semantic_score: None,
            distance: None,
            fused_score: None,
        }
    }
}

/// Run a chunk query and collect its rows.
///
/// The pooled connection is released before returning, so callers may
/// resolve company names from the same pool while building items.
pub(crate) fn query_rows(database: &Database, sql: &str, params: &[Value]) -> Result<Vec<ChunkRow>> {
    let conn = database.get_conn()?;
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params_from_iter(params.iter()), ChunkRow::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

/// Append one `IN (...)` condition per filter clause
pub(crate) fn push_entity_clauses(
    filter: &EntityFilter,
    conditions: &mut Vec<String>,
    params: &mut Vec<Value>,
) {
    for ciks in filter.clauses() {
        let placeholders = vec!["?"; ciks.len()].join(",");
        conditions.push(format!("CAST(d.cik AS TEXT) IN ({})", placeholders));
        params.extend(ciks.iter().cloned().map(Value::Text));
    }
}

/// Render `conditions` as an ` AND `-joined suffix (empty when none)
pub(crate) fn and_clauses(conditions: &[String]) -> String {
    if conditions.is_empty() {
        String::new()
    } else {
        format!(" AND {}", conditions.join(" AND "))
    }
}
