//! Semantic search: embed the query, then rank stored vectors by cosine distance
//!
//! Three independent preconditions gate the engine: the store's distance
//! function, at least one stored vector, and an embedding provider. Each is
//! probed once at construction and reported separately.

use super::outcome::{DegradeReason, Precondition, ResultItem, ResultSet, SearchOutcome};
use super::query::SemanticQuery;
use super::rows::{and_clauses, push_entity_clauses, query_rows, CHUNK_COLUMNS, CHUNK_JOINS};
use crate::embedding::{encode_vector, EmbeddingProvider, DISTANCE_FUNCTION};
use crate::error::Result;
use crate::identity::{EntityFilter, FilterResolution, IdentityResolver};
use crate::storage::Database;
use rusqlite::types::Value;
use serde_json::json;
use std::sync::Arc;

/// Similarity for a bounded distance where 0 means identical; never negative
pub fn similarity_from_distance(distance: f64) -> f64 {
    (1.0 - distance).max(0.0)
}

/// Availability of each semantic-search precondition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SemanticAvailability {
    pub distance_function: bool,
    pub stored_vectors: bool,
    pub embedding_provider: bool,
}

impl SemanticAvailability {
    pub fn is_available(&self) -> bool {
        self.distance_function && self.stored_vectors && self.embedding_provider
    }

    /// Every precondition that is not met
    pub fn missing(&self) -> Vec<Precondition> {
        let mut missing = Vec::new();
        if !self.distance_function {
            missing.push(Precondition::DistanceFunction);
        }
        if !self.stored_vectors {
            missing.push(Precondition::StoredVectors);
        }
        if !self.embedding_provider {
            missing.push(Precondition::EmbeddingProvider);
        }
        missing
    }
}

/// Semantic search engine
pub struct SemanticEngine {
    database: Arc<Database>,
    resolver: Arc<IdentityResolver>,
    provider: Option<Arc<dyn EmbeddingProvider>>,
    availability: SemanticAvailability,
}

impl SemanticEngine {
    /// Create the engine, probing each precondition once
    pub fn new(
        database: Arc<Database>,
        resolver: Arc<IdentityResolver>,
        provider: Option<Arc<dyn EmbeddingProvider>>,
    ) -> Self {
        let distance_function = Self::probe_distance_function(&database)
            .map_err(|e| tracing::debug!(error = %e, "Distance function probe failed"))
            .is_ok();
        let stored_vectors = database
            .count_embeddings()
            .map(|count| count > 0)
            .unwrap_or_else(|e| {
                tracing::debug!(error = %e, "Embedding count unavailable");
                false
            });

        let availability = SemanticAvailability {
            distance_function,
            stored_vectors,
            embedding_provider: provider.is_some(),
        };

        if availability.is_available() {
            tracing::info!("Semantic engine initialized");
        } else {
            tracing::warn!(
                missing = ?availability.missing(),
                "Semantic search not fully available"
            );
        }

        Self {
            database,
            resolver,
            provider,
            availability,
        }
    }

    fn probe_distance_function(database: &Database) -> Result<()> {
        let conn = database.get_conn()?;
        let probe = encode_vector(&[1.0]);
        conn.query_row(
            &format!("SELECT {}(?1, ?1)", DISTANCE_FUNCTION),
            [probe],
            |row| row.get::<_, Option<f64>>(0),
        )?;
        Ok(())
    }

    pub fn availability(&self) -> SemanticAvailability {
        self.availability
    }

    pub fn is_available(&self) -> bool {
        self.availability.is_available()
    }

    /// Model and dimension of the configured provider
    pub fn model(&self) -> Option<(&str, usize)> {
        self.provider
            .as_deref()
            .map(|p| (p.model_name(), p.dimension()))
    }

    /// Run a semantic search
    pub fn search(&self, query: &SemanticQuery) -> SearchOutcome {
        if let Err(e) = query.validate() {
            return SearchOutcome::Failed(e);
        }

        if !self.is_available() {
            return self.unavailable();
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
                tracing::error!(error = %e, "Semantic search filter resolution failed");
                return SearchOutcome::Failed(e);
            }
        };

        self.search_filtered(query, &filter)
    }

    fn unavailable(&self) -> SearchOutcome {
        let availability = self.availability;
        let mut explanation = super::Explanation::new();
        explanation.insert(
            "distance_function_available".to_string(),
            json!(availability.distance_function),
        );
        explanation.insert(
            "stored_vectors_available".to_string(),
            json!(availability.stored_vectors),
        );
        explanation.insert(
            "embedding_provider_available".to_string(),
            json!(availability.embedding_provider),
        );
        SearchOutcome::Degraded(
            ResultSet::empty().with_explanation(explanation),
            DegradeReason::Unavailable(availability.missing()),
        )
    }

    /// Run a semantic search with an already-resolved entity filter
    pub(crate) fn search_filtered(
        &self,
        query: &SemanticQuery,
        filter: &EntityFilter,
    ) -> SearchOutcome {
        let provider = match (&self.provider, self.is_available()) {
            (Some(provider), true) => provider,
            _ => return self.unavailable(),
        };

        let embedding = match provider.embed(&query.base.query) {
            Ok(embedding) => embedding,
            Err(e) => {
                tracing::warn!(error = %e, "Query embedding failed");
                return SearchOutcome::Failed(e.into());
            }
        };

        match self.search_vectors(query, filter, &embedding) {
            Ok(items) => {
                tracing::debug!(query = %query.base.query, results = items.len(), "Semantic search complete");
                SearchOutcome::Ok(ResultSet::new(items))
            }
            Err(e) => {
                tracing::error!(error = %e, "Vector search failed");
                SearchOutcome::Failed(e)
            }
        }
    }

    fn search_vectors(
        &self,
        query: &SemanticQuery,
        filter: &EntityFilter,
        embedding: &[f32],
    ) -> Result<Vec<ResultItem>> {
        let mut conditions = Vec::new();
        let mut params = vec![Value::Blob(encode_vector(embedding))];
        push_entity_clauses(filter, &mut conditions, &mut params);
        if let Some(max) = query.max_distance {
            conditions.push("distance <= ?".to_string());
            params.push(Value::Real(max));
        }
        params.push(Value::Integer(query.base.limit as i64));

        let sql = format!(
            "SELECT {cols}, {f}(e.embedding, ?) AS distance
             FROM chunks c
             {joins}
             JOIN embeddings e ON e.chunk_id = c.chunk_id
             WHERE distance IS NOT NULL{filters}
             ORDER BY distance ASC, c.rowid ASC
             LIMIT ?",
            cols = CHUNK_COLUMNS,
            f = DISTANCE_FUNCTION,
            joins = CHUNK_JOINS,
            filters = and_clauses(&conditions),
        );

        let rows = query_rows(&self.database, &sql, &params)?;
        let mut names = self.resolver.name_memo();
        let items = rows
            .into_iter()
            .filter_map(|row| {
                let distance = row.raw.filter(|d| d.is_finite())?;
                let mut item = row.into_item(&mut names);
                item.semantic_score = Some(similarity_from_distance(distance));
                if query.include_distances {
                    item.distance = Some(distance);
                }
                Some(item)
            })
            .collect();

        Ok(items)
    }
}
