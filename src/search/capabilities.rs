//! Read-only snapshot of what the search engines can do right now

use super::keyword::KeywordEngine;
use super::semantic::SemanticEngine;
use crate::storage::Database;
use serde::Serialize;

/// Engine availability and corpus counts
///
/// Missing capabilities show up as `false` or `None`; fields are never
/// omitted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CapabilitySnapshot {
    pub keyword_available: bool,
    pub semantic_available: bool,
    pub hybrid_available: bool,

    pub lexical_scoring_loaded: bool,
    pub distance_function_loaded: bool,
    pub stored_vectors_present: bool,
    pub embedding_provider_ready: bool,

    /// `bm25` or `substring`
    pub keyword_mode: String,
    pub distance_metric: String,

    pub total_chunks: usize,
    pub total_embeddings: usize,

    /// Only reported when semantic search is available
    pub embedding_model: Option<String>,
    pub vector_dimensions: Option<usize>,

    pub error: Option<String>,
}

impl CapabilitySnapshot {
    pub fn collect(database: &Database, keyword: &KeywordEngine, semantic: &SemanticEngine) -> Self {
        let semantic_flags = semantic.availability();
        let semantic_available = semantic.is_available();

        let mut errors = Vec::new();
        let total_chunks = database.count_chunks().unwrap_or_else(|e| {
            errors.push(format!("chunk count unavailable: {}", e));
            0
        });
        let total_embeddings = database.count_embeddings().unwrap_or_else(|e| {
            errors.push(format!("embedding count unavailable: {}", e));
            0
        });

        let (embedding_model, vector_dimensions) = match semantic.model() {
            Some((model, dims)) if semantic_available => (Some(model.to_string()), Some(dims)),
            _ => (None, None),
        };

        Self {
            keyword_available: keyword.is_available(),
            semantic_available,
            hybrid_available: keyword.is_available() || semantic_available,
            lexical_scoring_loaded: keyword.is_available(),
            distance_function_loaded: semantic_flags.distance_function,
            stored_vectors_present: semantic_flags.stored_vectors,
            embedding_provider_ready: semantic_flags.embedding_provider,
            keyword_mode: if keyword.is_available() { "bm25" } else { "substring" }.to_string(),
            distance_metric: "cosine".to_string(),
            total_chunks,
            total_embeddings,
            embedding_model,
            vector_dimensions,
            error: if errors.is_empty() {
                None
            } else {
                Some(errors.join("; "))
            },
        }
    }
}
