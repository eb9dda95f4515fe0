//! Request shapes for the three search methods
//!
//! Queries are validated once at the engine boundary and never mutated
//! afterwards; hybrid search derives fresh per-engine queries instead.

use super::{SearchMethod, MAX_LIMIT};
use crate::error::{FinsearchError, Result};
use serde::{Deserialize, Serialize};

fn default_limit() -> usize {
    10
}

fn default_true() -> bool {
    true
}

fn default_keyword_weight() -> f64 {
    0.3
}

fn default_semantic_weight() -> f64 {
    0.7
}

/// Fields shared by every search request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Query text
    pub query: String,

    /// Maximum number of results
    #[serde(default = "default_limit")]
    pub limit: usize,

    /// Optional ticker filter, resolved to CIKs case-insensitively
    #[serde(default)]
    pub tickers: Option<Vec<String>>,

    /// Optional CIK filter
    #[serde(default)]
    pub ciks: Option<Vec<String>>,
}

impl SearchQuery {
    pub fn new(query: impl Into<String>, limit: usize) -> Self {
        Self {
            query: query.into(),
            limit,
            tickers: None,
            ciks: None,
        }
    }

    pub fn with_tickers<I, S>(mut self, tickers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tickers = Some(tickers.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_ciks<I, S>(mut self, ciks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ciks = Some(ciks.into_iter().map(Into::into).collect());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.query.trim().is_empty() {
            return Err(FinsearchError::InvalidQuery(
                "Query text cannot be empty".to_string(),
            ));
        }
        if !(1..=MAX_LIMIT).contains(&self.limit) {
            return Err(FinsearchError::InvalidQuery(format!(
                "Limit must be between 1 and {}, got {}",
                MAX_LIMIT, self.limit
            )));
        }
        Ok(())
    }
}

/// Keyword (BM25) search request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordQuery {
    #[serde(flatten)]
    pub base: SearchQuery,

    /// Minimum relevance score threshold
    #[serde(default)]
    pub min_score: Option<f64>,
}

impl KeywordQuery {
    pub fn new(query: impl Into<String>, limit: usize) -> Self {
        Self::from_base(SearchQuery::new(query, limit))
    }

    pub fn from_base(base: SearchQuery) -> Self {
        Self {
            base,
            min_score: None,
        }
    }

    pub fn with_min_score(mut self, min_score: f64) -> Self {
        self.min_score = Some(min_score);
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.base.validate()?;
        if let Some(min) = self.min_score {
            if !min.is_finite() || min < 0.0 {
                return Err(FinsearchError::InvalidQuery(format!(
                    "min_score must be a non-negative number, got {}",
                    min
                )));
            }
        }
        Ok(())
    }
}

/// Semantic (vector) search request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticQuery {
    #[serde(flatten)]
    pub base: SearchQuery,

    /// Include raw distances in results
    #[serde(default = "default_true")]
    pub include_distances: bool,

    /// Maximum cosine distance threshold
    #[serde(default)]
    pub max_distance: Option<f64>,
}

impl SemanticQuery {
    pub fn new(query: impl Into<String>, limit: usize) -> Self {
        Self::from_base(SearchQuery::new(query, limit))
    }

    pub fn from_base(base: SearchQuery) -> Self {
        Self {
            base,
            include_distances: true,
            max_distance: None,
        }
    }

    pub fn with_max_distance(mut self, max_distance: f64) -> Self {
        self.max_distance = Some(max_distance);
        self
    }

    pub fn include_distances(mut self, include: bool) -> Self {
        self.include_distances = include;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.base.validate()?;
        if let Some(max) = self.max_distance {
            if !(0.0..=2.0).contains(&max) {
                return Err(FinsearchError::InvalidQuery(format!(
                    "max_distance must be between 0 and 2, got {}",
                    max
                )));
            }
        }
        Ok(())
    }
}

/// Hybrid search request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HybridQuery {
    #[serde(flatten)]
    pub base: SearchQuery,

    #[serde(default = "default_keyword_weight", alias = "fts_weight")]
    pub keyword_weight: f64,

    #[serde(default = "default_semantic_weight")]
    pub semantic_weight: f64,

    #[serde(default = "default_true")]
    pub normalize_scores: bool,
}

impl HybridQuery {
    pub fn new(query: impl Into<String>, limit: usize) -> Self {
        Self::from_base(SearchQuery::new(query, limit))
    }

    pub fn from_base(base: SearchQuery) -> Self {
        Self {
            base,
            keyword_weight: default_keyword_weight(),
            semantic_weight: default_semantic_weight(),
            normalize_scores: true,
        }
    }

    pub fn with_weights(mut self, keyword_weight: f64, semantic_weight: f64) -> Self {
        self.keyword_weight = keyword_weight;
        self.semantic_weight = semantic_weight;
        self
    }

    pub fn normalize_scores(mut self, normalize: bool) -> Self {
        self.normalize_scores = normalize;
        self
    }

    /// Weights must each be non-negative; both being zero is reported by
    /// the hybrid engine itself, not here.
    pub fn validate(&self) -> Result<()> {
        self.base.validate()?;
        for (name, weight) in [
            ("keyword_weight", self.keyword_weight),
            ("semantic_weight", self.semantic_weight),
        ] {
            if !weight.is_finite() || weight < 0.0 {
                return Err(FinsearchError::InvalidQuery(format!(
                    "{} must be a non-negative number, got {}",
                    name, weight
                )));
            }
        }
        Ok(())
    }
}

/// A search request tagged with the method that serves it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "lowercase")]
pub enum SearchRequest {
    Keyword(KeywordQuery),
    Semantic(SemanticQuery),
    Hybrid(HybridQuery),
}

impl SearchRequest {
    pub fn method(&self) -> SearchMethod {
        match self {
            SearchRequest::Keyword(_) => SearchMethod::Keyword,
            SearchRequest::Semantic(_) => SearchMethod::Semantic,
            SearchRequest::Hybrid(_) => SearchMethod::Hybrid,
        }
    }

    pub fn base(&self) -> &SearchQuery {
        match self {
            SearchRequest::Keyword(q) => &q.base,
            SearchRequest::Semantic(q) => &q.base,
            SearchRequest::Hybrid(q) => &q.base,
        }
    }
}
