//! Keyword, semantic, and hybrid search over filing chunks

pub mod capabilities;
pub mod context;
pub mod fusion;
pub mod hybrid;
pub mod keyword;
pub mod outcome;
pub mod query;
pub(crate) mod rows;
pub mod selftest;
pub mod semantic;

pub use capabilities::CapabilitySnapshot;
pub use context::SearchContext;
pub use fusion::{fuse, FusionError, FusionWeights};
pub use hybrid::{HybridEngine, HybridReport, ResultComposition};
pub use keyword::{sanitize_fts_query, KeywordEngine};
pub use outcome::{
    DegradeReason, Explanation, Precondition, ResultItem, ResultSet, SearchOutcome,
    SearchResponse,
};
pub use query::{HybridQuery, KeywordQuery, SearchQuery, SearchRequest, SemanticQuery};
pub use selftest::{EngineCheck, SelfTestReport};
pub use semantic::{similarity_from_distance, SemanticAvailability, SemanticEngine};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Upper bound on results per request
pub const MAX_LIMIT: usize = 100;

/// Search method tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMethod {
    Keyword,
    Semantic,
    Hybrid,
}

impl SearchMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchMethod::Keyword => "keyword",
            SearchMethod::Semantic => "semantic",
            SearchMethod::Hybrid => "hybrid",
        }
    }

    /// Capitalized name for messages
    pub fn label(&self) -> &'static str {
        match self {
            SearchMethod::Keyword => "Keyword",
            SearchMethod::Semantic => "Semantic",
            SearchMethod::Hybrid => "Hybrid",
        }
    }
}

impl fmt::Display for SearchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
