//! Result items, engine outcomes, and the response envelope

use super::SearchMethod;
use crate::error::FinsearchError;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::fmt;
use std::time::Duration;

/// Diagnostic metadata attached to a response
pub type Explanation = Map<String, Value>;

/// One retrieved chunk with provenance and per-engine scores
///
/// Score fields are present only when an engine that contributed to this
/// item produced them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultItem {
    pub chunk_id: String,
    pub doc_id: String,
    pub cik: String,
    pub company_name: Option<String>,
    pub filename: String,
    pub section_name: String,
    pub chunk_text: String,
    pub char_count: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semantic_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fused_score: Option<f64>,
}

/// Ranked items plus optional engine-specific explanation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub items: Vec<ResultItem>,
    pub explanation: Option<Explanation>,
}

impl ResultSet {
    pub fn new(items: Vec<ResultItem>) -> Self {
        Self {
            items,
            explanation: None,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_explanation(mut self, explanation: Explanation) -> Self {
        self.explanation = Some(explanation);
        self
    }
}

/// A backend precondition an engine needs before it can serve requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Precondition {
    /// `vec_distance_cosine()` in the store
    DistanceFunction,
    /// At least one stored embedding vector
    StoredVectors,
    /// Embedding client with a credential
    EmbeddingProvider,
}

impl fmt::Display for Precondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Precondition::DistanceFunction => "vector distance function",
            Precondition::StoredVectors => "stored embedding vectors",
            Precondition::EmbeddingProvider => "embedding provider",
        };
        f.write_str(name)
    }
}

/// Why an engine answered with less than a full result
#[derive(Debug, Clone, PartialEq)]
pub enum DegradeReason {
    /// Lexical scoring is unavailable; results come from unscored substring matching
    SubstringFallback,
    /// Ticker filter matched no known entity
    UnresolvedTickers(Vec<String>),
    /// The engine cannot run; lists every missing precondition
    Unavailable(Vec<Precondition>),
    /// Hybrid fusion ran without these weighted engines
    PartialFusion(Vec<SearchMethod>),
}

impl fmt::Display for DegradeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DegradeReason::SubstringFallback => {
                write!(f, "lexical scoring unavailable, used substring matching")
            }
            DegradeReason::UnresolvedTickers(tickers) => {
                write!(f, "no entities found for tickers {:?}", tickers)
            }
            DegradeReason::Unavailable(missing) => {
                let names: Vec<String> = missing.iter().map(|p| p.to_string()).collect();
                write!(f, "missing {}", names.join(", "))
            }
            DegradeReason::PartialFusion(skipped) => {
                let names: Vec<&str> = skipped.iter().map(|m| m.as_str()).collect();
                write!(f, "fused without {}", names.join(", "))
            }
        }
    }
}

/// What an engine produced for one request
#[derive(Debug)]
pub enum SearchOutcome {
    Ok(ResultSet),
    Degraded(ResultSet, DegradeReason),
    Failed(FinsearchError),
}

impl SearchOutcome {
    pub fn items(&self) -> &[ResultItem] {
        match self {
            SearchOutcome::Ok(set) | SearchOutcome::Degraded(set, _) => &set.items,
            SearchOutcome::Failed(_) => &[],
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, SearchOutcome::Ok(_))
    }

    pub fn degrade_reason(&self) -> Option<&DegradeReason> {
        match self {
            SearchOutcome::Degraded(_, reason) => Some(reason),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&FinsearchError> {
        match self {
            SearchOutcome::Failed(e) => Some(e),
            _ => None,
        }
    }

    /// Short status label used in hybrid explanations and logs
    pub fn status(&self) -> String {
        match self {
            SearchOutcome::Ok(_) => "ok".to_string(),
            SearchOutcome::Degraded(_, reason) => format!("degraded: {}", reason),
            SearchOutcome::Failed(e) => format!("failed: {}", e),
        }
    }

    /// Take the items, discarding status
    pub fn into_items(self) -> Vec<ResultItem> {
        match self {
            SearchOutcome::Ok(set) | SearchOutcome::Degraded(set, _) => set.items,
            SearchOutcome::Failed(_) => Vec::new(),
        }
    }

    /// Render the response envelope; never fails
    pub fn into_response(
        self,
        query: &str,
        method: SearchMethod,
        elapsed: Duration,
    ) -> SearchResponse {
        let (items, explanation) = match self {
            SearchOutcome::Ok(set) => (set.items, set.explanation),
            SearchOutcome::Degraded(set, reason) => {
                let mut explanation = set.explanation.unwrap_or_default();
                explanation.insert("degraded".to_string(), json!(reason.to_string()));
                match &reason {
                    DegradeReason::SubstringFallback => {
                        explanation.insert("search_mode".to_string(), json!("substring"));
                    }
                    DegradeReason::UnresolvedTickers(tickers) => {
                        explanation.insert("unresolved_tickers".to_string(), json!(tickers));
                    }
                    DegradeReason::Unavailable(missing) => {
                        explanation.insert(
                            "error".to_string(),
                            json!(format!("{} search not available", method.label())),
                        );
                        explanation.insert("missing".to_string(), json!(missing));
                    }
                    DegradeReason::PartialFusion(skipped) => {
                        explanation.insert("skipped_engines".to_string(), json!(skipped));
                    }
                }
                (set.items, Some(explanation))
            }
            SearchOutcome::Failed(e) => {
                let mut explanation = Explanation::new();
                explanation.insert("error".to_string(), json!(e.to_string()));
                (Vec::new(), Some(explanation))
            }
        };

        SearchResponse {
            query: query.to_string(),
            method,
            total_results: items.len(),
            results: items,
            search_time_ms: round_ms(elapsed),
            explanation,
        }
    }
}

fn round_ms(elapsed: Duration) -> f64 {
    (elapsed.as_secs_f64() * 1000.0 * 100.0).round() / 100.0
}

/// Response envelope returned for every search
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub method: SearchMethod,
    pub total_results: usize,
    pub results: Vec<ResultItem>,
    pub search_time_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<Explanation>,
}

impl SearchResponse {
    /// The `error` entry of the explanation, if any
    pub fn error(&self) -> Option<&str> {
        self.explanation
            .as_ref()
            .and_then(|e| e.get("error"))
            .and_then(Value::as_str)
    }
}
