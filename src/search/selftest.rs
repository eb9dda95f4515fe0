//! End-to-end smoke queries against each engine

use super::capabilities::CapabilitySnapshot;
use super::context::SearchContext;
use super::hybrid::ResultComposition;
use super::outcome::SearchOutcome;
use super::query::{HybridQuery, KeywordQuery, SemanticQuery};
use serde::Serialize;
use std::time::Instant;

const KEYWORD_PROBE: &str = "revenue";
const SEMANTIC_PROBE: &str = "artificial intelligence";
const HYBRID_PROBE: &str = "revenue growth";

/// Outcome of one probe query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineCheck {
    pub query: String,
    pub results_found: usize,
    pub elapsed_ms: f64,
    /// At least one result came back
    pub working: bool,
    pub status: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_similarity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_fused_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method_distribution: Option<ResultComposition>,
}

impl EngineCheck {
    fn new(query: &str, outcome: &SearchOutcome, started: Instant) -> Self {
        let results_found = outcome.items().len();
        Self {
            query: query.to_string(),
            results_found,
            elapsed_ms: (started.elapsed().as_secs_f64() * 100_000.0).round() / 100.0,
            working: results_found > 0,
            status: outcome.status(),
            average_similarity: None,
            average_fused_score: None,
            method_distribution: None,
        }
    }
}

fn average<I: Iterator<Item = f64>>(values: I) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelfTestReport {
    pub capabilities: CapabilitySnapshot,
    pub keyword: EngineCheck,
    pub semantic: EngineCheck,
    pub hybrid: EngineCheck,
}

impl SelfTestReport {
    pub fn all_working(&self) -> bool {
        self.keyword.working && self.semantic.working && self.hybrid.working
    }
}

/// Run the three probe queries
pub fn run(context: &SearchContext) -> SelfTestReport {
    tracing::info!("Running search self-test");

    let started = Instant::now();
    let outcome = context.keyword().search(&KeywordQuery::new(KEYWORD_PROBE, 3));
    let keyword = EngineCheck::new(KEYWORD_PROBE, &outcome, started);

    let started = Instant::now();
    let outcome = context.semantic().search(&SemanticQuery::new(SEMANTIC_PROBE, 3));
    let mut semantic = EngineCheck::new(SEMANTIC_PROBE, &outcome, started);
    semantic.average_similarity = average(outcome.items().iter().filter_map(|i| i.semantic_score));

    let started = Instant::now();
    let outcome = context
        .hybrid()
        .search(&HybridQuery::new(HYBRID_PROBE, 5).with_weights(0.3, 0.7));
    let mut hybrid = EngineCheck::new(HYBRID_PROBE, &outcome, started);
    hybrid.average_fused_score = average(outcome.items().iter().filter_map(|i| i.fused_score));
    hybrid.method_distribution = Some(ResultComposition::from_items(outcome.items()));

    let report = SelfTestReport {
        capabilities: context.capabilities(),
        keyword,
        semantic,
        hybrid,
    };

    tracing::info!(
        keyword = report.keyword.working,
        semantic = report.semantic.working,
        hybrid = report.hybrid.working,
        "Self-test complete"
    );

    report
}
