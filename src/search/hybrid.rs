//! Hybrid search combining keyword and semantic results by weighted fusion

use super::fusion::{fuse, FusionWeights};
use super::keyword::KeywordEngine;
use super::outcome::{DegradeReason, Explanation, ResultItem, ResultSet, SearchOutcome};
use super::query::{HybridQuery, KeywordQuery, SearchQuery, SemanticQuery};
use super::semantic::SemanticEngine;
use super::SearchMethod;
use crate::config::HybridConfig;
use crate::error::FinsearchError;
use crate::identity::{EntityFilter, FilterResolution, IdentityResolver};
use ahash::AHashMap;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

/// Hybrid searcher layered over the keyword and semantic engines
pub struct HybridEngine {
    keyword: Arc<KeywordEngine>,
    semantic: Arc<SemanticEngine>,
    resolver: Arc<IdentityResolver>,
    config: HybridConfig,
}

impl HybridEngine {
    pub fn new(
        keyword: Arc<KeywordEngine>,
        semantic: Arc<SemanticEngine>,
        resolver: Arc<IdentityResolver>,
        config: HybridConfig,
    ) -> Self {
        Self {
            keyword,
            semantic,
            resolver,
            config,
        }
    }

    /// Available when either underlying engine is
    pub fn is_available(&self) -> bool {
        self.keyword.is_available() || self.semantic.is_available()
    }

    /// Per-engine result count requested before fusion
    pub fn search_limit(&self, limit: usize) -> usize {
        limit
            .saturating_mul(self.config.overfetch_multiplier)
            .min(self.config.overfetch_cap)
    }

    /// Perform hybrid search
    pub fn search(&self, query: &HybridQuery) -> SearchOutcome {
        if let Err(e) = query.validate() {
            return SearchOutcome::Failed(e);
        }

        let weights = match FusionWeights::normalize(query.keyword_weight, query.semantic_weight) {
            Ok(weights) => weights,
            Err(e) => {
                tracing::warn!(
                    keyword_weight = query.keyword_weight,
                    semantic_weight = query.semantic_weight,
                    "Rejected hybrid weights"
                );
                return SearchOutcome::Failed(FinsearchError::InvalidQuery(e.to_string()));
            }
        };

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
                tracing::error!(error = %e, "Hybrid search filter resolution failed");
                return SearchOutcome::Failed(e);
            }
        };

        self.search_filtered(query, weights, &filter)
    }

    fn search_filtered(
        &self,
        query: &HybridQuery,
        weights: FusionWeights,
        filter: &EntityFilter,
    ) -> SearchOutcome {
        let sub_base = SearchQuery {
            limit: self.search_limit(query.base.limit),
            ..query.base.clone()
        };
        let keyword_query = KeywordQuery::from_base(sub_base.clone());
        let semantic_query = SemanticQuery::from_base(sub_base);

        let run_keyword = weights.keyword > 0.0 && self.keyword.is_available();
        let run_semantic = weights.semantic > 0.0 && self.semantic.is_available();

        let (keyword_outcome, semantic_outcome) =
            if run_keyword && run_semantic && self.config.concurrent_fanout {
                std::thread::scope(|s| {
                    let keyword = s.spawn(|| self.keyword.search_filtered(&keyword_query, filter));
                    let semantic = self.semantic.search_filtered(&semantic_query, filter);
                    let keyword = keyword.join().unwrap_or_else(|_| {
                        SearchOutcome::Failed(FinsearchError::Other(anyhow::anyhow!(
                            "Keyword search thread panicked"
                        )))
                    });
                    (Some(keyword), Some(semantic))
                })
            } else {
                (
                    run_keyword.then(|| self.keyword.search_filtered(&keyword_query, filter)),
                    run_semantic.then(|| self.semantic.search_filtered(&semantic_query, filter)),
                )
            };

        let mut skipped = Vec::new();
        if weights.keyword > 0.0 && !keyword_outcome.as_ref().is_some_and(SearchOutcome::is_ok) {
            skipped.push(SearchMethod::Keyword);
        }
        if weights.semantic > 0.0 && !semantic_outcome.as_ref().is_some_and(SearchOutcome::is_ok)
        {
            skipped.push(SearchMethod::Semantic);
        }

        let keyword_status = status_label(keyword_outcome.as_ref());
        let semantic_status = status_label(semantic_outcome.as_ref());
        let keyword_items = keyword_outcome
            .map(SearchOutcome::into_items)
            .unwrap_or_default();
        let semantic_items = semantic_outcome
            .map(SearchOutcome::into_items)
            .unwrap_or_default();
        let keyword_count = keyword_items.len();
        let semantic_count = semantic_items.len();

        let mut fused = fuse(keyword_items, semantic_items, weights, query.normalize_scores);
        let combined_unique = fused.len();
        fused.truncate(query.base.limit);

        let mut explanation = Explanation::new();
        explanation.insert("keyword_weight".to_string(), json!(weights.keyword));
        explanation.insert("semantic_weight".to_string(), json!(weights.semantic));
        explanation.insert("keyword_results".to_string(), json!(keyword_count));
        explanation.insert("semantic_results".to_string(), json!(semantic_count));
        explanation.insert("combined_unique".to_string(), json!(combined_unique));
        explanation.insert("keyword_status".to_string(), json!(keyword_status));
        explanation.insert("semantic_status".to_string(), json!(semantic_status));

        tracing::debug!(
            query = %query.base.query,
            keyword_results = keyword_count,
            semantic_results = semantic_count,
            combined_unique,
            returned = fused.len(),
            "Hybrid search complete"
        );

        let set = ResultSet::new(fused).with_explanation(explanation);
        if skipped.is_empty() {
            SearchOutcome::Ok(set)
        } else {
            tracing::warn!(?skipped, "Hybrid search fused without some weighted engines");
            SearchOutcome::Degraded(set, DegradeReason::PartialFusion(skipped))
        }
    }

    /// Run a hybrid search and analyze its results
    pub fn explain(&self, query: &HybridQuery) -> (SearchOutcome, HybridReport) {
        let outcome = self.search(query);
        let report = HybridReport::new(query, outcome.items());
        (outcome, report)
    }
}

fn status_label(outcome: Option<&SearchOutcome>) -> String {
    outcome.map_or_else(|| "skipped".to_string(), SearchOutcome::status)
}

/// Which engines contributed a positive score to each item
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResultComposition {
    pub keyword_only: usize,
    pub semantic_only: usize,
    pub both: usize,
}

impl ResultComposition {
    pub fn from_items(items: &[ResultItem]) -> Self {
        let mut composition = Self::default();
        for item in items {
            let keyword = item.keyword_score.is_some_and(|s| s > 0.0);
            let semantic = item.semantic_score.is_some_and(|s| s > 0.0);
            match (keyword, semantic) {
                (true, true) => composition.both += 1,
                (true, false) => composition.keyword_only += 1,
                (false, true) => composition.semantic_only += 1,
                (false, false) => {}
            }
        }
        composition
    }
}

/// Request parameters echoed into a hybrid report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryAnalysis {
    pub query: String,
    pub keyword_weight: f64,
    pub semantic_weight: f64,
    pub normalize_scores: bool,
    pub limit: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompanyCount {
    pub company: String,
    pub count: usize,
}

/// Analysis of one hybrid result list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HybridReport {
    pub query_analysis: QueryAnalysis,
    pub composition: ResultComposition,
    /// Descending by count; ties keep first appearance
    pub company_distribution: Vec<CompanyCount>,
    pub fused_score_avg: Option<f64>,
    pub fused_score_range: Option<(f64, f64)>,
}

impl HybridReport {
    pub fn new(query: &HybridQuery, items: &[ResultItem]) -> Self {
        let mut order: Vec<String> = Vec::new();
        let mut counts: AHashMap<String, usize> = AHashMap::new();
        for item in items {
            let company = item
                .company_name
                .clone()
                .unwrap_or_else(|| item.cik.clone());
            let count = counts.entry(company.clone()).or_insert(0);
            if *count == 0 {
                order.push(company);
            }
            *count += 1;
        }
        let mut company_distribution: Vec<CompanyCount> = order
            .into_iter()
            .map(|company| {
                let count = counts.get(&company).copied().unwrap_or(0);
                CompanyCount { company, count }
            })
            .collect();
        company_distribution.sort_by(|a, b| b.count.cmp(&a.count));

        let scores: Vec<f64> = items.iter().filter_map(|i| i.fused_score).collect();
        let (fused_score_avg, fused_score_range) = if scores.is_empty() {
            (None, None)
        } else {
            let avg = scores.iter().sum::<f64>() / scores.len() as f64;
            let min = scores.iter().copied().fold(f64::INFINITY, f64::min);
            let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            (Some(avg), Some((min, max)))
        };

        Self {
            query_analysis: QueryAnalysis {
                query: query.base.query.clone(),
                keyword_weight: query.keyword_weight,
                semantic_weight: query.semantic_weight,
                normalize_scores: query.normalize_scores,
                limit: query.base.limit,
            },
            composition: ResultComposition::from_items(items),
            company_distribution,
            fused_score_avg,
            fused_score_range,
        }
    }
}
