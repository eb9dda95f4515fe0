mod common;

use common::{
    approx, context, context_with, context_without_provider, ids, single_connection_context,
    Corpus, StubProvider,
};
use finsearch::config::Config;
use finsearch::search::{
    DegradeReason, HybridQuery, SearchMethod, SearchOutcome, SearchQuery, SearchRequest,
};
use finsearch::FinsearchError;
use std::time::{Duration, Instant};

fn assert_fused_formula(items: &[finsearch::search::ResultItem], wk: f64, ws: f64) {
    for item in items {
        let expected = item.keyword_score.unwrap() * wk + item.semantic_score.unwrap() * ws;
        assert!(
            approx(item.fused_score.unwrap(), expected),
            "{}: fused {:?} != {}",
            item.chunk_id,
            item.fused_score,
            expected
        );
    }
}

#[test]
fn test_zero_weights_fail_without_retrieval() {
    let corpus = Corpus::standard();
    let ctx = context(&corpus);

    let outcome = ctx
        .hybrid()
        .search(&HybridQuery::new("revenue", 5).with_weights(0.0, 0.0));

    match outcome {
        SearchOutcome::Failed(FinsearchError::InvalidQuery(message)) => {
            assert!(message.contains("Combined weights must be greater than 0"));
        }
        other => panic!("expected invalid query, got {:?}", other),
    }
}

#[test]
fn test_fused_score_is_weighted_sum() {
    let corpus = Corpus::standard();
    let ctx = context(&corpus);

    let outcome = ctx
        .hybrid()
        .search(&HybridQuery::new("revenue", 10).with_weights(0.3, 0.7));
    assert!(outcome.is_ok(), "unexpected outcome: {:?}", outcome);

    let items = outcome.items();
    assert_eq!(items.len(), 5);
    assert_fused_formula(items, 0.3, 0.7);

    let fused: Vec<f64> = items.iter().map(|i| i.fused_score.unwrap()).collect();
    assert!(fused.windows(2).all(|w| w[0] >= w[1]));
}

#[test]
fn test_weights_are_normalized_by_total() {
    let corpus = Corpus::standard();
    let ctx = context(&corpus);

    let outcome = ctx
        .hybrid()
        .search(&HybridQuery::new("revenue", 10).with_weights(1.0, 3.0));

    assert_fused_formula(outcome.items(), 0.25, 0.75);
    let explanation = match &outcome {
        SearchOutcome::Ok(set) => set.explanation.clone().unwrap(),
        other => panic!("expected ok, got {:?}", other),
    };
    assert_eq!(explanation["keyword_weight"], 0.25);
    assert_eq!(explanation["semantic_weight"], 0.75);
    assert_eq!(explanation["keyword_results"], 3);
    assert_eq!(explanation["semantic_results"], 5);
    assert_eq!(explanation["combined_unique"], 5);
}

#[test]
fn test_normalized_engine_maximum_is_one() {
    let corpus = Corpus::standard();
    let ctx = context(&corpus);

    let outcome = ctx.hybrid().search(&HybridQuery::new("revenue", 10));
    let items = outcome.items();

    let max_keyword = items.iter().filter_map(|i| i.keyword_score).fold(0.0, f64::max);
    let max_semantic = items.iter().filter_map(|i| i.semantic_score).fold(0.0, f64::max);
    assert_eq!(max_keyword, 1.0);
    assert!(approx(max_semantic, 1.0));
}

#[test]
fn test_truncates_to_requested_limit() {
    let corpus = Corpus::standard();
    let ctx = context(&corpus);

    let outcome = ctx.hybrid().search(&HybridQuery::new("revenue", 2));
    assert_eq!(outcome.items().len(), 2);
    assert_eq!(ctx.hybrid().search_limit(2), 6);
    assert_eq!(ctx.hybrid().search_limit(50), 100);
}

#[test]
fn test_search_limit_saturates_large_multiplier() {
    let corpus = Corpus::standard();
    let mut config = Config::default();
    config.hybrid.overfetch_multiplier = usize::MAX;
    let ctx = context_with(&corpus, &config, Some(StubProvider::new()));

    assert_eq!(ctx.hybrid().search_limit(10), 100);
    assert_eq!(ctx.hybrid().search(&HybridQuery::new("revenue", 10)).items().len(), 5);
}

#[test]
fn test_single_engine_keeps_its_weight_share() {
    let corpus = Corpus::standard();
    let ctx = context_without_provider(&corpus);
    assert!(ctx.hybrid().is_available());

    let outcome = ctx
        .hybrid()
        .search(&HybridQuery::new("revenue", 10).with_weights(0.3, 0.7));

    assert_eq!(
        outcome.degrade_reason(),
        Some(&DegradeReason::PartialFusion(vec![SearchMethod::Semantic]))
    );
    let items = outcome.items();
    assert_eq!(items.len(), 3);
    assert!(approx(items[0].fused_score.unwrap(), 0.3));
    assert!(items.iter().all(|i| i.semantic_score == Some(0.0)));
}

#[test]
fn test_zero_weight_engine_is_skipped_without_degrading() {
    let corpus = Corpus::standard();
    let ctx = context(&corpus);

    let outcome = ctx
        .hybrid()
        .search(&HybridQuery::new("revenue", 10).with_weights(0.0, 1.0));

    assert!(outcome.is_ok());
    let items = outcome.items();
    assert_eq!(ids(items), vec!["c1", "c3", "c2", "c4", "c5"]);
    assert!(items.iter().all(|i| i.keyword_score == Some(0.0)));
    assert!(approx(items[0].fused_score.unwrap(), 1.0));
}

#[test]
fn test_failed_sub_search_degrades_to_partial_fusion() {
    let corpus = Corpus::standard();
    let ctx = context_with(&corpus, &Config::default(), Some(StubProvider::failing()));

    let outcome = ctx.hybrid().search(&HybridQuery::new("revenue", 10));

    assert_eq!(
        outcome.degrade_reason(),
        Some(&DegradeReason::PartialFusion(vec![SearchMethod::Semantic]))
    );
    assert_eq!(outcome.items().len(), 3);
}

#[test]
fn test_unknown_ticker_returns_no_results() {
    let corpus = Corpus::standard();
    let ctx = context(&corpus);

    let query = HybridQuery::from_base(SearchQuery::new("revenue", 10).with_tickers(["ZZZZ"]));
    let outcome = ctx.hybrid().search(&query);

    assert!(outcome.items().is_empty());
    assert!(matches!(
        outcome.degrade_reason(),
        Some(DegradeReason::UnresolvedTickers(_))
    ));
}

#[test]
fn test_sequential_and_concurrent_fanout_agree() {
    let corpus = Corpus::standard();
    let concurrent = context(&corpus);

    let mut config = Config::default();
    config.hybrid.concurrent_fanout = false;
    let sequential = context_with(&corpus, &config, Some(StubProvider::new()));

    let query = HybridQuery::new("cloud revenue", 10);
    let a = concurrent.hybrid().search(&query);
    let b = sequential.hybrid().search(&query);

    assert_eq!(a.items(), b.items());
    assert_eq!(a.items(), concurrent.hybrid().search(&query).items());
}

#[test]
fn test_explain_reports_composition() {
    let corpus = Corpus::standard();
    let ctx = context(&corpus);

    let (response, report) = ctx.explain(&HybridQuery::new("revenue", 10));

    assert_eq!(response.method, SearchMethod::Hybrid);
    assert_eq!(response.total_results, 5);
    // c5's similarity clamps to zero; c2 and c4 score zero in both engines
    assert_eq!(report.composition.both, 2);
    assert_eq!(report.composition.keyword_only, 1);
    assert_eq!(report.composition.semantic_only, 0);
    assert_eq!(report.company_distribution[0].company, "MICROSOFT CORP");
    assert_eq!(report.company_distribution[0].count, 3);
    assert!(report.fused_score_avg.is_some());
}

#[test]
fn test_context_search_renders_envelope() {
    let corpus = Corpus::standard();
    let ctx = context(&corpus);

    let request: SearchRequest = serde_json::from_str(
        r#"{"method": "hybrid", "query": "revenue", "limit": 3, "fts_weight": 0.5, "semantic_weight": 0.5}"#,
    )
    .unwrap();
    let response = ctx.search(&request);

    assert_eq!(response.query, "revenue");
    assert_eq!(response.method, SearchMethod::Hybrid);
    assert_eq!(response.total_results, 3);
    assert!(response.error().is_none());

    let value = serde_json::to_value(&response).unwrap();
    assert_eq!(value["method"], "hybrid");
    assert!(value["results"][0].get("fused_score").is_some());
}

#[test]
fn test_context_search_reports_errors_in_envelope() {
    let corpus = Corpus::standard();
    let ctx = context(&corpus);

    let response = ctx.search(&SearchRequest::Hybrid(
        HybridQuery::new("revenue", 3).with_weights(0.0, 0.0),
    ));

    assert_eq!(response.total_results, 0);
    assert_eq!(
        response.error(),
        Some("Invalid query: Combined weights must be greater than 0")
    );
}

#[test]
fn test_concurrent_fanout_shares_single_connection_pool() {
    let corpus = Corpus::standard();
    let ctx = single_connection_context(&corpus);

    let started = Instant::now();
    let outcome = ctx.hybrid().search(&HybridQuery::new("revenue", 10));
    assert!(started.elapsed() < Duration::from_secs(5));

    assert!(outcome.is_ok(), "unexpected outcome: {:?}", outcome);
    assert_eq!(outcome.items().len(), 5);
    assert!(outcome.items().iter().all(|i| i.company_name.is_some()));
}
