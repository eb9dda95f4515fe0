mod common;

use common::{
    approx, context, context_with, context_without_provider, ids, single_connection_context,
    Corpus, CorpusOptions, StubProvider, APPLE_CIK, MICROSOFT_CIK,
};
use finsearch::config::Config;
use finsearch::search::{
    DegradeReason, Precondition, SearchOutcome, SearchQuery, SemanticQuery,
};
use finsearch::storage::Database;
use finsearch::FinsearchError;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[test]
fn test_results_ordered_by_distance() {
    let corpus = Corpus::standard();
    let ctx = context(&corpus);
    assert!(ctx.semantic().is_available());

    let outcome = ctx.semantic().search(&SemanticQuery::new("iphone sales", 10));
    assert!(outcome.is_ok(), "unexpected outcome: {:?}", outcome);

    let items = outcome.items();
    // c2 and c4 are equidistant and keep corpus order
    assert_eq!(ids(items), vec!["c1", "c3", "c2", "c4", "c5"]);

    let distances: Vec<f64> = items.iter().map(|i| i.distance.unwrap()).collect();
    assert!(approx(distances[0], 0.0));
    assert!(approx(distances[1], 0.4));
    assert!(approx(distances[2], 1.0));
    assert!(approx(distances[4], 1.3));
    assert!(items.iter().all(|i| i.keyword_score.is_none()));
}

#[test]
fn test_similarity_is_clamped_at_zero() {
    let corpus = Corpus::standard();
    let ctx = context(&corpus);

    let outcome = ctx.semantic().search(&SemanticQuery::new("iphone sales", 10));
    let items = outcome.items();

    let identical = items.iter().find(|i| i.chunk_id == "c1").unwrap();
    assert!(approx(identical.semantic_score.unwrap(), 1.0));

    let near = items.iter().find(|i| i.chunk_id == "c3").unwrap();
    assert!(approx(near.semantic_score.unwrap(), 0.6));

    let far = items.iter().find(|i| i.chunk_id == "c5").unwrap();
    assert!(far.distance.unwrap() > 1.0);
    assert_eq!(far.semantic_score, Some(0.0));
}

#[test]
fn test_distances_omitted_unless_requested() {
    let corpus = Corpus::standard();
    let ctx = context(&corpus);

    let outcome = ctx
        .semantic()
        .search(&SemanticQuery::new("iphone sales", 3).include_distances(false));

    assert_eq!(outcome.items().len(), 3);
    assert!(outcome.items().iter().all(|i| i.distance.is_none()));
    assert!(outcome.items().iter().all(|i| i.semantic_score.is_some()));
}

#[test]
fn test_max_distance_threshold() {
    let corpus = Corpus::standard();
    let ctx = context(&corpus);

    let outcome = ctx
        .semantic()
        .search(&SemanticQuery::new("iphone sales", 10).with_max_distance(0.5));

    assert_eq!(ids(outcome.items()), vec!["c1", "c3"]);
}

#[test]
fn test_ticker_filter() {
    let corpus = Corpus::standard();
    let ctx = context(&corpus);

    let query = SemanticQuery::from_base(
        SearchQuery::new("artificial intelligence", 10).with_tickers(["msft"]),
    );
    let outcome = ctx.semantic().search(&query);

    assert_eq!(ids(outcome.items()), vec!["c4", "c3", "c5"]);
    assert!(outcome.items().iter().all(|i| i.cik == MICROSOFT_CIK));
    assert_eq!(
        outcome.items()[0].company_name.as_deref(),
        Some("MICROSOFT CORP")
    );
}

#[test]
fn test_unknown_ticker_short_circuits_to_empty() {
    let corpus = Corpus::standard();
    let ctx = context(&corpus);

    let query = SemanticQuery::from_base(SearchQuery::new("cloud", 10).with_tickers(["nope"]));
    let outcome = ctx.semantic().search(&query);

    assert!(outcome.items().is_empty());
    assert!(matches!(
        outcome.degrade_reason(),
        Some(DegradeReason::UnresolvedTickers(_))
    ));
}

#[test]
fn test_missing_provider_disables_engine() {
    let corpus = Corpus::standard();
    let ctx = context_without_provider(&corpus);
    assert!(!ctx.semantic().is_available());

    let outcome = ctx.semantic().search(&SemanticQuery::new("cloud", 10));

    assert!(outcome.items().is_empty());
    assert_eq!(
        outcome.degrade_reason(),
        Some(&DegradeReason::Unavailable(vec![Precondition::EmbeddingProvider]))
    );
}

#[test]
fn test_missing_vectors_disable_engine() {
    let corpus = Corpus::build(CorpusOptions {
        fts: true,
        embeddings: false,
    });
    let ctx = context(&corpus);

    let availability = ctx.semantic().availability();
    assert!(availability.distance_function);
    assert!(!availability.stored_vectors);
    assert!(availability.embedding_provider);

    let outcome = ctx.semantic().search(&SemanticQuery::new("cloud", 10));
    assert_eq!(
        outcome.degrade_reason(),
        Some(&DegradeReason::Unavailable(vec![Precondition::StoredVectors]))
    );
}

#[test]
fn test_missing_distance_function_disables_engine() {
    let corpus = Corpus::standard();
    let database = Database::open_path(&corpus.path, 2, false).unwrap();
    let provider: Arc<dyn finsearch::embedding::EmbeddingProvider> = Arc::new(StubProvider::new());
    let ctx = finsearch::search::SearchContext::new(&Config::default(), database, Some(provider));

    let outcome = ctx.semantic().search(&SemanticQuery::new("cloud", 10));
    assert_eq!(
        outcome.degrade_reason(),
        Some(&DegradeReason::Unavailable(vec![Precondition::DistanceFunction]))
    );
}

#[test]
fn test_embedding_failure_is_not_retried_or_fatal() {
    let corpus = Corpus::standard();
    let ctx = context_with(&corpus, &Config::default(), Some(StubProvider::failing()));
    assert!(ctx.semantic().is_available());

    let outcome = ctx.semantic().search(&SemanticQuery::new("cloud", 10));

    assert!(outcome.items().is_empty());
    assert!(matches!(
        outcome,
        SearchOutcome::Failed(FinsearchError::Embedding(_))
    ));
}

#[test]
fn test_company_names_resolve_with_single_connection_pool() {
    let corpus = Corpus::standard();
    let ctx = single_connection_context(&corpus);

    let started = Instant::now();
    let outcome = ctx.semantic().search(&SemanticQuery::new("iphone sales", 5));
    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(outcome.is_ok(), "unexpected outcome: {:?}", outcome);

    let items = outcome.items();
    assert_eq!(items.len(), 5);
    assert_eq!(items[0].cik, APPLE_CIK);
    assert_eq!(items[0].company_name.as_deref(), Some("Apple Inc."));
    assert!(items.iter().all(|i| i.company_name.is_some()));
}
