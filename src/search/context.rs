//! Search context: the engines and their shared store, built once at startup

use super::capabilities::CapabilitySnapshot;
use super::hybrid::{HybridEngine, HybridReport};
use super::keyword::KeywordEngine;
use super::outcome::{SearchOutcome, SearchResponse};
use super::query::{HybridQuery, SearchRequest};
use super::selftest::{self, SelfTestReport};
use super::semantic::SemanticEngine;
use crate::config::Config;
use crate::embedding::{EmbeddingProvider, OpenAiProvider};
use crate::error::Result;
use crate::identity::IdentityResolver;
use crate::storage::{Database, DbStats};
use std::sync::Arc;
use std::time::Instant;

/// Owns every engine; share by reference across request handlers
pub struct SearchContext {
    database: Arc<Database>,
    resolver: Arc<IdentityResolver>,
    keyword: Arc<KeywordEngine>,
    semantic: Arc<SemanticEngine>,
    hybrid: HybridEngine,
}

impl SearchContext {
    /// Build the engines over an open store; availability is probed here once
    pub fn new(
        config: &Config,
        database: Database,
        provider: Option<Arc<dyn EmbeddingProvider>>,
    ) -> Self {
        let database = Arc::new(database);
        let resolver = Arc::new(IdentityResolver::new(Arc::clone(&database)));
        let keyword = Arc::new(KeywordEngine::new(
            Arc::clone(&database),
            Arc::clone(&resolver),
        ));
        let semantic = Arc::new(SemanticEngine::new(
            Arc::clone(&database),
            Arc::clone(&resolver),
            provider,
        ));
        let hybrid = HybridEngine::new(
            Arc::clone(&keyword),
            Arc::clone(&semantic),
            Arc::clone(&resolver),
            config.hybrid.clone(),
        );

        tracing::info!(
            keyword = keyword.is_available(),
            semantic = semantic.is_available(),
            hybrid = hybrid.is_available(),
            "Search context ready"
        );

        Self {
            database,
            resolver,
            keyword,
            semantic,
            hybrid,
        }
    }

    /// Open the configured store and embedding provider
    ///
    /// A provider that cannot be built leaves semantic search unavailable
    /// rather than failing startup.
    pub fn from_config(config: &Config) -> Result<Self> {
        let database = Database::open(&config.storage)?;

        let provider = match OpenAiProvider::from_env(&config.semantic) {
            Ok(Some(provider)) => Some(Arc::new(provider) as Arc<dyn EmbeddingProvider>),
            Ok(None) => {
                tracing::warn!(
                    env = %config.semantic.api_key_env,
                    "Embedding credential not set, semantic search disabled"
                );
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "Embedding provider unavailable");
                None
            }
        };

        Ok(Self::new(config, database, provider))
    }

    /// Dispatch a request and render its response envelope
    pub fn search(&self, request: &SearchRequest) -> SearchResponse {
        let started = Instant::now();
        let outcome = self.execute(request);
        outcome.into_response(&request.base().query, request.method(), started.elapsed())
    }

    /// Dispatch a request and return the engine's outcome
    pub fn execute(&self, request: &SearchRequest) -> SearchOutcome {
        match request {
            SearchRequest::Keyword(q) => self.keyword.search(q),
            SearchRequest::Semantic(q) => self.semantic.search(q),
            SearchRequest::Hybrid(q) => self.hybrid.search(q),
        }
    }

    /// Hybrid search plus a result analysis
    pub fn explain(&self, query: &HybridQuery) -> (SearchResponse, HybridReport) {
        let started = Instant::now();
        let (outcome, report) = self.hybrid.explain(query);
        let response = outcome.into_response(
            &query.base.query,
            super::SearchMethod::Hybrid,
            started.elapsed(),
        );
        (response, report)
    }

    pub fn capabilities(&self) -> CapabilitySnapshot {
        CapabilitySnapshot::collect(&self.database, &self.keyword, &self.semantic)
    }

    pub fn stats(&self) -> DbStats {
        self.database.stats()
    }

    pub fn self_test(&self) -> SelfTestReport {
        selftest::run(self)
    }

    pub fn keyword(&self) -> &KeywordEngine {
        &self.keyword
    }

    pub fn semantic(&self) -> &SemanticEngine {
        &self.semantic
    }

    pub fn hybrid(&self) -> &HybridEngine {
        &self.hybrid
    }

    pub fn resolver(&self) -> &IdentityResolver {
        &self.resolver
    }
}
