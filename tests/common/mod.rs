//! Shared fixture: a small filing corpus and a deterministic embedding stub
#![allow(dead_code)]

use finsearch::config::Config;
use finsearch::embedding::{encode_vector, EmbeddingError, EmbeddingProvider};
use finsearch::search::SearchContext;
use finsearch::storage::Database;
use rusqlite::{params, Connection};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

pub const APPLE_CIK: &str = "320193";
pub const MICROSOFT_CIK: &str = "789019";

/// Chunks in insertion order: (chunk_id, doc_id, section_id, text, vector)
///
/// `c3` and `c5` share text so they tie under BM25. Against the query vector
/// `[1, 0, 0]` the cosine distances are c1 0.0, c3 0.4, c2 1.0, c4 1.0,
/// c5 1.3.
pub const CHUNKS: &[(&str, &str, i64, &str, [f32; 3])] = &[
    (
        "c1",
        "320193_2023",
        1,
        "Revenue increased due to strong iPhone sales and services revenue growth.",
        [1.0, 0.0, 0.0],
    ),
    (
        "c2",
        "320193_2023",
        1,
        "The company faces supply chain risks concentrated in Asia.",
        [0.0, 1.0, 0.0],
    ),
    (
        "c3",
        "789019_2023",
        2,
        "Cloud revenue grew as Azure adoption accelerated.",
        [0.6, 0.8, 0.0],
    ),
    (
        "c4",
        "789019_2023",
        3,
        "Artificial intelligence investments expanded across products.",
        [0.0, 0.0, 1.0],
    ),
    (
        "c5",
        "789019_2023",
        3,
        "Cloud revenue grew as Azure adoption accelerated.",
        [-0.3, 0.953_939_2, 0.0],
    ),
];

#[derive(Debug, Clone, Copy)]
pub struct CorpusOptions {
    pub fts: bool,
    pub embeddings: bool,
}

impl Default for CorpusOptions {
    fn default() -> Self {
        Self {
            fts: true,
            embeddings: true,
        }
    }
}

/// A corpus file inside a temporary directory
pub struct Corpus {
    _dir: TempDir,
    pub path: PathBuf,
}

impl Corpus {
    pub fn standard() -> Self {
        Self::build(CorpusOptions::default())
    }

    pub fn build(options: CorpusOptions) -> Self {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("filings.sqlite");
        let conn = Connection::open(&path).unwrap();

        conn.execute_batch(
            "CREATE TABLE company_tickers_exchange (cik INTEGER, name TEXT, ticker TEXT, exchange TEXT);
             INSERT INTO company_tickers_exchange VALUES
                 (320193, 'Apple Inc.', 'AAPL', 'Nasdaq'),
                 (789019, 'MICROSOFT CORP', 'MSFT', 'Nasdaq'),
                 (1318605, 'Tesla, Inc.', 'TSLA', 'Nasdaq');

             CREATE TABLE documents (doc_id TEXT PRIMARY KEY, cik INTEGER, filename TEXT, year INTEGER);
             INSERT INTO documents VALUES
                 ('320193_2023', 320193, 'aapl-20230930.htm', 2023),
                 ('789019_2023', 789019, 'msft-10k_20230630.htm', 2023);

             CREATE TABLE sections (section_id INTEGER PRIMARY KEY, doc_id TEXT, section_name TEXT);
             INSERT INTO sections VALUES
                 (1, '320193_2023', 'Item 7'),
                 (2, '789019_2023', 'Item 7'),
                 (3, '789019_2023', 'Item 1A');

             CREATE TABLE chunks (
                 chunk_id TEXT PRIMARY KEY,
                 doc_id TEXT,
                 section_id INTEGER,
                 chunk_text TEXT,
                 char_count INTEGER
             );
             CREATE TABLE embeddings (chunk_id TEXT PRIMARY KEY, embedding BLOB);",
        )
        .unwrap();

        if options.fts {
            conn.execute_batch(
                "CREATE VIRTUAL TABLE chunks_fts USING fts5(chunk_id UNINDEXED, chunk_text);",
            )
            .unwrap();
        }

        for (chunk_id, doc_id, section_id, text, vector) in CHUNKS {
            conn.execute(
                "INSERT INTO chunks VALUES (?1, ?2, ?3, ?4, ?5)",
                params![chunk_id, doc_id, section_id, text, text.len() as i64],
            )
            .unwrap();
            if options.fts {
                conn.execute(
                    "INSERT INTO chunks_fts (chunk_id, chunk_text) VALUES (?1, ?2)",
                    params![chunk_id, text],
                )
                .unwrap();
            }
            if options.embeddings {
                conn.execute(
                    "INSERT INTO embeddings VALUES (?1, ?2)",
                    params![chunk_id, encode_vector(vector)],
                )
                .unwrap();
            }
        }

        drop(conn);
        Self { _dir: dir, path }
    }

    pub fn open(&self) -> Database {
        self.open_with_pool(2)
    }

    pub fn open_with_pool(&self, pool_size: u32) -> Database {
        Database::open_path(&self.path, pool_size, true).unwrap()
    }
}

/// Embedding provider that maps known phrases to fixed vectors
pub struct StubProvider {
    vectors: HashMap<String, Vec<f32>>,
    fail: bool,
}

impl StubProvider {
    pub fn new() -> Self {
        let mut vectors = HashMap::new();
        vectors.insert("supply chain".to_string(), vec![0.0, 1.0, 0.0]);
        vectors.insert("artificial intelligence".to_string(), vec![0.0, 0.0, 1.0]);
        Self {
            vectors,
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            vectors: HashMap::new(),
            fail: true,
        }
    }
}

impl EmbeddingProvider for StubProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if self.fail {
            return Err(EmbeddingError::ProviderError {
                status: 429,
                body: "quota exceeded".to_string(),
            });
        }
        Ok(self
            .vectors
            .get(&text.to_lowercase())
            .cloned()
            .unwrap_or_else(|| vec![1.0, 0.0, 0.0]))
    }

    fn dimension(&self) -> usize {
        3
    }

    fn model_name(&self) -> &str {
        "stub-embed"
    }
}

pub fn context(corpus: &Corpus) -> SearchContext {
    context_with(corpus, &Config::default(), Some(StubProvider::new()))
}

pub fn context_without_provider(corpus: &Corpus) -> SearchContext {
    context_with(corpus, &Config::default(), None)
}

pub fn context_with(
    corpus: &Corpus,
    config: &Config,
    provider: Option<StubProvider>,
) -> SearchContext {
    let provider = provider.map(|p| Arc::new(p) as Arc<dyn EmbeddingProvider>);
    SearchContext::new(config, corpus.open(), provider)
}

/// Context over a single-connection pool
pub fn single_connection_context(corpus: &Corpus) -> SearchContext {
    let provider: Arc<dyn EmbeddingProvider> = Arc::new(StubProvider::new());
    SearchContext::new(&Config::default(), corpus.open_with_pool(1), Some(provider))
}

pub fn ids(items: &[finsearch::search::ResultItem]) -> Vec<&str> {
    items.iter().map(|i| i.chunk_id.as_str()).collect()
}

pub fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-5
}
