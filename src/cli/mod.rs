//! CLI command definitions and parsing
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "finsearch",
    version,
    about = "Keyword, semantic, and hybrid search over SEC filing chunks",
    long_about = "finsearch answers free-text queries against a corpus of chunked SEC filings. \
                  It ranks chunks by BM25 keyword relevance, by embedding similarity, or by a \
                  weighted fusion of both, optionally restricted to specific companies."
)]
pub struct Cli {
    /// Global config file path (defaults to ~/.config/finsearch/config.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Corpus database path (overrides storage.database_path)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub database: Option<PathBuf>,

    /// Config profile to apply (e.g., "keyword-heavy")
    #[arg(short, long, global = true)]
    pub profile: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Arguments shared by every search command
#[derive(Args, Debug, Clone)]
pub struct SearchArgs {
    /// Search query text
    pub query: String,

    /// Maximum number of results to return (defaults to search.default_limit)
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Restrict to companies with these tickers (comma-separated)
    #[arg(short, long = "ticker", value_delimiter = ',')]
    pub tickers: Vec<String>,

    /// Restrict to these CIKs (comma-separated)
    #[arg(long = "cik", value_delimiter = ',')]
    pub ciks: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// BM25 keyword search
    Keyword {
        #[command(flatten)]
        search: SearchArgs,

        /// Drop results scoring below this threshold
        #[arg(long)]
        min_score: Option<f64>,
    },

    /// Embedding similarity search
    Semantic {
        #[command(flatten)]
        search: SearchArgs,

        /// Drop results farther than this cosine distance
        #[arg(long)]
        max_distance: Option<f64>,

        /// Omit raw distances from results
        #[arg(long)]
        no_distances: bool,
    },

    /// Weighted fusion of keyword and semantic search
    Hybrid {
        #[command(flatten)]
        search: SearchArgs,

        /// Keyword weight (defaults to hybrid.keyword_weight)
        #[arg(long, visible_alias = "fts-weight")]
        keyword_weight: Option<f64>,

        /// Semantic weight (defaults to hybrid.semantic_weight)
        #[arg(long)]
        semantic_weight: Option<f64>,

        /// Use raw engine scores instead of max-normalized ones
        #[arg(long)]
        no_normalize: bool,

        /// Print a result composition report
        #[arg(long)]
        explain: bool,
    },

    /// Show which search methods are available
    Capabilities,

    /// Show corpus row counts
    Stats,

    /// Run a probe query through every engine
    Selftest,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show {
        /// Show only a specific section
        #[arg(short, long)]
        section: Option<String>,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (defaults to standard location)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Initialize default configuration
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
