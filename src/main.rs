use finsearch::cli::{Cli, Commands, ConfigAction, SearchArgs};
use finsearch::config::Config;
use finsearch::error::{FinsearchError, Result};
use finsearch::search::{
    HybridQuery, HybridReport, KeywordQuery, SearchContext, SearchQuery, SearchRequest,
    SearchResponse, SemanticQuery,
};
use serde::Serialize;
use std::path::PathBuf;

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    // Initialize logging
    init_logging(cli.verbose);

    // Handle commands
    match cli.command {
        Commands::Keyword { search, min_score } => {
            let config = load_config(&cli.config, &cli.database, &cli.profile)?;
            let mut query = KeywordQuery::from_base(search_query(&search, &config));
            query.min_score = min_score;
            cmd_search(&config, SearchRequest::Keyword(query), cli.json)?;
        }
        Commands::Semantic {
            search,
            max_distance,
            no_distances,
        } => {
            let config = load_config(&cli.config, &cli.database, &cli.profile)?;
            let mut query = SemanticQuery::from_base(search_query(&search, &config))
                .include_distances(!no_distances);
            query.max_distance = max_distance;
            cmd_search(&config, SearchRequest::Semantic(query), cli.json)?;
        }
        Commands::Hybrid {
            search,
            keyword_weight,
            semantic_weight,
            no_normalize,
            explain,
        } => {
            let config = load_config(&cli.config, &cli.database, &cli.profile)?;
            let query = HybridQuery::from_base(search_query(&search, &config))
                .with_weights(
                    keyword_weight.unwrap_or(config.hybrid.keyword_weight),
                    semantic_weight.unwrap_or(config.hybrid.semantic_weight),
                )
                .normalize_scores(config.hybrid.normalize_scores && !no_normalize);
            if explain {
                cmd_explain(&config, &query, cli.json)?;
            } else {
                cmd_search(&config, SearchRequest::Hybrid(query), cli.json)?;
            }
        }
        Commands::Capabilities => {
            let config = load_config(&cli.config, &cli.database, &cli.profile)?;
            cmd_capabilities(&config, cli.json)?;
        }
        Commands::Stats => {
            let config = load_config(&cli.config, &cli.database, &cli.profile)?;
            cmd_stats(&config, cli.json)?;
        }
        Commands::Selftest => {
            let config = load_config(&cli.config, &cli.database, &cli.profile)?;
            cmd_selftest(&config, cli.json)?;
        }
        Commands::Config { action } => {
            cmd_config(&cli.config, &cli.profile, action)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose { "finsearch=debug" } else { "finsearch=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn search_query(args: &SearchArgs, config: &Config) -> SearchQuery {
    let mut query = SearchQuery::new(
        args.query.clone(),
        args.limit.unwrap_or(config.search.default_limit),
    );
    if !args.tickers.is_empty() {
        query = query.with_tickers(args.tickers.iter().cloned());
    }
    if !args.ciks.is_empty() {
        query = query.with_ciks(args.ciks.iter().cloned());
    }
    query
}

fn cmd_search(config: &Config, request: SearchRequest, json: bool) -> Result<()> {
    let context = SearchContext::from_config(config)?;
    let response = context.search(&request);

    if json {
        print_json(&response)?;
    } else {
        print_response(&response);
    }

    Ok(())
}

fn cmd_explain(config: &Config, query: &HybridQuery, json: bool) -> Result<()> {
    #[derive(Serialize)]
    struct Explained<'a> {
        response: &'a SearchResponse,
        report: &'a HybridReport,
    }

    let context = SearchContext::from_config(config)?;
    let (response, report) = context.explain(query);

    if json {
        return print_json(&Explained {
            response: &response,
            report: &report,
        });
    }

    print_response(&response);

    println!("\nQuery analysis");
    println!(
        "  Weights: keyword {:.2}, semantic {:.2} (normalize: {})",
        report.query_analysis.keyword_weight,
        report.query_analysis.semantic_weight,
        report.query_analysis.normalize_scores
    );
    println!("Result composition");
    println!("  Keyword only:  {}", report.composition.keyword_only);
    println!("  Semantic only: {}", report.composition.semantic_only);
    println!("  Both:          {}", report.composition.both);
    if !report.company_distribution.is_empty() {
        println!("Companies");
        for entry in &report.company_distribution {
            println!("  {:>3}  {}", entry.count, entry.company);
        }
    }
    if let (Some(avg), Some((min, max))) = (report.fused_score_avg, report.fused_score_range) {
        println!("Fused scores: avg {:.4}, range [{:.4}, {:.4}]", avg, min, max);
    }

    Ok(())
}

fn cmd_capabilities(config: &Config, json: bool) -> Result<()> {
    let context = SearchContext::from_config(config)?;
    let caps = context.capabilities();

    if json {
        return print_json(&caps);
    }

    println!("Search capabilities");
    println!("  Keyword:  {} ({})", mark(caps.keyword_available), caps.keyword_mode);
    println!("  Semantic: {}", mark(caps.semantic_available));
    println!("    Distance function: {}", mark(caps.distance_function_loaded));
    println!("    Stored vectors:    {}", mark(caps.stored_vectors_present));
    println!("    Embedding client:  {}", mark(caps.embedding_provider_ready));
    println!("  Hybrid:   {}", mark(caps.hybrid_available));
    println!();
    println!("  Chunks:     {}", caps.total_chunks);
    println!("  Embeddings: {}", caps.total_embeddings);
    if let (Some(model), Some(dims)) = (&caps.embedding_model, caps.vector_dimensions) {
        println!("  Model:      {} ({} dims, {})", model, dims, caps.distance_metric);
    }
    if let Some(error) = &caps.error {
        println!("  Error:      {}", error);
    }

    Ok(())
}

fn cmd_stats(config: &Config, json: bool) -> Result<()> {
    let context = SearchContext::from_config(config)?;
    let stats = context.stats();

    if json {
        return print_json(&stats);
    }

    println!("Corpus statistics");
    println!("  Companies:  {}", stats.company_count);
    println!("  Documents:  {}", stats.document_count);
    println!("  Sections:   {}", stats.section_count);
    println!("  Chunks:     {}", stats.chunk_count);
    println!("  Embeddings: {}", stats.embedding_count);

    Ok(())
}

fn cmd_selftest(config: &Config, json: bool) -> Result<()> {
    let context = SearchContext::from_config(config)?;
    let report = context.self_test();

    if json {
        return print_json(&report);
    }

    for (name, check) in [
        ("Keyword", &report.keyword),
        ("Semantic", &report.semantic),
        ("Hybrid", &report.hybrid),
    ] {
        println!(
            "{} {:<8} \"{}\": {} results in {:.2} ms ({})",
            mark(check.working),
            name,
            check.query,
            check.results_found,
            check.elapsed_ms,
            check.status
        );
        if let Some(avg) = check.average_similarity {
            println!("    avg similarity: {:.4}", avg);
        }
        if let Some(avg) = check.average_fused_score {
            println!("    avg fused score: {:.4}", avg);
        }
        if let Some(dist) = &check.method_distribution {
            println!(
                "    keyword only {}, semantic only {}, both {}",
                dist.keyword_only, dist.semantic_only, dist.both
            );
        }
    }

    if !report.all_working() {
        println!("\nSome engines returned no results");
    }

    Ok(())
}

fn cmd_config(
    config_path: &Option<PathBuf>,
    profile: &Option<String>,
    action: ConfigAction,
) -> Result<()> {
    match action {
        ConfigAction::Show { section } => {
            let config = load_config(config_path, &None, profile)?;
            let value = serde_json::to_value(&config).map_err(|e| FinsearchError::Json {
                source: e,
                context: "Failed to serialize config".to_string(),
            })?;

            let value = match section {
                Some(section) => value.get(&section).cloned().ok_or_else(|| {
                    FinsearchError::Config(format!("Unknown config section: {}", section))
                })?,
                None => value,
            };

            print_json(&value)?;
        }
        ConfigAction::Validate { file } => {
            let path = match file.or_else(|| config_path.clone()) {
                Some(path) => path,
                None => Config::default_path()?,
            };
            let config = Config::load(&path)?;
            println!("✓ Configuration is valid");
            println!("  Schema version: {}", config.meta.schema_version);
        }
        ConfigAction::Init { force } => {
            let path = match config_path {
                Some(path) => path.clone(),
                None => Config::default_path()?,
            };

            if path.exists() && !force {
                println!("Configuration file already exists at: {}", path.display());
                println!("Use --force to overwrite");
                return Ok(());
            }

            // Create parent directory
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| FinsearchError::Io {
                    source: e,
                    context: format!("Failed to create config directory: {:?}", parent),
                })?;
            }

            Config::default().save(&path)?;

            println!("✓ Configuration initialized at: {}", path.display());
        }
    }

    Ok(())
}

fn load_config(
    config_path: &Option<PathBuf>,
    database: &Option<PathBuf>,
    profile: &Option<String>,
) -> Result<Config> {
    let path = match config_path {
        Some(path) => path.clone(),
        None => Config::default_path()?,
    };

    let mut config = if path.exists() {
        match profile {
            Some(profile) => Config::load_with_profile(&path, profile)?,
            None => Config::load(&path)?,
        }
    } else {
        tracing::warn!(
            "Config file not found, using defaults. Run 'finsearch config init' to create one."
        );
        let mut config = Config::default();
        config.apply_env_overrides();
        if let Some(profile) = profile {
            config.apply_profile(profile)?;
        }
        config
    };

    if let Some(database) = database {
        config.storage.database_path = database.clone();
    }

    Ok(config)
}

fn print_response(response: &SearchResponse) {
    println!(
        "{} results for \"{}\" ({} search, {:.2} ms)",
        response.total_results, response.query, response.method, response.search_time_ms
    );
    if let Some(error) = response.error() {
        println!("  Error: {}", error);
    } else if let Some(reason) = response
        .explanation
        .as_ref()
        .and_then(|e| e.get("degraded"))
        .and_then(|v| v.as_str())
    {
        println!("  Note: {}", reason);
    }

    for (rank, item) in response.results.iter().enumerate() {
        let score = item
            .fused_score
            .or(item.keyword_score)
            .or(item.semantic_score)
            .map(|s| format!("{:.4}", s))
            .unwrap_or_else(|| "-".to_string());
        let company = item.company_name.as_deref().unwrap_or(&item.cik);

        println!();
        println!(
            "{:>2}. [{}] {} | {} | {}",
            rank + 1,
            score,
            company,
            item.section_name,
            item.filename
        );
        println!("    {}", snippet(&item.chunk_text, 200));
    }
}

fn snippet(text: &str, max_chars: usize) -> String {
    let flat: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        flat
    } else {
        let cut: String = flat.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}

fn mark(ok: bool) -> &'static str {
    if ok {
        "✓"
    } else {
        "✗"
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(|e| FinsearchError::Json {
        source: e,
        context: "Failed to serialize output".to_string(),
    })?;
    println!("{}", json);
    Ok(())
}
