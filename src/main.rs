use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use semantic_search::config::Config;
use semantic_search::errors;
use semantic_search::search_server::SearchServer;
use semantic_search::security::TokenAuthenticator;
use semantic_search::vector_search::initialize_with;

#[derive(Debug, Parser)]
#[command(name = "semantic-search", version, about = "Rank documents against natural-language queries")]
struct Cli {
    /// Path to a TOML config file (overrides CONFIG_PATH)
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve JSON-RPC search requests on stdin/stdout
    Serve,
    /// Run a single query and print the ranked results as JSON
    Query {
        text: String,
        /// Number of results to return
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    if let Some(path) = &cli.config {
        std::env::set_var("CONFIG_PATH", path);
    }

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            init_logging("info");
            error!("Failed to load configuration: {}", errors::format_user_error(&e));
            std::process::exit(1);
        }
    };

    init_logging(&config.server.log_level);
    info!("Starting {} v{}", config.server.name, config.server.version);
    info!("{}", config.summary());

    let outcome = match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(&config).await,
        Command::Query { text, limit } => query(&config, &text, limit).await,
    };

    if let Err(e) = outcome {
        error!("{}", errors::format_user_error(&e));
        std::process::exit(1);
    }

    Ok(())
}

/// Logs go to stderr; stdout carries protocol responses.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("semantic_search={}", level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn serve(config: &Config) -> Result<()> {
    let auth = if config.auth.require_authentication {
        TokenAuthenticator::from_file(&config.auth.secret_key_path)?
    } else {
        TokenAuthenticator::disabled()
    };

    let server = SearchServer::new(auth);
    let loader = server.start_loading(
        config.embeddings.path.clone(),
        config.corpus.path.clone(),
        config.index_settings(),
    );

    let serving = server.run();
    tokio::pin!(serving);

    tokio::select! {
        result = &mut serving => return result,
        loaded = loader => loaded.context("index loader task failed")??,
    }

    serving.await
}

async fn query(config: &Config, text: &str, limit: Option<usize>) -> Result<()> {
    let embeddings_path = config.embeddings.path.clone();
    let corpus_path = config.corpus.path.clone();
    let settings = config.index_settings();

    let index = tokio::task::spawn_blocking(move || initialize_with(&embeddings_path, &corpus_path, &settings))
        .await
        .context("index loader task failed")??;

    let results = index
        .engine
        .search_with_limit(text, limit.unwrap_or_else(|| index.engine.result_limit()))?;

    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}
