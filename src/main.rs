use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use coderag_core::CodeRag;
use coderag_core::bootstrap::resolve_config_path;
use coderag_core::config::Config;
use coderag_core::service::QueryResponse;

#[derive(Parser)]
#[command(
    name = "coderag",
    version,
    about = "Ask natural-language questions about a source repository"
)]
struct Cli {
    /// Config file (falls back to `CODERAG_CONFIG`, then `config/default.toml`)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Index a local source tree, replacing the previous index
    Ingest {
        /// Root directory of the repository
        path: PathBuf,
    },
    /// Answer a question from the indexed code
    Query {
        question: String,
        /// Number of matches to retrieve (config `index.top_k` when omitted)
        #[arg(short, long)]
        k: Option<usize>,
        /// Print the full response as JSON
        #[arg(long)]
        json: bool,
    },
    /// Report whether an index exists and what it holds
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_subscriber();

    let cli = Cli::parse();
    let config_path = resolve_config_path(cli.config.as_deref());
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;
    tracing::debug!(path = %config_path.display(), "config loaded");

    let rag = CodeRag::from_config(&config);

    match cli.command {
        Commands::Ingest { path } => {
            let report = rag.ingest(&path).await?;
            tracing::info!(
                files_scanned = report.files_scanned,
                files_skipped = report.files_skipped,
                fallback_embeddings = report.fallback_embeddings,
                duration_ms = report.duration_ms,
                "ingest finished"
            );
            let out = serde_json::json!({
                "status": "ingestion complete",
                "files": report.file_count,
                "chunks": report.chunk_count,
            });
            println!("{out}");
        }
        Commands::Query { question, k, json } => {
            let response = rag.query(&question, k).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                print_response(&response);
            }
        }
        Commands::Status => {
            let report = rag.status().await?;
            let out = serde_json::json!({
                "status": "ok",
                "data_dir": report.data_dir,
                "index": report.index,
                "embedding_mode": report.embedding_mode,
                "answer_provider": report.answer_provider,
                "default_top_k": report.default_top_k,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
    }

    Ok(())
}

fn print_response(response: &QueryResponse) {
    println!("{}", response.answer);
    if response.matches.is_empty() {
        return;
    }
    println!("\nMatches:");
    for (i, m) in response.matches.iter().enumerate() {
        println!(
            "{}. {} lines {}-{} (distance {:.4})",
            i + 1,
            m.chunk.file,
            m.chunk.start_line,
            m.chunk.end_line,
            m.score
        );
    }
}

/// Logs go to stderr so command output on stdout stays machine-readable.
fn init_subscriber() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_query_with_k_and_json() {
        let cli = Cli::parse_from(["coderag", "query", "where?", "-k", "3", "--json"]);
        match cli.command {
            Commands::Query { question, k, json } => {
                assert_eq!(question, "where?");
                assert_eq!(k, Some(3));
                assert!(json);
            }
            _ => panic!("expected query"),
        }
    }

    #[test]
    fn config_flag_is_global() {
        let cli = Cli::parse_from(["coderag", "status", "--config", "x.toml"]);
        assert_eq!(cli.config, Some(PathBuf::from("x.toml")));
        assert!(matches!(cli.command, Commands::Status));
    }

    #[test]
    fn ingest_takes_path() {
        let cli = Cli::parse_from(["coderag", "ingest", "./repo"]);
        assert!(matches!(cli.command, Commands::Ingest { path } if path == PathBuf::from("./repo")));
    }
}
