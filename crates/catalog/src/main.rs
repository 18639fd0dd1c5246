use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use catalog::config::{
  DEFAULT_BIND, DEFAULT_COLLECTION, DEFAULT_MODEL_NAME, DEFAULT_QDRANT_URL, DEFAULT_TOP_K,
};
use catalog::embeddings::{loader_for, EmbedderKind, ModelCache};
use catalog::ingest::{run_ingest, IngestOptions};
use catalog::search::{format_results, SearchService};
use catalog::server::{start_server, ServeOptions};
use catalog::{logging, store};

#[derive(Parser)]
#[command(name = "catalog")]
#[command(about = "Catalog - Product Catalog Semantic Search\nIndex delimited product records into Qdrant and query them")]
#[command(version)]
struct Cli {
  /// Enable verbose logging
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Command,
}

/// Model and vector store selection shared by every command
#[derive(Args)]
struct IndexArgs {
  /// Qdrant REST endpoint
  #[arg(long = "qdrant_url", env = "CATALOG_QDRANT_URL", default_value = DEFAULT_QDRANT_URL)]
  qdrant_url: String,

  /// Sentence Transformer model name
  #[arg(long = "model_name", env = "CATALOG_MODEL_NAME", default_value = DEFAULT_MODEL_NAME)]
  model_name: String,

  /// Collection to write or query
  #[arg(long, env = "CATALOG_COLLECTION", default_value = DEFAULT_COLLECTION)]
  collection: String,

  /// Embedding backend
  #[arg(long, value_enum, default_value_t = EmbedderKind::Onnx)]
  embedder: EmbedderKind,
}

#[derive(Subcommand)]
enum Command {
  /// Load a ;-delimited product table, embed every row and replace the collection
  Ingest {
    /// Path to the ;-delimited input table
    #[arg(long = "file_path")]
    file_path: PathBuf,

    #[command(flatten)]
    index: IndexArgs,
  },
  /// Serve the semantic search web front end
  Serve {
    #[command(flatten)]
    index: IndexArgs,

    /// Server bind address
    #[arg(long, env = "CATALOG_BIND", default_value = DEFAULT_BIND)]
    bind: SocketAddr,

    /// Results per query
    #[arg(short, long, default_value_t = DEFAULT_TOP_K, value_parser = parse_limit)]
    limit: usize,
  },
  /// Run one query and print the formatted results
  Search {
    #[command(flatten)]
    index: IndexArgs,

    /// Results per query
    #[arg(short, long, default_value_t = DEFAULT_TOP_K, value_parser = parse_limit)]
    limit: usize,

    /// Query terms (space-separated)
    #[arg(required = true)]
    terms: Vec<String>,
  },
}

/// Result count must be a positive integer
fn parse_limit(value: &str) -> Result<usize, String> {
  match value.parse::<usize>() {
    Ok(0) => Err("limit must be at least 1".to_string()),
    Ok(limit) => Ok(limit),
    Err(e) => Err(format!("invalid limit '{value}': {e}")),
  }
}

fn model_cache(embedder: EmbedderKind) -> Arc<ModelCache> {
  Arc::new(ModelCache::new(loader_for(embedder)))
}

async fn handle(command: Command) -> Result<()> {
  match command {
    Command::Ingest { file_path, index } => {
      let cache = model_cache(index.embedder);
      let options = IngestOptions {
        file_path,
        qdrant_url: index.qdrant_url,
        model_name: index.model_name,
        collection: index.collection,
      };
      run_ingest(&options, &cache).await?;
      Ok(())
    }
    Command::Serve { index, bind, limit } => {
      let cache = model_cache(index.embedder);
      let options = ServeOptions {
        bind,
        qdrant_url: index.qdrant_url,
        model_name: index.model_name,
        collection: index.collection,
        limit,
      };
      start_server(options, cache).await
    }
    Command::Search { index, limit, terms } => {
      let cache = model_cache(index.embedder);
      let client = Arc::new(store::initialize(&index.qdrant_url).await?);
      let service =
        SearchService::new(cache, client, index.model_name, index.collection).with_limit(limit);

      let results = service.search(&terms.join(" ")).await?;
      print!("{}", format_results(&results));
      Ok(())
    }
  }
}

#[tokio::main]
async fn main() -> Result<()> {
  let cli = Cli::parse();
  logging::init(cli.verbose);

  handle(cli.command).await
}
