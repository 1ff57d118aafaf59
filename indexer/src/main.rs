use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use clir_core::ingest::ingest;
use clir_core::persist::{prune_snapshots, save_index, IndexPaths};
use clir_core::source::{CsvFileSource, DatasetSource, HttpCsvSource};
use clir_core::tokenizer::Analyzer;
use clir_core::{Field, SearchConfig};
use std::time::Duration;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build a BM25 index from a title/content CSV dataset", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest a dataset and write the index snapshot
    Build(BuildArgs),
}

#[derive(Args)]
struct BuildArgs {
    /// Local CSV file, or a directory of CSV files
    #[arg(long, conflicts_with = "url")]
    input: Option<String>,
    /// Remote CSV to download
    #[arg(long)]
    url: Option<String>,
    /// Output index directory
    #[arg(long)]
    output: String,
    /// JSON search config (defaults apply to missing keys)
    #[arg(long)]
    config: Option<String>,
    /// Override the ingestion cap
    #[arg(long)]
    max_docs: Option<usize>,
    /// Fail on rows with a blank title or content instead of dropping them
    #[arg(long, default_value_t = false)]
    keep_incomplete: bool,
    /// Apply English stemming to index and query terms
    #[arg(long, default_value_t = false)]
    stem: bool,
    /// Remove English stopwords from index and query terms
    #[arg(long, default_value_t = false)]
    stopwords: bool,
    /// Download timeout for --url
    #[arg(long, default_value_t = 60)]
    timeout_secs: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build(args) => build_index(args).await,
    }
}

async fn build_index(args: BuildArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => SearchConfig::from_json_file(path)?,
        None => SearchConfig::default(),
    };
    if let Some(max_docs) = args.max_docs {
        config.max_docs = max_docs;
    }
    if args.keep_incomplete {
        config.drop_incomplete = false;
    }
    config.validate()?;

    let source: Box<dyn DatasetSource> = match (&args.input, &args.url) {
        (Some(input), None) => Box::new(CsvFileSource::new(input)),
        (None, Some(url)) => Box::new(HttpCsvSource::new(url.clone(), Duration::from_secs(args.timeout_secs))?),
        _ => bail!("exactly one of --input or --url is required"),
    };
    let analyzer = Analyzer { stem: args.stem, stopwords: args.stopwords };

    let index = ingest(source.as_ref(), &config, analyzer).await?;
    for field in Field::ALL {
        let stats = index.stats(field);
        tracing::info!(%field, docs = stats.doc_count, avgdl = stats.avg_doc_len, terms = index.field(field).num_terms(), "field indexed");
    }

    let paths = IndexPaths::new(&args.output);
    let meta = save_index(&paths, &index)?;
    let pruned = prune_snapshots(&paths)?;
    tracing::info!(output = %args.output, num_docs = meta.num_docs, created_at = %meta.created_at, pruned, "index build complete");
    Ok(())
}
