use anyhow::Result;
use axum::Router;
use clap::{Parser, ValueEnum};
use clir_core::language::{GoogleTranslate, GOOGLE_TRANSLATE_URL};
use clir_core::SearchConfig;
use clir_server::{build_app, Languages};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Clone, Copy, ValueEnum)]
enum TranslatorKind {
    /// Google Translate web endpoint
    Google,
    /// Treat every query as already in the corpus language
    None,
}

#[derive(Parser)]
struct Args {
    /// Index directory path
    #[arg(long, default_value = "./index")]
    index: String,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
    /// JSON search config
    #[arg(long)]
    config: Option<String>,
    /// Detection/translation backend
    #[arg(long, value_enum, default_value_t = TranslatorKind::Google)]
    translator: TranslatorKind,
    /// Override the translation endpoint
    #[arg(long, default_value = GOOGLE_TRANSLATE_URL)]
    translate_url: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();
    let config = match &args.config {
        Some(path) => SearchConfig::from_json_file(path)?,
        None => SearchConfig::default(),
    };
    let languages = match args.translator {
        TranslatorKind::Google => {
            let google = Arc::new(GoogleTranslate::with_base_url(&args.translate_url, config.corpus_language.clone(), config.collaborator_timeout())?);
            Languages { detector: google.clone(), translator: google }
        }
        TranslatorKind::None => Languages::offline(&config),
    };
    let app: Router = build_app(args.index.clone(), config, languages)?;

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
