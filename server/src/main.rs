use anyhow::Result;
use axum::Router;
use clap::Parser;
use search_core::{EngineConfig, WeightKind, DEFAULT_TOP_N};
use server::{build_app, ServerSettings};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// Directory holding page_NNN.html files
    #[arg(long, default_value = "data/pages")]
    pages: PathBuf,
    /// Lemma map file
    #[arg(long, default_value = "data/lemmas.txt")]
    lemmas: PathBuf,
    /// Index directory (inverted_index.json and tf_idf/)
    #[arg(long, default_value = "data/index")]
    index: PathBuf,
    /// Rank against lemma-level weights instead of token-level ones
    #[arg(long, default_value_t = false)]
    lemma_weights: bool,
    /// Results returned when the request gives no k
    #[arg(long, default_value_t = DEFAULT_TOP_N)]
    top_n: usize,
    /// Per-query timeout in milliseconds
    #[arg(long, default_value_t = 2000)]
    query_timeout_ms: u64,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();
    let config = EngineConfig {
        pages_dir: args.pages,
        lemmas: args.lemmas,
        index_dir: args.index,
        weight_kind: if args.lemma_weights { WeightKind::Lemmas } else { WeightKind::Tokens },
    };
    let settings = ServerSettings { default_k: args.top_n, query_timeout: Duration::from_millis(args.query_timeout_ms) };
    let app: Router = build_app(&config, settings)?;

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
