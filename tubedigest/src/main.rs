/*
tubedigest - server binary
Starts the Rocket HTTP API backed by the video resolver, the summary generator and the SQLite summary store.
*/

use anyhow::Result;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use common::{init_db_pool, Config};

use tubedigest::auth::{signing_secret, TokenVerifier};
use tubedigest::llm::remote::RemoteLlmProvider;
use tubedigest::llm::summarizer::SummaryGenerator;
use tubedigest::llm::CompletionProvider;
use tubedigest::server::{launch_rocket, AppState};
use tubedigest::service::SummaryService;
use tubedigest::storage::{self, SummaryStore};
use tubedigest::video::VideoInfoResolver;

#[derive(Parser, Debug)]
#[command(name = "tubedigest", about = "TubeDigest video summary server")]
struct Args {
    /// Path to config.toml
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override log level (info, debug, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    // RUST_LOG wins over --log-level when set
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&args.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let config = Config::load_from_dir(Path::new("."), args.config.as_deref())
        .await
        .map_err(|e| {
            error!(error = %e, "failed to load configuration");
            e
        })?;
    info!(config = ?args.config, "configuration loaded");

    let pool = init_db_pool(&config.database.path).await?;
    storage::ensure_schema(&pool).await?;
    info!(db_path = %config.database.path, "database ready");

    let provider: Option<Arc<dyn CompletionProvider>> = match config.llm.api_key() {
        Some(key) => {
            let provider = RemoteLlmProvider::from_config(&config.llm, key);
            info!(model = %provider.model(), "AI summaries enabled");
            Some(Arc::new(provider) as Arc<dyn CompletionProvider>)
        }
        None => {
            warn!(
                env = %config.llm.api_key_env,
                "no completion API key set, using extractive summaries only"
            );
            None
        }
    };
    let generator = SummaryGenerator::new(provider, config.llm.max_tokens);

    let resolver = VideoInfoResolver::new(&config.video)?;
    info!(sources = ?resolver.source_names(), "video resolver ready");

    let service = SummaryService::new(resolver, generator, SummaryStore::new(pool));

    let secret = signing_secret(&config.auth);
    let verifier = TokenVerifier::new(&secret);

    let state = AppState::new(
        Arc::new(service),
        Arc::new(verifier),
        config.server.request_timeout(),
    );

    launch_rocket(state, &config.server).await
}
