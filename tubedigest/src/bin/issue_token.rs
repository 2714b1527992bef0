// Issue a signed API token for local testing.
//
// Usage: tubedigest-token [--config FILE] <user_id> [ttl_seconds]
// Signs with the secret named by `[auth] jwt_secret_env`, exactly as the server verifies.

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use common::Config;
use tubedigest::auth::{issue_token, signing_secret};

#[derive(Parser, Debug)]
#[command(name = "tubedigest-token", about = "Mint a development API token")]
struct Args {
    /// Path to config.toml
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    user_id: i64,

    /// Token lifetime
    #[arg(default_value_t = 24 * 60 * 60)]
    ttl_seconds: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let args = Args::parse();
    let config = Config::load_from_dir(Path::new("."), args.config.as_deref()).await?;

    let secret = signing_secret(&config.auth);
    println!("{}", issue_token(&secret, args.user_id, args.ttl_seconds)?);
    Ok(())
}
