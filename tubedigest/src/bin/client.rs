// Command-line client for the TubeDigest API.

use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use tubedigest::client::{ApiClient, ClientError, Summary, DEFAULT_API_URL};

#[derive(Parser, Debug)]
#[command(name = "tubedigest-client", about = "Summarize YouTube videos through a TubeDigest server")]
struct Args {
    /// Base URL of the API
    #[arg(long, env = "API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Bearer token issued for your account
    #[arg(long, env = "TUBEDIGEST_TOKEN")]
    token: Option<String>,

    /// Per-request deadline
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Summarize a video and store it in your history
    Summarize { url: String },
    /// Show your whole summary history
    List,
    /// Show summaries from the last 7 days
    Recent,
    /// Show history statistics
    Stats,
    /// Delete one summary
    Delete { id: i64 },
    /// Delete your whole history
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let args = Args::parse();
    let client = ApiClient::new(&args.api_url, args.token)
        .with_deadline(Duration::from_secs(args.timeout_secs));

    if let Err(e) = run(&client, args.command).await {
        if e.is_retryable() {
            eprintln!("error: {} (retryable)", e);
        } else {
            eprintln!("error: {}", e);
        }
        std::process::exit(1);
    }
    Ok(())
}

async fn run(client: &ApiClient, command: Command) -> Result<(), ClientError> {
    match command {
        Command::Summarize { url } => print_summary(&client.summarize(&url).await?),
        Command::List => print_all(&client.list().await?),
        Command::Recent => print_all(&client.recent().await?),
        Command::Stats => {
            let stats = client.stats().await?;
            println!("total:  {}", stats.total_summaries);
            println!("recent: {}", stats.recent_summaries);
            match stats.last_summary {
                Some(at) => println!("last:   {}", at.format("%Y-%m-%d %H:%M")),
                None => println!("last:   never"),
            }
        }
        Command::Delete { id } => {
            client.delete(id).await?;
            println!("deleted summary {}", id);
        }
        Command::Clear => {
            client.clear_history().await?;
            println!("history cleared");
        }
    }
    Ok(())
}

fn print_all(summaries: &[Summary]) {
    if summaries.is_empty() {
        println!("no summaries yet");
        return;
    }
    for s in summaries {
        print_summary(s);
        println!();
    }
}

fn print_summary(s: &Summary) {
    println!("[{}] {} ({})", s.id, s.title, s.duration);
    println!("    {}", s.video_url);
    println!("    {}", s.created_at.format("%Y-%m-%d %H:%M"));
    println!("{}", s.summary);
}
