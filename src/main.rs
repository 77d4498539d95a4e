use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tollgate::config::{LogFormat, LoggingConfig, TollgateConfig};
use tollgate::ratelimit::{Janitor, RateLimiter, Tier};

#[derive(Debug, Parser)]
#[command(name = "tollgate", version, about = "Multi-window rate limiter")]
struct Cli {
    /// Configuration file (YAML, TOML or JSON)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the resolved tier table
    Tiers {
        /// Print YAML instead of JSON
        #[arg(long)]
        yaml: bool,
    },
    /// Run checks for one principal against a fresh limiter
    Simulate {
        #[arg(short, long)]
        principal: String,
        #[arg(short, long, default_value = "free")]
        tier: Tier,
        #[arg(short = 'n', long, default_value_t = 1)]
        requests: u32,
    },
    /// Run the limiter and its janitor until interrupted
    Run,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = TollgateConfig::load(cli.config.as_deref())?;

    init_tracing(&config.logging);

    match cli.command {
        Command::Tiers { yaml } => {
            if yaml {
                print!("{}", serde_yaml::to_string(&config.tiers)?);
            } else {
                println!("{}", serde_json::to_string_pretty(&config.tiers)?);
            }
        }
        Command::Simulate {
            principal,
            tier,
            requests,
        } => {
            let limiter = RateLimiter::from_config(&config);
            for _ in 0..requests {
                let result = limiter.check(&principal, tier);
                let headers: serde_json::Map<String, serde_json::Value> = result
                    .headers()
                    .into_iter()
                    .map(|(name, value)| (name.to_string(), value.into()))
                    .collect();
                println!(
                    "{}",
                    serde_json::json!({ "result": result, "headers": headers })
                );
            }
            println!("{}", serde_json::to_string(&limiter.stats(Some(&principal)))?);
        }
        Command::Run => run(config).await,
    }

    Ok(())
}

async fn run(config: TollgateConfig) {
    info!("Starting Tollgate rate limiter");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let limiter = Arc::new(RateLimiter::from_config(&config));
    let janitor = Janitor::new(limiter.clone(), config.limiter.janitor_interval()).start();

    shutdown_signal().await;

    janitor.shutdown().await;
    info!(
        tracked_principals = limiter.tracked_principals(),
        "Tollgate rate limiter stopped"
    );
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));

    match logging.format {
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_thread_ids(true)
            .with_writer(std::io::stderr)
            .init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init(),
    }
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
