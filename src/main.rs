//! Sonic - streaming chat relay
//!
//! `sonic serve` runs the relay; `sonic chat` is a terminal client for it.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use clap::{Parser, Subcommand};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sonic_chat::client::{terminal, FlushPolicy};
use sonic_chat::config::{fixed_instruction, Config};
use sonic_chat::providers::{OpenAICompatConfig, OpenAICompatProvider};
use sonic_chat::{routes, AppState};

#[derive(Debug, Parser)]
#[command(name = "sonic", version, about = "Streaming chat relay")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the relay server
    Serve,

    /// Chat with a running relay from the terminal
    Chat {
        /// Relay base URL
        #[arg(long, env = "SONIC_URL", default_value = "http://127.0.0.1:3000")]
        url: String,

        /// Flush once more than this many characters are buffered
        #[arg(long, default_value_t = 100)]
        max_chars: usize,

        /// Flush after this many milliseconds without new text
        #[arg(long, default_value_t = 50)]
        idle_ms: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sonic_chat=debug,sonic=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match Cli::parse().command {
        Command::Serve => serve().await,
        Command::Chat {
            url,
            max_chars,
            idle_ms,
        } => {
            let policy = FlushPolicy {
                max_chars,
                idle: Duration::from_millis(idle_ms),
            };
            terminal::run(&url, policy).await
        }
    }
}

async fn serve() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    tracing::debug!(?config, "loaded configuration");
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    let instruction = fixed_instruction(config.prompt_file.as_deref()).await?;
    let provider = OpenAICompatProvider::new(OpenAICompatConfig::from(&config))?;

    let state = AppState {
        provider: Arc::new(provider),
        instruction: Arc::new(instruction),
    };

    let app = Router::new()
        .merge(routes::router())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    tracing::info!(model = %config.model, "Sonic relay running at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
