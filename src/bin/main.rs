use std::path::PathBuf;

use anyhow::{Result, anyhow};
use axum::Router;
use axum::http::Method;
use clap::{Parser, Subcommand};
use community_gate::{Overrides, PolicyTable, TokenCodec, UserId, load_server_config};
use tracing::{Level, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "community-gate")]
#[command(about = "Token authentication and request gating for the community backend")]
struct Cli {
    /// Path to a JSON config file (default: $COMMUNITY_CONFIG or ./community.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Base64-encoded HS256 signing key
    #[arg(long, global = true, env = "JWT_SECRET", hide_env_values = true)]
    jwt_secret: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Bind address, e.g. 0.0.0.0:8080
        #[arg(long)]
        bind: Option<String>,
        /// Directory served under /uploads
        #[arg(long)]
        uploads_dir: Option<PathBuf>,
    },
    /// Issue a token for an account id
    IssueToken {
        #[arg(long)]
        user_id: i64,
    },
    /// Show how the route policy classifies a request
    Classify { method: String, path: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("community_gate=info".parse()?)
                .add_directive("tower_http=info".parse()?),
        )
        .with_max_level(Level::INFO)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { bind, uploads_dir } => {
            let config = load_server_config(
                cli.config.as_deref(),
                Overrides {
                    jwt_secret: cli.jwt_secret,
                    bind,
                    uploads_dir,
                },
            )?;
            info!("Starting community gate with {:?}", config);

            community_gate::start_http(config, Router::new()).await?;
        }
        Commands::IssueToken { user_id } => {
            let config = load_server_config(
                cli.config.as_deref(),
                Overrides {
                    jwt_secret: cli.jwt_secret,
                    ..Default::default()
                },
            )?;
            let codec = TokenCodec::from_base64_secret(&config.jwt_secret)?;
            let token = codec
                .issue(UserId::new(user_id))
                .map_err(|e| anyhow!("Could not issue token: {}", e.reason()))?;

            println!("{}", token);
        }
        Commands::Classify { method, path } => {
            let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
                .map_err(|_| anyhow!("Invalid HTTP method: {}", method))?;
            let access = PolicyTable::community().classify(&method, &path);

            println!("{} {} -> {}", method, path, access);
        }
    }

    Ok(())
}
