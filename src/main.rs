mod cli;
mod config;
mod error;
mod export;
mod extract;
mod guide;
mod llm;
mod pipeline;
mod sanitize;
mod server;
mod store;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing - only show warnings by default, use RUST_LOG=info for more detail
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { force } => {
            cli::commands::init::run(force).await?;
        }
        Commands::Auth { key, show } => {
            cli::commands::auth::run(key, show).await?;
        }
        Commands::Extract { path, json } => {
            cli::commands::extract::run(path, json).await?;
        }
        Commands::Generate {
            path,
            title,
            model,
            output,
            format,
            retries,
        } => {
            cli::commands::generate::run(path, title, model, output, format, retries).await?;
        }
        Commands::Serve { host, port } => {
            cli::commands::serve::run(host, port).await?;
        }
        Commands::Doctor => {
            cli::commands::doctor::run().await?;
        }
    }

    Ok(())
}
