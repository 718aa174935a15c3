use anyhow::{Context, Result};
use console::{Emoji, style};

use crate::config::Config;
use crate::llm::backend_from_config;
use crate::pipeline::GuidePipeline;
use crate::server::start_server_on;

static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "");
static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "[!] ");

pub async fn run(host: Option<String>, port: Option<u16>) -> Result<()> {
    println!();
    println!("{}", style(" Pitchguide - Guide Server ").bold().reverse());
    println!();

    let config = Config::load_or_default()?;
    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);

    if !config.generation.has_api_key() {
        println!(
            "{}No API key configured; requests will fail with 401 until one is set",
            WARN
        );
    }

    let backend = backend_from_config(&config.generation, None)?;
    let pipeline = GuidePipeline::new(backend, config.generation.timeout());

    let handle = start_server_on(&host, port, pipeline)
        .await
        .with_context(|| format!("Failed to start server on {}:{}", host, port))?;

    println!("{}Serving on {}", ROCKET, style(handle.url()).blue().underlined());
    println!(
        "  {} POST {}/generate-guide",
        style("→").cyan(),
        handle.url()
    );
    println!("  {} GET  {}/health", style("→").cyan(), handle.url());
    println!();
    println!("  Press {} to stop", style("Ctrl-C").yellow());

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    handle.stop();
    println!();

    Ok(())
}
