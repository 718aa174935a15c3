use anyhow::{Context, Result};
use console::{Emoji, style};
use std::fs;
use std::io::{self, Write};

use crate::config::{API_KEY_ENV, Config};

static KEY: Emoji<'_, '_> = Emoji("🔑 ", "");
static CHECK: Emoji<'_, '_> = Emoji("✅ ", "[OK] ");
static CROSS: Emoji<'_, '_> = Emoji("❌ ", "[X] ");

pub async fn run(key: Option<String>, show: bool) -> Result<()> {
    println!();
    println!("{}", style(" Pitchguide - Authentication ").bold().reverse());
    println!();

    if show {
        return show_status();
    }

    let api_key = match key {
        Some(k) => k.trim().to_string(),
        None => prompt_api_key()?,
    };

    if api_key.is_empty() {
        anyhow::bail!("API key cannot be empty");
    }

    save_api_key(&api_key)?;

    println!("{}API key configured successfully!", CHECK);

    Ok(())
}

fn show_status() -> Result<()> {
    let (configured, detail) = key_status()?;

    let (icon, text) = if configured {
        (CHECK, style("Configured").green())
    } else {
        (CROSS, style("Not configured").red())
    };
    println!("  {}{:<12} {} {}", icon, "API key", text, style(detail).dim());

    if !configured {
        println!();
        println!("{}Set the key with:", KEY);
        println!("  {} pitchguide auth --key <key>", style("$").dim());
        println!("  {} export {}=<key>", style("$").dim(), API_KEY_ENV);
    }

    Ok(())
}

/// Where the key comes from, without ever exposing it.
fn key_status() -> Result<(bool, String)> {
    let config_path = Config::config_path()?;

    if config_path.exists() {
        let content = fs::read_to_string(&config_path).context("Failed to read config file")?;
        let raw: Config = toml::from_str(&content).context("Failed to parse config file")?;
        let stored = raw.generation.api_key.trim();
        if !stored.is_empty() && !stored.starts_with('$') {
            return Ok((true, "(from config)".to_string()));
        }
    }

    if let Ok(val) = std::env::var(API_KEY_ENV)
        && !val.trim().is_empty()
    {
        return Ok((true, format!("(from {})", API_KEY_ENV)));
    }

    Ok((false, String::new()))
}

fn prompt_api_key() -> Result<String> {
    print!("{} Enter your API key: ", style("?").green().bold());
    io::stdout().flush()?;

    let mut api_key = String::new();
    io::stdin().read_line(&mut api_key)?;
    Ok(api_key.trim().to_string())
}

fn save_api_key(api_key: &str) -> Result<()> {
    let config_path = Config::config_path()?;

    if !config_path.exists() {
        anyhow::bail!("Configuration not found. Run 'pitchguide init' first.");
    }

    let content = fs::read_to_string(&config_path).context("Failed to read config file")?;

    // Parse without env expansion so other ${VAR} references survive the rewrite
    let mut config: Config = toml::from_str(&content).context("Failed to parse config file")?;
    config.generation.api_key = api_key.to_string();

    fs::write(&config_path, toml::to_string_pretty(&config)?)
        .context("Failed to write config file")?;

    Ok(())
}
