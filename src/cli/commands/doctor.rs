use anyhow::Result;
use console::{Emoji, style};
use std::time::Duration;

use crate::config::{API_KEY_ENV, CONFIG_DIR_ENV, Config};

static DOCTOR: Emoji<'_, '_> = Emoji("🩺 ", "");
static PASS: Emoji<'_, '_> = Emoji("✅ ", "[OK] ");
static FAIL: Emoji<'_, '_> = Emoji("❌ ", "[!!] ");
static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "[!] ");
static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "[i] ");
static ARROW: Emoji<'_, '_> = Emoji("   → ", "  -> ");

pub async fn run() -> Result<()> {
    println!();
    println!("{}", style(" Pitchguide Doctor ").bold().reverse());
    println!();
    println!("{}Running diagnostics...", DOCTOR);
    println!();

    let mut pass_count: u32 = 0;
    let mut fail_count: u32 = 0;
    let mut warn_count: u32 = 0;

    // ── 1. Binary version ────────────────────────────────────────────
    print_section("Binary");
    pass(
        &format!("pitchguide {}", env!("CARGO_PKG_VERSION")),
        &mut pass_count,
    );

    // ── 2. Config file ───────────────────────────────────────────────
    print_section("Configuration");

    let config_path = Config::config_path().ok();

    let config = match config_path {
        Some(ref path) if path.exists() => {
            pass(
                &format!("Config found at {}", style(path.display()).dim()),
                &mut pass_count,
            );
            match Config::load() {
                Ok(c) => {
                    pass(
                        &format!("Config is valid TOML (model: {})", c.generation.model),
                        &mut pass_count,
                    );
                    Some(c)
                }
                Err(e) => {
                    fail(&format!("Config parse error: {:#}", e), &mut fail_count);
                    hint("Run: pitchguide init --force");
                    None
                }
            }
        }
        Some(_) => {
            warn("Config file not found, using defaults", &mut warn_count);
            hint("Run: pitchguide init");
            Config::load_or_default().ok()
        }
        None => {
            fail("Cannot determine config directory", &mut fail_count);
            hint(&format!("Set {} to choose one", CONFIG_DIR_ENV));
            None
        }
    };

    // ── 3. Credentials ───────────────────────────────────────────────
    print_section("Credentials");

    match config {
        Some(ref config) if config.generation.has_api_key() => {
            pass("API key configured", &mut pass_count);
        }
        Some(_) => {
            fail("No API key configured", &mut fail_count);
            hint(&format!(
                "Run: pitchguide auth --key <key>, or set {}",
                API_KEY_ENV
            ));
        }
        None => warn("Skipping credential check (no config)", &mut warn_count),
    }

    // ── 4. Generation endpoint ───────────────────────────────────────
    print_section("Generation Endpoint");

    if let Some(ref config) = config {
        let base_url = config.generation.base_url.trim_end_matches('/');
        match check_http_get(base_url).await {
            Ok(status) => pass(
                &format!("Endpoint reachable at {} (HTTP {})", base_url, status),
                &mut pass_count,
            ),
            Err(()) => {
                fail(
                    &format!("Endpoint not reachable at {}", base_url),
                    &mut fail_count,
                );
                hint("Check base_url in the config file and your network connection");
            }
        }
        info(&format!(
            "Model: {} (timeout {}s, {} retries)",
            config.generation.model, config.generation.timeout_secs, config.generation.max_retries
        ));

        // ── 5. Server port ───────────────────────────────────────────
        print_section("Server");

        let addr = format!("{}:{}", config.server.host, config.server.port);
        match std::net::TcpListener::bind(&addr) {
            Ok(_) => pass(&format!("Port available ({})", addr), &mut pass_count),
            Err(e) => {
                warn(&format!("Cannot bind {}: {}", addr, e), &mut warn_count);
                hint("Pick another one: pitchguide serve --port <port>");
            }
        }
    } else {
        warn("Skipping endpoint checks (no config)", &mut warn_count);
    }

    // ── 6. System info ───────────────────────────────────────────────
    print_section("System");

    info(&format!(
        "OS: {} {}",
        std::env::consts::OS,
        std::env::consts::ARCH
    ));

    if let Ok(cwd) = std::env::current_dir() {
        info(&format!("Working directory: {}", cwd.display()));
    }

    if let Some(ref path) = config_path {
        info(&format!("Config path: {}", path.display()));
    }

    // ── Summary ──────────────────────────────────────────────────────
    println!();
    println!("{}", style("━".repeat(50)).dim());
    println!();

    let total = pass_count + fail_count + warn_count;
    print!(
        "  {} {} passed",
        style(pass_count).green().bold(),
        if pass_count == 1 { "check" } else { "checks" }
    );
    if warn_count > 0 {
        print!(
            ", {} {}",
            style(warn_count).yellow().bold(),
            if warn_count == 1 { "warning" } else { "warnings" }
        );
    }
    if fail_count > 0 {
        print!(
            ", {} {}",
            style(fail_count).red().bold(),
            if fail_count == 1 { "failure" } else { "failures" }
        );
    }
    println!(" ({}  total)", total);
    println!();

    if fail_count > 0 {
        println!(
            "  {}",
            style("Some checks failed. Fix the issues above and re-run:").red()
        );
        println!("    {} pitchguide doctor", style("$").dim());
    } else if warn_count > 0 {
        println!(
            "  {}",
            style("Everything essential works, but there are some warnings.").yellow()
        );
    } else {
        println!(
            "  {}",
            style("All checks passed! You're ready to go.").green().bold()
        );
    }
    println!();

    Ok(())
}

// ── Helpers ──────────────────────────────────────────────────────────

fn print_section(name: &str) {
    println!("  {}", style(name).bold().underlined());
}

fn pass(msg: &str, count: &mut u32) {
    println!("  {}{}", PASS, msg);
    *count += 1;
}

fn fail(msg: &str, count: &mut u32) {
    println!("  {}{}", FAIL, style(msg).red());
    *count += 1;
}

fn warn(msg: &str, count: &mut u32) {
    println!("  {}{}", WARN, style(msg).yellow());
    *count += 1;
}

fn info(msg: &str) {
    println!("  {}{}", INFO, style(msg).dim());
}

fn hint(msg: &str) {
    println!("{}{}", ARROW, style(msg).dim());
}

/// Any HTTP response counts as reachable; only transport failures do not
async fn check_http_get(url: &str) -> Result<u16, ()> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .map_err(|_| ())?;

    client
        .get(url)
        .send()
        .await
        .map(|r| r.status().as_u16())
        .map_err(|_| ())
}
