use anyhow::{Context, Result};
use console::{Emoji, style};
use indicatif::{HumanDuration, ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::warn;

use crate::cli::ExportFormat;
use crate::config::{API_KEY_ENV, Config};
use crate::error::GuideError;
use crate::extract::{deck_title_from_path, extract_file};
use crate::guide::{Deck, Energy, slide_category};
use crate::llm::backend_from_config;
use crate::pipeline::GuidePipeline;
use crate::store::GuideStore;

static PAPER: Emoji<'_, '_> = Emoji("📄 ", "");
static BRAIN: Emoji<'_, '_> = Emoji("🧠 ", "");
static SPARKLE: Emoji<'_, '_> = Emoji("✨ ", "");
static CHECK: Emoji<'_, '_> = Emoji("✅ ", "[OK] ");
static KEY: Emoji<'_, '_> = Emoji("🔑 ", "");

/// Upper bound on a single backoff delay
const MAX_BACKOFF: Duration = Duration::from_secs(30);

pub async fn run(
    path: PathBuf,
    title: Option<String>,
    model: Option<String>,
    output: Option<PathBuf>,
    format: ExportFormat,
    retries: Option<u32>,
) -> Result<()> {
    let started = Instant::now();

    println!();
    println!("{}", style(" Pitchguide - Speaker Guide Generator ").bold().reverse());
    println!();

    let config = Config::load_or_default()?;
    let model_display = model.clone().unwrap_or_else(|| config.generation.model.clone());
    let title = title.unwrap_or_else(|| deck_title_from_path(&path));

    println!("{}Model: {}", BRAIN, style(&model_display).cyan());
    println!("{}Source: {}", PAPER, style(path.display()).cyan());

    let slides = extract_file(&path)?;
    println!(
        "{}Extracted {} slides from {}",
        CHECK,
        style(slides.len()).green().bold(),
        style(&title).cyan()
    );

    let backend = backend_from_config(&config.generation, model.as_deref())?;
    let pipeline = GuidePipeline::new(backend, config.generation.timeout());
    let store = GuideStore::new();

    let texts: Vec<String> = slides.into_iter().map(|s| s.raw_text).collect();
    let policy = RetryPolicy {
        max_retries: retries.unwrap_or(config.generation.max_retries),
        base_delay: config.generation.retry_backoff(),
    };

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template(&format!("{}{{spinner:.green}} {{msg}} [{{elapsed}}]", SPARKLE))?,
    );
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner.set_message("Generating speaker guides...");

    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    let result = generate_until_cancelled(&pipeline, &store, &title, &texts, policy, ctrl_c).await;
    spinner.finish_and_clear();

    let Some(result) = result else {
        anyhow::bail!("Generation cancelled");
    };

    let deck = match result {
        Ok(Some(deck)) => deck,
        Ok(None) => anyhow::bail!("Generation was discarded before it finished"),
        Err(GuideError::AuthenticationMissing) => {
            println!("{}No API key configured. Set one with:", KEY);
            println!("  {} pitchguide auth --key <key>", style("$").dim());
            println!("  {} export {}=<key>", style("$").dim(), API_KEY_ENV);
            println!();
            return Err(GuideError::AuthenticationMissing.into());
        }
        Err(e) => return Err(anyhow::anyhow!(e.user_message())),
    };

    print_summary(&deck);

    if let Some(output) = output {
        let exported = match format {
            ExportFormat::Json => crate::export::export_json(&deck, &output),
            ExportFormat::Markdown => crate::export::export_markdown(&deck, &output),
        };
        exported.with_context(|| format!("Failed to export guides as {}", format))?;

        println!(
            "{}Exported {} to {}",
            CHECK,
            format,
            style(output.display()).cyan()
        );
    }

    println!();
    println!(
        "{}Done in {}",
        SPARKLE,
        style(HumanDuration(started.elapsed())).bold()
    );
    println!();

    Ok(())
}

#[derive(Debug, Clone, Copy)]
struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
}

impl RetryPolicy {
    /// Exponential backoff: base, 2x base, 4x base ... capped
    fn delay(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(MAX_BACKOFF)
    }
}

/// Run one generation into the store, retrying only rate-limit and
/// unavailable-endpoint failures.
async fn generate_with_retry(
    pipeline: &GuidePipeline,
    store: &GuideStore,
    title: &str,
    texts: &[String],
    policy: RetryPolicy,
) -> std::result::Result<Option<Arc<Deck>>, GuideError> {
    let mut attempt = 0;
    loop {
        match pipeline.generate_into(store, title, texts).await {
            Err(e) if e.is_retryable() && attempt < policy.max_retries => {
                let delay = policy.delay(attempt);
                warn!(
                    "{} (attempt {}/{}), retrying in {:?}",
                    e,
                    attempt + 1,
                    policy.max_retries + 1,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            other => return other,
        }
    }
}

/// Generate until `cancel` resolves. Cancelling drops the in-flight request
/// and discards the store, so no later commit can land.
async fn generate_until_cancelled(
    pipeline: &GuidePipeline,
    store: &GuideStore,
    title: &str,
    texts: &[String],
    policy: RetryPolicy,
    cancel: impl Future<Output = ()>,
) -> Option<std::result::Result<Option<Arc<Deck>>, GuideError>> {
    tokio::select! {
        result = generate_with_retry(pipeline, store, title, texts, policy) => Some(result),
        _ = cancel => {
            store.discard();
            None
        }
    }
}

fn print_summary(deck: &Deck) {
    println!();
    println!(
        "{}",
        style(format!(" {} - {} slides ", deck.title, deck.slide_count)).bold()
    );

    for guide in &deck.guides {
        println!();
        println!(
            "  {} {} {}",
            style(format!("{:>3}.", guide.slide_number)).dim(),
            style(&guide.title).bold(),
            style(format!("[{}]", slide_category(guide.slide_number, deck.slide_count))).cyan()
        );
        for point in &guide.key_talking_points {
            println!("       - {}", point);
        }
        println!(
            "       {} {} | {}",
            style("⏱").dim(),
            guide.speaker_reminder.timing,
            energy_style(&guide.speaker_reminder.energy)
        );
    }
}

fn energy_style(energy: &Energy) -> console::StyledObject<&Energy> {
    if energy.is_recognized() {
        style(energy).yellow()
    } else {
        style(energy).dim()
    }
}
