use anyhow::Result;
use console::{Emoji, style};
use std::path::PathBuf;

use crate::extract::{deck_title_from_path, extract_file};

static PAPER: Emoji<'_, '_> = Emoji("📄 ", "");

pub async fn run(path: PathBuf, json: bool) -> Result<()> {
    let slides = extract_file(&path)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&slides)?);
        return Ok(());
    }

    println!();
    println!("{}", style(" Pitchguide - Slide Text ").bold().reverse());
    println!();
    println!(
        "{}{} ({} slides)",
        PAPER,
        style(deck_title_from_path(&path)).cyan().bold(),
        slides.len()
    );

    for slide in &slides {
        println!();
        println!("{}", style(format!("=== Slide {} ===", slide.index)).bold());
        if slide.raw_text.trim().is_empty() {
            println!("{}", style("(no text)").dim());
        } else {
            println!("{}", slide.raw_text);
        }
    }
    println!();

    Ok(())
}
