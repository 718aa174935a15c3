use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::guide::{Deck, slide_category};

/// Export a deck to a pretty-printed JSON file
pub fn export_json(deck: &Deck, path: &Path) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("Failed to create file: {}", path.display()))?;
    let writer = BufWriter::new(file);

    serde_json::to_writer_pretty(writer, deck).context("Failed to write JSON")?;

    Ok(())
}

/// Export a deck as a Markdown rehearsal sheet
pub fn export_markdown(deck: &Deck, path: &Path) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("Failed to create file: {}", path.display()))?;
    let mut writer = BufWriter::new(file);

    write_markdown(deck, &mut writer)?;
    writer.flush()?;

    Ok(())
}

/// Render a deck as Markdown into any writer
pub fn write_markdown<W: Write>(deck: &Deck, writer: &mut W) -> Result<()> {
    writeln!(writer, "# {}", deck.title)?;
    writeln!(writer)?;
    writeln!(
        writer,
        "_{} slides, generated {}_",
        deck.slide_count,
        deck.created_at.format("%Y-%m-%d %H:%M UTC")
    )?;

    for guide in &deck.guides {
        writeln!(writer)?;
        writeln!(
            writer,
            "## Slide {}: {} ({})",
            guide.slide_number,
            guide.title,
            slide_category(guide.slide_number, deck.slide_count)
        )?;
        writeln!(writer)?;

        writeln!(writer, "**Key talking points**")?;
        writeln!(writer)?;
        for point in &guide.key_talking_points {
            writeln!(writer, "- {}", point)?;
        }
        writeln!(writer)?;

        writeln!(writer, "**Emphasize:** {}", guide.emphasis_topic)?;
        if !guide.keywords.is_empty() {
            writeln!(writer, "**Keywords:** {}", guide.keywords.join(", "))?;
        }
        if !guide.stats.is_empty() {
            writeln!(writer, "**Stats:** {}", guide.stats.join("; "))?;
        }
        writeln!(
            writer,
            "**Timing:** {} | **Energy:** {}",
            guide.speaker_reminder.timing, guide.speaker_reminder.energy
        )?;
        writeln!(writer)?;
        writeln!(writer, "> {}", guide.transition_statement)?;
    }

    Ok(())
}
