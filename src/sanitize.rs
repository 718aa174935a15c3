//! Size, count and character limits applied to a deck before it is sent for
//! generation.
//!
//! Sanitizing is idempotent: feeding a [`SanitizedDeck`] back through
//! [`sanitize`] yields the same title and texts.

use serde_json::Value;

use crate::error::{GuideError, MAX_SLIDES, Result};

pub const MAX_TITLE_CHARS: usize = 200;
pub const MAX_SLIDE_CHARS: usize = 5000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizedDeck {
    pub title: String,
    pub slide_texts: Vec<String>,
}

impl SanitizedDeck {
    pub fn slide_count(&self) -> usize {
        self.slide_texts.len()
    }
}

/// Validate and normalize a deck title and its slide texts.
pub fn sanitize<S: AsRef<str>>(deck_title: &str, slide_texts: &[S]) -> Result<SanitizedDeck> {
    sanitize_entries(deck_title, slide_texts.iter().map(|s| Some(s.as_ref())))
}

/// Same as [`sanitize`], for slide texts that arrived as arbitrary JSON.
///
/// Entries that are not strings become empty slides instead of failing the
/// whole batch.
pub fn sanitize_json(deck_title: &str, slide_texts: &[Value]) -> Result<SanitizedDeck> {
    sanitize_entries(deck_title, slide_texts.iter().map(Value::as_str))
}

fn sanitize_entries<'a, I>(deck_title: &str, entries: I) -> Result<SanitizedDeck>
where
    I: ExactSizeIterator<Item = Option<&'a str>>,
{
    let title = sanitize_title(deck_title);
    if title.is_empty() {
        return Err(GuideError::EmptyInput { field: "deckTitle" });
    }

    let count = entries.len();
    if count == 0 {
        return Err(GuideError::EmptyInput { field: "slideTexts" });
    }
    if count > MAX_SLIDES {
        return Err(GuideError::TooManySlides {
            count,
            max: MAX_SLIDES,
        });
    }

    let slide_texts = entries
        .map(|entry| entry.map(sanitize_slide_text).unwrap_or_default())
        .collect();

    Ok(SanitizedDeck { title, slide_texts })
}

fn sanitize_title(title: &str) -> String {
    let stripped: String = title.chars().filter(|c| !c.is_control()).collect();
    truncate_chars(stripped.trim(), MAX_TITLE_CHARS)
        .trim_end()
        .to_string()
}

fn sanitize_slide_text(text: &str) -> String {
    let stripped: String = text
        .chars()
        .filter(|&c| c == '\n' || c == '\t' || !c.is_control())
        .collect();
    truncate_chars(&stripped, MAX_SLIDE_CHARS).to_string()
}

fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((byte_idx, _)) => &s[..byte_idx],
        None => s,
    }
}
