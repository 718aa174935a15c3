use crate::sanitize::SanitizedDeck;

/// System prompt describing the per-slide guide schema
pub const GUIDE_SYSTEM_PROMPT: &str = r#"You are an expert presentation coach. Your job is to analyze slide content and generate helpful speaker guides.

For each slide, you must return a JSON object with exactly this structure:
{
  "slideNumber": number,
  "title": "A concise title for the slide content",
  "keyTalkingPoints": ["3 specific, actionable talking points"],
  "transitionStatement": "A smooth transition phrase to the next slide",
  "emphasisTopic": "The main takeaway or key message to emphasize",
  "keywords": ["3-5 relevant keywords"],
  "stats": ["Any statistics mentioned, or empty array if none"],
  "speakerReminder": {
    "timing": "Suggested time like '90 seconds' or '2 minutes'",
    "energy": "High, Medium, or Low based on content"
  }
}

Be specific, practical, and help the speaker deliver the content with confidence."#;

/// Stand-in text for slides with no extractable content.
pub const EMPTY_SLIDE_PLACEHOLDER: &str = "(Empty slide - suggest a title slide or transition)";

/// A complete generation request for one deck.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuideRequest {
    pub system: String,
    pub user: String,
    /// Number of guides the response must contain
    pub slide_count: usize,
}

impl GuideRequest {
    pub fn new(deck: &SanitizedDeck) -> Self {
        Self {
            system: GUIDE_SYSTEM_PROMPT.to_string(),
            user: guide_user_prompt(deck),
            slide_count: deck.slide_count(),
        }
    }
}

/// User prompt enumerating every slide by its 1-based position.
pub fn guide_user_prompt(deck: &SanitizedDeck) -> String {
    let count = deck.slide_count();
    let slides = deck
        .slide_texts
        .iter()
        .enumerate()
        .map(|(i, text)| {
            let body = if text.trim().is_empty() {
                EMPTY_SLIDE_PLACEHOLDER
            } else {
                text.as_str()
            };
            format!("=== Slide {} ===\n{}", i + 1, body)
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "Analyze these {count} slides from the presentation \"{title}\" and generate speaker guides for each:\n\n\
         {slides}\n\n\
         Return a JSON array with exactly {count} guide objects, one per slide, in slide order. \
         The guide for slide N must have \"slideNumber\": N. \
         Respond ONLY with valid JSON, no markdown or explanation.",
        title = deck.title,
    )
}
