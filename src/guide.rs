use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

/// Text of one slide, as extracted from the source document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlideText {
    /// 1-based position in the source deck
    pub index: usize,
    pub raw_text: String,
}

/// Delivery energy suggested for a slide.
///
/// Deserialization is case-insensitive; anything other than high, medium or
/// low is kept as `Unrecognized` so consumers can fall back to a neutral
/// display state instead of rejecting the guide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Energy {
    High,
    Medium,
    Low,
    Unrecognized(String),
}

impl Energy {
    pub fn parse_lenient(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "high" => Energy::High,
            "medium" => Energy::Medium,
            "low" => Energy::Low,
            _ => Energy::Unrecognized(value.trim().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Energy::High => "High",
            Energy::Medium => "Medium",
            Energy::Low => "Low",
            Energy::Unrecognized(raw) => raw,
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Energy::Unrecognized(_))
    }
}

impl fmt::Display for Energy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Energy {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Energy {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Energy::parse_lenient(&raw))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeakerReminder {
    /// Free-form duration such as "90 seconds"
    pub timing: String,
    pub energy: Energy,
}

/// Speaker guidance for one slide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlideGuide {
    pub slide_number: usize,
    pub title: String,
    pub key_talking_points: Vec<String>,
    pub transition_statement: String,
    pub emphasis_topic: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub stats: Vec<String>,
    pub speaker_reminder: SpeakerReminder,
}

/// A generated deck: the title plus one guide per slide, in slide order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deck {
    pub id: String,
    pub title: String,
    pub slide_count: usize,
    pub created_at: DateTime<Utc>,
    pub guides: Vec<SlideGuide>,
}

impl Deck {
    pub fn new(title: impl Into<String>, guides: Vec<SlideGuide>) -> Self {
        Self {
            id: Uuid::new_v4().to_string().replace('-', ""),
            title: title.into(),
            slide_count: guides.len(),
            created_at: Utc::now(),
            guides,
        }
    }
}

/// Rehearsal section label for a slide, based on where it sits in the deck.
pub fn slide_category(slide_number: usize, total: usize) -> &'static str {
    if slide_number == 1 {
        return "VISION & HOOK";
    }
    let position = slide_number as f64 / total.max(1) as f64;
    match position {
        p if p <= 0.2 => "THE PROBLEM",
        p if p <= 0.35 => "OUR SOLUTION",
        p if p <= 0.5 => "PRODUCT DEMO",
        p if p <= 0.65 => "DATA & METRICS",
        p if p <= 0.8 => "BUSINESS MODEL",
        p if p <= 0.9 => "THE TEAM",
        _ => "CALL TO ACTION",
    }
}
