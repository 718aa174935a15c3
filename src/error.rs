//! Error taxonomy for the guide-generation pipeline.
//!
//! Errors are grouped by the stage that raises them so callers can decide
//! between "show a message", "retry later" and "give up for this session"
//! without matching on every variant.

use thiserror::Error;

/// Maximum number of slides accepted in a single generation request.
pub const MAX_SLIDES: usize = 100;

pub type Result<T> = std::result::Result<T, GuideError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Input,
    Validation,
    Transport,
    Parsing,
    Session,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GuideError {
    /// The uploaded document could not be read.
    #[error("Failed to extract slide text: {0}")]
    Extraction(String),

    #[error("The document has no pages or slides")]
    EmptyDocument,

    /// A required input was empty (`field` names which one).
    #[error("{field} must not be empty")]
    EmptyInput { field: &'static str },

    #[error("Too many slides: {count} (maximum is {max})")]
    TooManySlides { count: usize, max: usize },

    /// No credential is configured for the generation endpoint.
    #[error("Generation API key is not configured")]
    AuthenticationMissing,

    #[error("Generation endpoint rate limit exceeded")]
    RateLimited,

    #[error("Generation usage limit reached")]
    QuotaExceeded,

    /// Any other non-2xx status (`status` is set) or a network/timeout failure.
    #[error("{}", upstream_message(.status))]
    UpstreamUnavailable { status: Option<u16> },

    #[error("Malformed model response: {0}")]
    MalformedResponse(String),

    #[error("Model returned {received} guides for {expected} slides")]
    SlideCountMismatch { expected: usize, received: usize },

    #[error("Guide at position {expected} is numbered {found}")]
    SlideNumberMismatch { expected: usize, found: u64 },

    #[error("A guide generation is already in progress")]
    GenerationInProgress,
}

fn upstream_message(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!("Generation endpoint unavailable (HTTP {code})"),
        None => "Generation endpoint unreachable".to_string(),
    }
}

impl GuideError {
    pub fn stage(&self) -> Stage {
        match self {
            Self::Extraction(_) | Self::EmptyDocument => Stage::Input,
            Self::EmptyInput { .. } | Self::TooManySlides { .. } => Stage::Validation,
            Self::AuthenticationMissing
            | Self::RateLimited
            | Self::QuotaExceeded
            | Self::UpstreamUnavailable { .. } => Stage::Transport,
            Self::MalformedResponse(_)
            | Self::SlideCountMismatch { .. }
            | Self::SlideNumberMismatch { .. } => Stage::Parsing,
            Self::GenerationInProgress => Stage::Session,
        }
    }

    /// Whether a caller may retry the same request after a backoff.
    ///
    /// Quota and credential failures are terminal for the session; parse
    /// failures are terminal for the attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited | Self::UpstreamUnavailable { .. })
    }

    /// HTTP status used by the guide service for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Extraction(_)
            | Self::EmptyDocument
            | Self::EmptyInput { .. }
            | Self::TooManySlides { .. } => 400,
            Self::AuthenticationMissing => 401,
            Self::QuotaExceeded => 402,
            Self::GenerationInProgress => 409,
            Self::RateLimited => 429,
            Self::UpstreamUnavailable { .. }
            | Self::MalformedResponse(_)
            | Self::SlideCountMismatch { .. }
            | Self::SlideNumberMismatch { .. } => 502,
        }
    }

    /// Message safe to show an end user.
    pub fn user_message(&self) -> String {
        match self {
            Self::RateLimited => "Rate limit exceeded. Please try again in a moment.".to_string(),
            Self::QuotaExceeded => {
                "AI usage limit reached. Please add credits to continue.".to_string()
            }
            Self::MalformedResponse(_) => {
                "Failed to parse AI response. Please try again.".to_string()
            }
            other => other.to_string(),
        }
    }
}
