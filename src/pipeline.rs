use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{GuideError, Result};
use crate::guide::{Deck, SlideGuide};
use crate::llm::parsing::parse_guides;
use crate::llm::{GenerationBackend, GuideRequest};
use crate::sanitize::{SanitizedDeck, sanitize, sanitize_json};
use crate::store::GuideStore;

/// Turns slide texts into validated guides using one generation backend.
#[derive(Clone)]
pub struct GuidePipeline {
    backend: Arc<dyn GenerationBackend>,
    timeout: Duration,
}

impl GuidePipeline {
    pub fn new(backend: Arc<dyn GenerationBackend>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    /// Generate guides for plain slide texts.
    pub async fn generate<S: AsRef<str>>(
        &self,
        deck_title: &str,
        slide_texts: &[S],
    ) -> Result<(SanitizedDeck, Vec<SlideGuide>)> {
        let deck = sanitize(deck_title, slide_texts)?;
        let guides = self.generate_sanitized(&deck).await?;
        Ok((deck, guides))
    }

    /// Generate guides for slide texts received as JSON, where non-string
    /// entries count as empty slides.
    pub async fn generate_json(
        &self,
        deck_title: &str,
        slide_texts: &[Value],
    ) -> Result<Vec<SlideGuide>> {
        let deck = sanitize_json(deck_title, slide_texts)?;
        self.generate_sanitized(&deck).await
    }

    /// Generate a deck and store it, unless the session is discarded first.
    ///
    /// Fails with `GenerationInProgress` if the store is already busy. On any
    /// error the store is left as it was.
    pub async fn generate_into<S: AsRef<str>>(
        &self,
        store: &GuideStore,
        deck_title: &str,
        slide_texts: &[S],
    ) -> Result<Option<Arc<Deck>>> {
        let ticket = store.begin()?;
        let (sanitized, guides) = self.generate(deck_title, slide_texts).await?;

        if ticket.commit(Deck::new(sanitized.title, guides)) {
            Ok(store.current())
        } else {
            Ok(None)
        }
    }

    async fn generate_sanitized(&self, deck: &SanitizedDeck) -> Result<Vec<SlideGuide>> {
        info!(
            "Generating guides for {} slides from deck: {}",
            deck.slide_count(),
            deck.title
        );

        let request = GuideRequest::new(deck);

        let raw = tokio::time::timeout(self.timeout, self.backend.generate(&request))
            .await
            .map_err(|_| {
                warn!(
                    "{} backend timed out after {:?}",
                    self.backend.name(),
                    self.timeout
                );
                GuideError::UpstreamUnavailable { status: None }
            })??;

        let guides = parse_guides(&raw, request.slide_count).inspect_err(|e| {
            warn!("Rejected model response: {}", e);
            debug!("Raw model response: {}", raw);
        })?;

        info!("Generated {} guides", guides.len());
        Ok(guides)
    }
}
