//! Session-scoped holder of the current deck.
//!
//! The store is written only through a [`GenerationTicket`], and only one
//! ticket exists at a time, so there is a single writer and the deck is
//! always either absent or complete. `discard` (the user navigated away)
//! invalidates any ticket in flight: its result is dropped on commit.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, info};

use crate::error::{GuideError, Result};
use crate::guide::Deck;

#[derive(Debug, Clone, Default)]
pub struct GuideStore {
    inner: Arc<StoreInner>,
}

#[derive(Debug, Default)]
struct StoreInner {
    deck: RwLock<Option<Arc<Deck>>>,
    /// Bumped on every discard; tickets from an older epoch are stale
    epoch: AtomicU64,
    in_flight: AtomicBool,
}

/// Permission to replace the store's deck once, obtained before generating.
#[derive(Debug)]
#[must_use = "dropping a ticket abandons the generation"]
pub struct GenerationTicket {
    store: GuideStore,
    epoch: u64,
}

impl GuideStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve the store for a generation, or fail if one is already running.
    pub fn begin(&self) -> Result<GenerationTicket> {
        self.inner
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| GuideError::GenerationInProgress)?;

        Ok(GenerationTicket {
            store: self.clone(),
            epoch: self.inner.epoch.load(Ordering::Acquire),
        })
    }

    /// The current deck, if one has been generated.
    pub fn current(&self) -> Option<Arc<Deck>> {
        self.inner
            .deck
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[cfg(test)]
    pub fn is_busy(&self) -> bool {
        self.inner.in_flight.load(Ordering::Acquire)
    }

    /// Drop the current deck and any result still being generated.
    pub fn discard(&self) {
        self.inner.epoch.fetch_add(1, Ordering::AcqRel);
        *self
            .inner
            .deck
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
        debug!("Guide store discarded");
    }
}

impl GenerationTicket {
    /// Replace the whole deck, unless the session was discarded since this
    /// ticket was issued. Returns whether the deck was stored.
    pub fn commit(self, deck: Deck) -> bool {
        let inner = &self.store.inner;
        let mut slot = inner.deck.write().unwrap_or_else(PoisonError::into_inner);

        if inner.epoch.load(Ordering::Acquire) != self.epoch {
            debug!("Dropping guides for '{}': session was discarded", deck.title);
            return false;
        }

        info!("Stored {} guides for '{}'", deck.slide_count, deck.title);
        *slot = Some(Arc::new(deck));
        true
    }
}

impl Drop for GenerationTicket {
    fn drop(&mut self) {
        self.store.inner.in_flight.store(false, Ordering::Release);
    }
}
