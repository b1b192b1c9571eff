//! Debounce control: typing activity in, at most one query per quiet
//! period out.

use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::config::SearchConfiguration;
use crate::query::{self, SearchQuery};

/// Shorter input never reaches the database.
pub const MIN_QUERY_CHARS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingQuery {
    pub query: SearchQuery,
    pub fire_at: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextChange {
    /// Input too short: any pending query was dropped and the suggestions
    /// should be cleared.
    Cleared,
    Scheduled { fire_at: Instant },
}

/// Non-whitespace characters in `text`.
pub fn significant_len(text: &str) -> usize {
    text.chars().filter(|c| !c.is_whitespace()).count()
}

#[derive(Debug)]
pub struct DebounceScheduler {
    delay: Duration,
    pending: Option<PendingQuery>,
}

impl DebounceScheduler {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn pending(&self) -> Option<&PendingQuery> {
        self.pending.as_ref()
    }

    /// Last write wins: whatever was pending before is replaced or dropped.
    pub fn on_text_changed(
        &mut self,
        text: &str,
        config: &SearchConfiguration,
        now: Instant,
    ) -> TextChange {
        if significant_len(text) < MIN_QUERY_CHARS {
            if self.pending.take().is_some() {
                debug!("short input, pending query discarded");
            }
            return TextChange::Cleared;
        }

        let fire_at = now + self.delay;
        let replaced = self
            .pending
            .replace(PendingQuery {
                query: query::build(text, config),
                fire_at,
            })
            .is_some();
        debug!(replaced, delay_ms = self.delay.as_millis() as u64, "query scheduled");
        TextChange::Scheduled { fire_at }
    }

    /// Hands out the pending query once its fire time is reached.
    pub fn due_query(&mut self, now: Instant) -> Option<PendingQuery> {
        if self.pending.as_ref().is_some_and(|p| p.fire_at <= now) {
            self.pending.take()
        } else {
            None
        }
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }
}
