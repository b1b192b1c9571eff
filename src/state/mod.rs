//! The session: every piece of search state, owned in one place and driven
//! by host callbacks plus the poll tick.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::SearchConfiguration;
use crate::db::postgres::PostgresDriver;
use crate::db::{ConnectionManager, ConnectionState, DatabaseDriver};
use crate::geometry::Rect;
use crate::host::{Host, Level, Notification};
use crate::models::{SavedConnection, SearchSettings};
use crate::results::{self, SearchResults};
use crate::scheduler::{DebounceScheduler, PendingQuery, TextChange};
use crate::selection;

pub type DriverFactory = Box<dyn Fn() -> Box<dyn DatabaseDriver> + Send>;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No usable configuration.
    Inert,
    Idle,
    Queried { rows: usize },
    QueryFailed,
    ConnectionClosed,
}

struct ActiveSearch {
    config: SearchConfiguration,
    scheduler: DebounceScheduler,
    connections: ConnectionManager,
}

pub struct SearchSession {
    driver_factory: DriverFactory,
    active: Option<ActiveSearch>,
    query_text: String,
    results: SearchResults,
    restore_pending: bool,
    last_query_time: Option<Instant>,
}

impl SearchSession {
    /// A session that stays inert until [`SearchSession::reconfigure`]
    /// succeeds.
    pub fn new(driver_factory: DriverFactory) -> Self {
        Self {
            driver_factory,
            active: None,
            query_text: String::new(),
            results: SearchResults::new(),
            restore_pending: false,
            last_query_time: None,
        }
    }

    pub fn postgres() -> Self {
        Self::new(Box::new(|| Box::new(PostgresDriver::new())))
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn config(&self) -> Option<&SearchConfiguration> {
        self.active.as_ref().map(|a| &a.config)
    }

    pub fn query_text(&self) -> &str {
        &self.query_text
    }

    pub fn results(&self) -> &SearchResults {
        &self.results
    }

    pub fn pending_query(&self) -> Option<&PendingQuery> {
        self.active.as_ref().and_then(|a| a.scheduler.pending())
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.active
            .as_ref()
            .map_or(ConnectionState::Closed, |a| a.connections.state())
    }

    pub fn last_query_time(&self) -> Option<Instant> {
        self.last_query_time
    }

    pub fn poll_interval(&self) -> Duration {
        self.config()
            .map_or(DEFAULT_POLL_INTERVAL, |c| c.poll_interval)
    }

    /// Replaces the whole configuration. Any open connection is closed and
    /// pending work dropped first; problems are reported through the host.
    pub async fn reconfigure<H: Host + ?Sized>(
        &mut self,
        settings: &SearchSettings,
        connections: &[SavedConnection],
        host: &mut H,
        now: Instant,
    ) -> bool {
        if let Some(mut old) = self.active.take() {
            old.connections.close().await;
        }
        self.clear_results(host);

        let loaded = match SearchConfiguration::load(settings, connections) {
            Ok(loaded) => loaded,
            Err(err) => {
                error!(error = %err, "search disabled");
                host.notify(Notification::new(Level::Critical, err.to_string()));
                return false;
            }
        };
        for warning in loaded.warnings {
            host.notify(Notification::new(Level::Warning, warning.to_string()));
        }

        let config = loaded.config;
        let manager = ConnectionManager::new(
            (self.driver_factory)(),
            config.connection.clone(),
            config.idle_timeout,
            now,
        );
        self.active = Some(ActiveSearch {
            scheduler: DebounceScheduler::new(config.search_delay),
            connections: manager,
            config,
        });
        true
    }

    /// Called for every edit of the search field.
    pub fn on_text_changed<H: Host + ?Sized>(
        &mut self,
        text: &str,
        now: Instant,
        host: &mut H,
    ) -> Option<TextChange> {
        self.query_text = text.to_string();
        let active = self.active.as_mut()?;
        let change = active.scheduler.on_text_changed(text, &active.config, now);
        if change == TextChange::Cleared {
            self.clear_results(host);
        }
        Some(change)
    }

    /// One poll period: restore text if asked to, then either run the due
    /// query or check the connection for idleness, never both.
    pub async fn tick<H: Host + ?Sized>(&mut self, now: Instant, host: &mut H) -> TickOutcome {
        if std::mem::take(&mut self.restore_pending) {
            host.set_text(&self.query_text);
        }

        let Some(active) = self.active.as_mut() else {
            return TickOutcome::Inert;
        };

        let Some(pending) = active.scheduler.due_query(now) else {
            return if active.connections.tick(now).await {
                TickOutcome::ConnectionClosed
            } else {
                TickOutcome::Idle
            };
        };

        self.last_query_time = Some(now);
        active.connections.note_activity(now);
        debug!(pattern = ?pending.query.params, "running search");

        let outcome = match active.connections.acquire().await {
            Ok(driver) => {
                results::execute(&pending.query, driver, &active.config.extra_columns).await
            }
            Err(err) => Err(err),
        };

        match outcome {
            Ok(found) => {
                let rows = found.len();
                host.set_suggestions(found.suggestions());
                self.results = found;
                info!(rows, "suggestions updated");
                TickOutcome::Queried { rows }
            }
            Err(err) => {
                warn!(error = %err, "search failed");
                self.clear_results(host);
                host.notify(Notification::new(Level::Critical, err.to_string()));
                TickOutcome::QueryFailed
            }
        }
    }

    /// The user accepted suggestion `row`: move the map there and put the
    /// typed text back. Returns the extent applied, if any.
    pub fn selected<H: Host + ?Sized>(&mut self, row: usize, host: &mut H) -> Option<Rect> {
        let (Some(active), Some(result)) = (self.active.as_ref(), self.results.get(row)) else {
            debug!(row, "selection ignored");
            return None;
        };
        self.restore_pending = true;

        let centroid = match selection::locate(result, &*host, &*host) {
            Ok(point) => point,
            Err(err) => {
                warn!(error = %err, "cannot locate result");
                host.notify(Notification::new(Level::Warning, err.to_string()));
                return None;
            }
        };
        let extent = selection::target_extent(result, centroid, &active.config, &*host);
        host.set_extent(extent);
        host.refresh();
        Some(extent)
    }

    /// Keyboard navigation through the list: keep the typed text only.
    pub fn highlighted(&mut self, row: usize) {
        debug!(row, "suggestion highlighted");
        self.restore_pending = true;
    }

    pub async fn shutdown(&mut self) {
        if let Some(active) = self.active.as_mut() {
            active.scheduler.cancel();
            active.connections.close().await;
        }
    }

    fn clear_results<H: Host + ?Sized>(&mut self, host: &mut H) {
        self.results = SearchResults::new();
        host.set_suggestions(&[]);
    }
}
