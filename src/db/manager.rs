//! Ownership of the one permitted connection: opened lazily, dropped after
//! a period without queries.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::db::DatabaseDriver;
use crate::error::SearchError;
use crate::models::ConnectionInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Closed,
    Open,
}

pub struct ConnectionManager {
    driver: Box<dyn DatabaseDriver>,
    info: ConnectionInfo,
    idle_timeout: Duration,
    last_activity: Instant,
}

impl ConnectionManager {
    pub fn new(
        driver: Box<dyn DatabaseDriver>,
        info: ConnectionInfo,
        idle_timeout: Duration,
        now: Instant,
    ) -> Self {
        Self {
            driver,
            info,
            idle_timeout,
            last_activity: now,
        }
    }

    pub fn state(&self) -> ConnectionState {
        if self.driver.is_connected() {
            ConnectionState::Open
        } else {
            ConnectionState::Closed
        }
    }

    /// The open connection, opening one first if needed. Only called for
    /// user-initiated queries, so a failed open is retried no sooner than
    /// the next query.
    pub async fn acquire(&mut self) -> Result<&mut dyn DatabaseDriver, SearchError> {
        if !self.driver.is_connected() {
            debug!(host = %self.info.host, database = %self.info.database, "opening connection");
            if let Err(err) = self.driver.connect(&self.info).await {
                warn!(error = %err, "failed to open connection");
                return Err(err);
            }
            info!(host = %self.info.host, database = %self.info.database, "connection opened");
        }
        Ok(self.driver.as_mut())
    }

    pub fn note_activity(&mut self, now: Instant) {
        self.last_activity = now;
    }

    /// Closes an open connection that has seen no query for the idle
    /// timeout. Returns whether it closed one. A timeout too large to add to
    /// an instant never expires.
    pub async fn tick(&mut self, now: Instant) -> bool {
        let expired = self
            .last_activity
            .checked_add(self.idle_timeout)
            .is_some_and(|deadline| now >= deadline);
        if self.driver.is_connected() && expired {
            self.close().await;
            return true;
        }
        false
    }

    pub async fn close(&mut self) {
        if self.driver.is_connected() {
            self.driver.disconnect().await;
            info!("connection closed");
        }
    }
}
