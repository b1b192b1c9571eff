use async_trait::async_trait;

use crate::error::SearchError;
use crate::models::{ConnectionInfo, FieldValue};
use crate::query::SearchQuery;

pub mod manager;
pub mod postgres;

pub use manager::{ConnectionManager, ConnectionState};

/// One result row, cells in select order.
pub type Row = Vec<FieldValue>;

/// A single database connection that can be opened, queried and dropped.
#[async_trait]
pub trait DatabaseDriver: Send {
    async fn connect(&mut self, info: &ConnectionInfo) -> Result<(), SearchError>;
    async fn disconnect(&mut self);
    fn is_connected(&self) -> bool;
    async fn query(&mut self, query: &SearchQuery) -> Result<Vec<Row>, SearchError>;
}
