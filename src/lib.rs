//! Debounced search suggestions from a PostGIS table.
//!
//! Keystrokes go into a [`SearchSession`], which waits for a quiet period,
//! runs one `ILIKE` query over a lazily opened connection and hands the
//! matches to the host's suggestion list. Accepting a suggestion moves the
//! host's map to the matched geometry.

pub mod commands;
pub mod config;
pub mod console;
pub mod db;
pub mod error;
pub mod expression;
pub mod geometry;
pub mod host;
pub mod models;
pub mod query;
pub mod results;
pub mod scheduler;
pub mod selection;
pub mod state;
pub mod storage;

pub use commands::{run, HostEvent};
pub use config::SearchConfiguration;
pub use error::SearchError;
pub use host::Host;
pub use state::{SearchSession, TickOutcome};
pub use storage::Storage;
