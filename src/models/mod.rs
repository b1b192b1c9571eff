use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Where the PostGIS database lives. Credentials are optional; the password
/// is only used when a user name is given.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    #[serde(default)]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub database: String,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

fn default_port() -> u16 {
    5432
}

// Hand-written so credentials never reach a log line.
impl fmt::Debug for ConnectionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionInfo")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user.as_ref().map(|_| "<set>"))
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SavedConnection {
    pub id: String,
    pub name: String,
    pub config: ConnectionInfo,
}

impl SavedConnection {
    pub fn new(name: impl Into<String>, config: ConnectionInfo) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            config,
        }
    }
}

/// The settings as the configuration dialog stores them. Turned into a
/// [`crate::config::SearchConfiguration`] by validation.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SearchSettings {
    #[serde(default)]
    pub connection: String,
    #[serde(default)]
    pub schema: String,
    #[serde(default)]
    pub table: String,
    #[serde(default)]
    pub search_column: String,
    /// Comma separated.
    #[serde(default)]
    pub display_columns: String,
    #[serde(default)]
    pub geom_column: String,
    #[serde(default)]
    pub scale_expr: String,
    #[serde(default)]
    pub bbox_expr: String,
    #[serde(default = "default_search_delay_ms")]
    pub search_delay_ms: u64,
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_search_delay_ms() -> u64 {
    500
}

fn default_idle_timeout_secs() -> u64 {
    60
}

fn default_poll_interval_ms() -> u64 {
    100
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            connection: String::new(),
            schema: String::new(),
            table: String::new(),
            search_column: String::new(),
            display_columns: String::new(),
            geom_column: String::new(),
            scale_expr: String::new(),
            bbox_expr: String::new(),
            search_delay_ms: default_search_delay_ms(),
            idle_timeout_secs: default_idle_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

/// A single cell as read from the store.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Integer(i64),
    Float(f64),
    Text(String),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Numeric view of the value. Text is parsed leniently (surrounding
    /// whitespace ignored).
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Null => None,
            FieldValue::Integer(i) => Some(*i as f64),
            FieldValue::Float(f) => Some(*f),
            FieldValue::Text(s) => s.trim().parse().ok(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => Ok(()),
            FieldValue::Integer(i) => write!(f, "{}", i),
            FieldValue::Float(v) => write!(f, "{}", v),
            FieldValue::Text(s) => f.write_str(s),
        }
    }
}

pub type ExtraData = BTreeMap<String, FieldValue>;

/// One matched record, kept behind the suggestion with the same index.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SearchResult {
    pub geometry: String,
    pub srid: i32,
    pub extra_data: ExtraData,
    pub suggestion: String,
}
