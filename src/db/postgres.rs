use std::time::Duration;

use async_trait::async_trait;
use bigdecimal::{BigDecimal, ToPrimitive};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use futures::TryStreamExt;
use sqlx::postgres::{PgConnectOptions, PgConnection, PgRow};
use sqlx::{Connection, Row, TypeInfo, ValueRef};
use tokio::time::timeout;
use tracing::debug;

use crate::db::{DatabaseDriver, Row as ResultRow};
use crate::error::SearchError;
use crate::models::{ConnectionInfo, FieldValue};
use crate::query::SearchQuery;

/// How long an open may take before it counts as failed.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// A single sqlx connection. Statements run outside any explicit
/// transaction, so each query commits on its own.
pub struct PostgresDriver {
    conn: Option<PgConnection>,
}

impl PostgresDriver {
    pub fn new() -> Self {
        Self { conn: None }
    }
}

impl Default for PostgresDriver {
    fn default() -> Self {
        Self::new()
    }
}

pub fn connect_options(info: &ConnectionInfo) -> PgConnectOptions {
    let mut options = PgConnectOptions::new()
        .port(info.port)
        .database(&info.database)
        .application_name("postgis-search");
    if !info.host.is_empty() {
        options = options.host(&info.host);
    }
    // A password only makes sense together with a user name.
    if let Some(user) = info.user.as_deref().filter(|u| !u.is_empty()) {
        options = options.username(user);
        if let Some(password) = info.password.as_deref() {
            options = options.password(password);
        }
    }
    options
}

async fn connect_within(
    options: &PgConnectOptions,
    limit: Duration,
) -> Result<PgConnection, SearchError> {
    match timeout(limit, PgConnection::connect_with(options)).await {
        Ok(result) => result.map_err(|e| SearchError::Connection(e.to_string())),
        Err(_) => Err(SearchError::Connection(format!(
            "timed out after {}s",
            limit.as_secs()
        ))),
    }
}

#[async_trait]
impl DatabaseDriver for PostgresDriver {
    async fn connect(&mut self, info: &ConnectionInfo) -> Result<(), SearchError> {
        let conn = connect_within(&connect_options(info), CONNECT_TIMEOUT).await?;
        self.conn = Some(conn);
        Ok(())
    }

    async fn disconnect(&mut self) {
        if let Some(conn) = self.conn.take() {
            if let Err(e) = conn.close().await {
                debug!(error = %e, "error while closing connection");
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    async fn query(&mut self, query: &SearchQuery) -> Result<Vec<ResultRow>, SearchError> {
        let conn = self
            .conn
            .as_mut()
            .ok_or_else(|| SearchError::Query("Not connected".to_string()))?;

        let mut statement = sqlx::query(&query.sql);
        for param in &query.params {
            statement = statement.bind(param);
        }

        let mut rows = Vec::new();
        let mut stream = statement.fetch(&mut *conn);
        while let Some(row) = stream.try_next().await? {
            let values = (0..row.len())
                .map(|i| map_postgres_value(&row, i))
                .collect();
            rows.push(values);
        }
        Ok(rows)
    }
}

fn map_postgres_value(row: &PgRow, index: usize) -> FieldValue {
    let value_ref = match row.try_get_raw(index) {
        Ok(v) => v,
        Err(_) => return FieldValue::Null,
    };

    if value_ref.is_null() {
        return FieldValue::Null;
    }

    let type_info = value_ref.type_info();
    let type_name = type_info.name().to_string();

    let value = match type_name.as_str() {
        "BOOL" => row
            .try_get::<bool, _>(index)
            .ok()
            .map(|v| FieldValue::Integer(v as i64)),
        "INT2" => row
            .try_get::<i16, _>(index)
            .ok()
            .map(|v| FieldValue::Integer(v.into())),
        "INT4" => row
            .try_get::<i32, _>(index)
            .ok()
            .map(|v| FieldValue::Integer(v.into())),
        "INT8" => row.try_get::<i64, _>(index).ok().map(FieldValue::Integer),
        "FLOAT4" => row
            .try_get::<f32, _>(index)
            .ok()
            .map(|v| FieldValue::Float(v.into())),
        "FLOAT8" => row.try_get::<f64, _>(index).ok().map(FieldValue::Float),
        "NUMERIC" => row
            .try_get::<BigDecimal, _>(index)
            .ok()
            .map(|d| match d.to_f64() {
                Some(f) if f.is_finite() => FieldValue::Float(f),
                _ => FieldValue::Text(d.to_string()),
            }),
        "UUID" => row
            .try_get::<uuid::Uuid, _>(index)
            .ok()
            .map(|u| FieldValue::Text(u.to_string())),
        "TIMESTAMPTZ" => row
            .try_get::<DateTime<Utc>, _>(index)
            .ok()
            .map(|t| FieldValue::Text(t.to_rfc3339())),
        "TIMESTAMP" => row
            .try_get::<NaiveDateTime, _>(index)
            .ok()
            .map(|t| FieldValue::Text(t.to_string())),
        "DATE" => row
            .try_get::<NaiveDate, _>(index)
            .ok()
            .map(|d| FieldValue::Text(d.to_string())),
        _ => row.try_get::<String, _>(index).ok().map(FieldValue::Text),
    };

    value.unwrap_or_else(|| {
        // Fall back to the raw bytes; text-format values are readable as is.
        match value_ref.as_bytes().ok().and_then(|b| std::str::from_utf8(b).ok()) {
            Some(s) => FieldValue::Text(s.to_string()),
            None => FieldValue::Text(format!("<{}>", type_name)),
        }
    })
}
