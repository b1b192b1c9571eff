//! Validated search configuration.
//!
//! Built once from [`SearchSettings`] plus the saved connections and then
//! only ever replaced as a whole.

use std::time::Duration;

use tracing::{info, warn};

use crate::error::SearchError;
use crate::expression::Expression;
use crate::models::{ConnectionInfo, SavedConnection, SearchSettings};

pub const DEFAULT_GEOM_COLUMN: &str = "geom";
pub const ROW_LIMIT: usize = 20;

#[derive(Debug, Clone)]
pub struct SearchConfiguration {
    pub connection: ConnectionInfo,
    pub schema: String,
    pub table: String,
    pub search_column: String,
    pub display_columns: Vec<String>,
    pub geom_column: String,
    pub scale_expr: Option<Expression>,
    pub bbox_expr: Option<Expression>,
    /// Columns the expressions read, in the order they are selected and
    /// unpacked: scale's first, then bbox's, each name once.
    pub extra_columns: Vec<String>,
    pub search_delay: Duration,
    pub idle_timeout: Duration,
    pub poll_interval: Duration,
    pub row_limit: usize,
}

/// A loaded configuration together with the non-fatal problems found on
/// the way (disabled expressions).
#[derive(Debug)]
pub struct LoadedConfiguration {
    pub config: SearchConfiguration,
    pub warnings: Vec<SearchError>,
}

impl SearchConfiguration {
    pub fn load(
        settings: &SearchSettings,
        connections: &[SavedConnection],
    ) -> Result<LoadedConfiguration, SearchError> {
        let connection = connections
            .iter()
            .find(|c| c.name == settings.connection)
            .map(|c| c.config.clone())
            .ok_or_else(|| {
                SearchError::Configuration(format!(
                    "the database connection '{}' does not exist",
                    settings.connection
                ))
            })?;

        if connection.database.trim().is_empty() {
            return Err(SearchError::Configuration(format!(
                "the database connection '{}' has no database",
                settings.connection
            )));
        }
        if settings.table.trim().is_empty() {
            return Err(SearchError::Configuration("no table configured".to_string()));
        }
        if settings.search_column.trim().is_empty() {
            return Err(SearchError::Configuration(
                "no search column configured".to_string(),
            ));
        }

        let mut warnings = Vec::new();
        let mut extra_columns: Vec<String> = Vec::new();
        let scale_expr = optional_expression("scale", &settings.scale_expr, &mut warnings);
        let bbox_expr = optional_expression("bbox", &settings.bbox_expr, &mut warnings);
        for expr in scale_expr.iter().chain(bbox_expr.iter()) {
            for column in expr.referenced_columns() {
                if !extra_columns.contains(&column) {
                    extra_columns.push(column);
                }
            }
        }

        let geom_column = match settings.geom_column.trim() {
            "" => DEFAULT_GEOM_COLUMN.to_string(),
            other => other.to_string(),
        };

        let config = SearchConfiguration {
            connection,
            schema: settings.schema.trim().to_string(),
            table: settings.table.trim().to_string(),
            search_column: settings.search_column.trim().to_string(),
            display_columns: split_columns(&settings.display_columns),
            geom_column,
            scale_expr,
            bbox_expr,
            extra_columns,
            search_delay: Duration::from_millis(settings.search_delay_ms),
            idle_timeout: Duration::from_secs(settings.idle_timeout_secs),
            poll_interval: Duration::from_millis(settings.poll_interval_ms.max(1)),
            row_limit: ROW_LIMIT,
        };
        info!(
            table = %config.table,
            search_column = %config.search_column,
            extra_columns = ?config.extra_columns,
            "search configuration loaded"
        );

        Ok(LoadedConfiguration { config, warnings })
    }
}

fn optional_expression(
    kind: &'static str,
    text: &str,
    warnings: &mut Vec<SearchError>,
) -> Option<Expression> {
    if text.trim().is_empty() {
        return None;
    }
    match Expression::parse(text) {
        Ok(expr) => Some(expr),
        Err(message) => {
            warn!(kind, %message, "expression disabled");
            warnings.push(SearchError::expression(kind, message));
            None
        }
    }
}

fn split_columns(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connections() -> Vec<SavedConnection> {
        vec![SavedConnection::new(
            "local",
            ConnectionInfo {
                host: "localhost".into(),
                port: 5432,
                database: "gis".into(),
                user: None,
                password: None,
            },
        )]
    }

    fn settings() -> SearchSettings {
        SearchSettings {
            connection: "local".into(),
            schema: "public".into(),
            table: "gazetteer".into(),
            search_column: "name".into(),
            display_columns: "county, country,".into(),
            ..SearchSettings::default()
        }
    }

    #[test]
    fn loads_defaults() {
        let loaded = SearchConfiguration::load(&settings(), &connections()).unwrap();
        let config = loaded.config;
        assert!(loaded.warnings.is_empty());
        assert_eq!(config.display_columns, vec!["county", "country"]);
        assert_eq!(config.geom_column, "geom");
        assert_eq!(config.search_delay, Duration::from_millis(500));
        assert_eq!(config.idle_timeout, Duration::from_secs(60));
        assert_eq!(config.poll_interval, Duration::from_millis(100));
        assert_eq!(config.row_limit, 20);
        assert!(config.extra_columns.is_empty());
    }

    #[test]
    fn unknown_connection_is_a_configuration_error() {
        let mut s = settings();
        s.connection = "missing".into();
        let err = SearchConfiguration::load(&s, &connections()).unwrap_err();
        assert!(matches!(err, SearchError::Configuration(msg) if msg.contains("missing")));
    }

    #[test]
    fn extra_columns_follow_scale_then_bbox() {
        let mut s = settings();
        s.scale_expr = "\"rank\" * 1000".into();
        s.bbox_expr = "bbox || rank".into();
        let config = SearchConfiguration::load(&s, &connections()).unwrap().config;
        assert_eq!(config.extra_columns, vec!["rank", "bbox"]);
    }

    #[test]
    fn invalid_expression_is_disabled_with_a_warning() {
        let mut s = settings();
        s.scale_expr = "1 +".into();
        s.bbox_expr = "bbox".into();
        let loaded = SearchConfiguration::load(&s, &connections()).unwrap();
        assert!(loaded.config.scale_expr.is_none());
        assert!(loaded.config.bbox_expr.is_some());
        assert_eq!(loaded.config.extra_columns, vec!["bbox"]);
        assert_eq!(loaded.warnings.len(), 1);
        assert!(matches!(
            loaded.warnings[0],
            SearchError::Expression { kind: "scale", .. }
        ));
    }
}
