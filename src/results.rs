//! Turns result rows into the selection model.

use tracing::debug;

use crate::db::{DatabaseDriver, Row};
use crate::error::SearchError;
use crate::models::{ExtraData, FieldValue, SearchResult};
use crate::query::SearchQuery;

/// Results and the strings shown for them. Both lists only ever grow
/// together, so index `i` of one always belongs to index `i` of the other.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResults {
    results: Vec<SearchResult>,
    suggestions: Vec<String>,
}

impl SearchResults {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, result: SearchResult) {
        self.suggestions.push(result.suggestion.clone());
        self.results.push(result);
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&SearchResult> {
        self.results.get(index)
    }

    pub fn results(&self) -> &[SearchResult] {
        &self.results
    }

    pub fn suggestions(&self) -> &[String] {
        &self.suggestions
    }
}

/// Runs `query` and maps every row. Any bad row fails the whole query.
pub async fn execute(
    query: &SearchQuery,
    driver: &mut dyn DatabaseDriver,
    extra_columns: &[String],
) -> Result<SearchResults, SearchError> {
    let rows = driver.query(query).await?;
    let results = map_rows(rows, extra_columns)?;
    debug!(rows = results.len(), "search results mapped");
    Ok(results)
}

/// Columns: 0 geometry text, 1 SRID, 2 suggestion, `3 + i` extra column `i`.
pub fn map_rows(rows: Vec<Row>, extra_columns: &[String]) -> Result<SearchResults, SearchError> {
    let expected = 3 + extra_columns.len();
    let mut results = SearchResults::new();

    for (row_idx, row) in rows.into_iter().enumerate() {
        if row.len() < expected {
            return Err(SearchError::Query(format!(
                "row {} has {} columns, expected {}",
                row_idx,
                row.len(),
                expected
            )));
        }
        let mut cells = row.into_iter();
        let geometry = text_cell(cells.next(), row_idx, "geometry")?;
        let srid = match cells.next() {
            Some(FieldValue::Integer(v)) => i32::try_from(v).map_err(|_| {
                SearchError::Query(format!("row {}: SRID {} out of range", row_idx, v))
            })?,
            other => {
                return Err(SearchError::Query(format!(
                    "row {}: SRID is {:?}, expected an integer",
                    row_idx, other
                )))
            }
        };
        let suggestion = text_cell(cells.next(), row_idx, "suggestion")?;
        let extra_data: ExtraData = extra_columns.iter().cloned().zip(cells).collect();

        results.push(SearchResult {
            geometry,
            srid,
            extra_data,
            suggestion,
        });
    }

    Ok(results)
}

fn text_cell(cell: Option<FieldValue>, row_idx: usize, what: &str) -> Result<String, SearchError> {
    match cell {
        Some(FieldValue::Text(s)) => Ok(s),
        other => Err(SearchError::Query(format!(
            "row {}: {} is {:?}, expected text",
            row_idx, what, other
        ))),
    }
}
