//! Builds the suggestion query. Nothing here touches the database.

use crate::config::SearchConfiguration;

/// A parameterized statement plus its bind values, in `$n` order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub sql: String,
    pub params: Vec<String>,
}

/// Turns typed text into an `ILIKE` pattern. Every whitespace run becomes a
/// wildcard, so `"dl10 4dq"` and `"dl104dq"` both find `DL104DQ`.
pub fn wildcard_pattern(text: &str) -> String {
    let mut pattern = String::from("%");
    for part in text.split_whitespace() {
        pattern.push_str(part);
        pattern.push('%');
    }
    pattern
}

/// Double-quotes an identifier, doubling any embedded quote.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Result columns: geometry text, SRID, suggestion, then
/// `config.extra_columns` in order.
pub fn build(text: &str, config: &SearchConfiguration) -> SearchQuery {
    let geom = quote_ident(&config.geom_column);
    let search = quote_ident(&config.search_column);

    let mut suggestion = search.clone();
    for column in &config.display_columns {
        let col = quote_ident(column);
        suggestion.push_str(&format!(
            " || CASE WHEN {col} IS NOT NULL THEN ', ' || {col} ELSE '' END"
        ));
    }

    let mut sql = format!(
        "SELECT ST_AsText({geom}) AS geom, ST_SRID({geom}) AS epsg, ({suggestion})::text AS suggestion_string"
    );
    for column in &config.extra_columns {
        sql.push_str(", ");
        sql.push_str(&quote_ident(column));
    }

    let table = if config.schema.is_empty() {
        quote_ident(&config.table)
    } else {
        format!("{}.{}", quote_ident(&config.schema), quote_ident(&config.table))
    };
    sql.push_str(&format!(
        " FROM {table} WHERE {search} ILIKE $1 ORDER BY {search} LIMIT {}",
        config.row_limit
    ));

    SearchQuery {
        sql,
        params: vec![wildcard_pattern(text)],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConnectionInfo, SavedConnection, SearchSettings};

    fn config(display: &str, scale: &str, bbox: &str) -> SearchConfiguration {
        let connections = vec![SavedConnection::new(
            "local",
            ConnectionInfo {
                host: "localhost".into(),
                port: 5432,
                database: "gis".into(),
                user: None,
                password: None,
            },
        )];
        let settings = SearchSettings {
            connection: "local".into(),
            schema: "os".into(),
            table: "postcodes".into(),
            search_column: "code".into(),
            display_columns: display.into(),
            scale_expr: scale.into(),
            bbox_expr: bbox.into(),
            ..SearchSettings::default()
        };
        SearchConfiguration::load(&settings, &connections).unwrap().config
    }

    /// Case-insensitive SQL `LIKE` with `%` only, enough to check patterns.
    fn ilike(pattern: &str, value: &str) -> bool {
        let value = value.to_lowercase();
        let parts: Vec<String> = pattern.to_lowercase().split('%').map(String::from).collect();
        let mut rest = value.as_str();
        for (i, part) in parts.iter().enumerate() {
            if part.is_empty() {
                continue;
            }
            if i == 0 {
                match rest.strip_prefix(part.as_str()) {
                    Some(r) => rest = r,
                    None => return false,
                }
            } else {
                match rest.find(part.as_str()) {
                    Some(idx) => rest = &rest[idx + part.len()..],
                    None => return false,
                }
            }
        }
        pattern.ends_with('%') || rest.is_empty()
    }

    #[test]
    fn whitespace_becomes_wildcards() {
        assert_eq!(wildcard_pattern("dl10 4dq"), "%dl10%4dq%");
        assert_eq!(wildcard_pattern("  dl104dq "), "%dl104dq%");
        assert_eq!(wildcard_pattern("new\tyork  city"), "%new%york%city%");
    }

    #[test]
    fn spaced_and_unspaced_postcodes_match_the_stored_value() {
        assert!(ilike(&wildcard_pattern("dl10 4dq"), "DL104DQ"));
        assert!(ilike(&wildcard_pattern("dl104dq"), "DL104DQ"));
        assert!(!ilike(&wildcard_pattern("dl11 4dq"), "DL104DQ"));
    }

    #[test]
    fn builds_the_fixed_column_contract() {
        let q = build("dl10 4dq", &config("town, county", "", ""));
        assert_eq!(q.params, vec!["%dl10%4dq%".to_string()]);
        assert_eq!(
            q.sql,
            "SELECT ST_AsText(\"geom\") AS geom, ST_SRID(\"geom\") AS epsg, \
             (\"code\" || CASE WHEN \"town\" IS NOT NULL THEN ', ' || \"town\" ELSE '' END \
             || CASE WHEN \"county\" IS NOT NULL THEN ', ' || \"county\" ELSE '' END)::text AS suggestion_string \
             FROM \"os\".\"postcodes\" WHERE \"code\" ILIKE $1 ORDER BY \"code\" LIMIT 20"
        );
    }

    #[test]
    fn extra_columns_are_appended_in_configuration_order() {
        let q = build("abc", &config("", "zoom * 100", "\"bbox\""));
        assert!(q
            .sql
            .contains("AS suggestion_string, \"zoom\", \"bbox\" FROM"));
    }

    #[test]
    fn identifiers_are_quoted() {
        assert_eq!(quote_ident("plain"), "\"plain\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }
}
