#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use postgis_search::db::{DatabaseDriver, Row};
use postgis_search::geometry::{Point, Rect};
use postgis_search::host::{
    Notification, Notifier, Reprojector, SuggestionSurface, TextBox, Viewport,
};
use postgis_search::models::{ConnectionInfo, FieldValue, SavedConnection, SearchSettings};
use postgis_search::query::SearchQuery;
use postgis_search::state::DriverFactory;
use postgis_search::SearchSession;

/// What the fake database has seen and will answer.
#[derive(Default)]
pub struct FakeDb {
    pub rows: Vec<Row>,
    pub fail_connect: bool,
    pub fail_query: bool,
    pub queries: Vec<SearchQuery>,
    pub opens: usize,
    pub closes: usize,
}

pub type SharedDb = Arc<Mutex<FakeDb>>;

pub struct FakeDriver {
    db: SharedDb,
    connected: bool,
}

#[async_trait]
impl DatabaseDriver for FakeDriver {
    async fn connect(&mut self, _info: &ConnectionInfo) -> Result<(), postgis_search::SearchError> {
        let mut db = self.db.lock().unwrap();
        db.opens += 1;
        if db.fail_connect {
            return Err(postgis_search::SearchError::Connection(
                "could not connect to server".into(),
            ));
        }
        self.connected = true;
        Ok(())
    }

    async fn disconnect(&mut self) {
        self.db.lock().unwrap().closes += 1;
        self.connected = false;
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn query(
        &mut self,
        query: &SearchQuery,
    ) -> Result<Vec<Row>, postgis_search::SearchError> {
        let mut db = self.db.lock().unwrap();
        db.queries.push(query.clone());
        if db.fail_query {
            return Err(postgis_search::SearchError::Query(
                "relation \"places\" does not exist".into(),
            ));
        }
        Ok(db.rows.clone())
    }
}

pub fn fake_factory(db: &SharedDb) -> DriverFactory {
    let db = db.clone();
    Box::new(move || {
        Box::new(FakeDriver {
            db: db.clone(),
            connected: false,
        })
    })
}

/// Records every call the session makes into the host.
pub struct RecordingHost {
    pub extent: Rect,
    pub scale: f64,
    pub crs: String,
    pub suggestions: Vec<Vec<String>>,
    pub texts: Vec<String>,
    pub notifications: Vec<Notification>,
    pub extents: Vec<Rect>,
    pub refreshes: usize,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self {
            extent: Rect::new(0.0, 0.0, 1000.0, 500.0),
            scale: 10_000.0,
            crs: "EPSG:27700".to_string(),
            suggestions: Vec::new(),
            texts: Vec::new(),
            notifications: Vec::new(),
            extents: Vec::new(),
            refreshes: 0,
        }
    }

    pub fn current_suggestions(&self) -> &[String] {
        self.suggestions.last().map(Vec::as_slice).unwrap_or(&[])
    }
}

impl Viewport for RecordingHost {
    fn extent(&self) -> Rect {
        self.extent
    }

    fn scale(&self) -> f64 {
        self.scale
    }

    fn destination_crs(&self) -> String {
        self.crs.clone()
    }

    fn set_extent(&mut self, extent: Rect) {
        self.extent = extent;
        self.extents.push(extent);
    }

    fn refresh(&mut self) {
        self.refreshes += 1;
    }
}

impl Reprojector for RecordingHost {
    fn transform(
        &self,
        point: Point,
        source_srid: i32,
        destination_crs: &str,
    ) -> Result<Point, String> {
        if destination_crs == format!("EPSG:{}", source_srid) {
            Ok(point)
        } else {
            Err(format!("no transform from {} to {}", source_srid, destination_crs))
        }
    }
}

impl SuggestionSurface for RecordingHost {
    fn set_suggestions(&mut self, suggestions: &[String]) {
        self.suggestions.push(suggestions.to_vec());
    }
}

impl TextBox for RecordingHost {
    fn set_text(&mut self, text: &str) {
        self.texts.push(text.to_string());
    }
}

impl Notifier for RecordingHost {
    fn notify(&mut self, notification: Notification) {
        self.notifications.push(notification);
    }
}

pub fn connections() -> Vec<SavedConnection> {
    vec![SavedConnection::new(
        "local",
        ConnectionInfo {
            host: "localhost".into(),
            port: 5432,
            database: "gis".into(),
            user: Some("gis".into()),
            password: Some("secret".into()),
        },
    )]
}

pub fn settings() -> SearchSettings {
    SearchSettings {
        connection: "local".into(),
        schema: "public".into(),
        table: "places".into(),
        search_column: "name".into(),
        display_columns: "county".into(),
        ..SearchSettings::default()
    }
}

pub fn text(s: &str) -> FieldValue {
    FieldValue::Text(s.to_string())
}

pub fn place(geom: &str, srid: i64, suggestion: &str, extra: &[FieldValue]) -> Row {
    let mut row = vec![text(geom), FieldValue::Integer(srid), text(suggestion)];
    row.extend_from_slice(extra);
    row
}

pub fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

/// A configured session over a fake database.
pub async fn session_with(
    settings: &SearchSettings,
    host: &mut RecordingHost,
    now: Instant,
) -> (SearchSession, SharedDb) {
    let db: SharedDb = Arc::new(Mutex::new(FakeDb::default()));
    let mut session = SearchSession::new(fake_factory(&db));
    session.reconfigure(settings, &connections(), host, now).await;
    (session, db)
}
