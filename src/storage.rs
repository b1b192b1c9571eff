use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::SearchError;
use crate::models::{SavedConnection, SearchSettings};

const CONNECTIONS_FILE_NAME: &str = "connections.json";
const SETTINGS_FILE_NAME: &str = "settings.json";

/// JSON files in one configuration directory. Missing files read as
/// defaults.
#[derive(Debug, Clone)]
pub struct Storage {
    dir: PathBuf,
}

impl Storage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_path(&self, name: &str) -> Result<PathBuf, SearchError> {
        fs::create_dir_all(&self.dir)?;
        Ok(self.dir.join(name))
    }

    pub fn load_connections(&self) -> Result<Vec<SavedConnection>, SearchError> {
        let path = self.file_path(CONNECTIONS_FILE_NAME)?;

        if !path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&path)?;
        let connections: Vec<SavedConnection> = serde_json::from_str(&content)?;
        debug!(path = %path.display(), count = connections.len(), "connections loaded");
        Ok(connections)
    }

    pub fn save_connections(&self, connections: &[SavedConnection]) -> Result<(), SearchError> {
        let path = self.file_path(CONNECTIONS_FILE_NAME)?;
        let content = serde_json::to_string_pretty(connections)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Replaces a connection with the same id or name, or appends it.
    pub fn add_connection(&self, connection: SavedConnection) -> Result<(), SearchError> {
        let mut connections = self.load_connections()?;
        if let Some(pos) = connections
            .iter()
            .position(|c| c.id == connection.id || c.name == connection.name)
        {
            connections[pos] = connection;
        } else {
            connections.push(connection);
        }
        self.save_connections(&connections)
    }

    pub fn delete_connection(&self, id: &str) -> Result<(), SearchError> {
        let mut connections = self.load_connections()?;
        connections.retain(|c| c.id != id);
        self.save_connections(&connections)
    }

    pub fn load_settings(&self) -> Result<SearchSettings, SearchError> {
        let path = self.file_path(SETTINGS_FILE_NAME)?;
        if !path.exists() {
            return Ok(SearchSettings::default());
        }
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save_settings(&self, settings: &SearchSettings) -> Result<(), SearchError> {
        let path = self.file_path(SETTINGS_FILE_NAME)?;
        let content = serde_json::to_string_pretty(settings)?;
        fs::write(path, content)?;
        Ok(())
    }
}
