//! File-backed filter persistence.

use crate::error::{GridError, Result};
use crate::filter::{FilterDescriptor, FilterSpec, PersistKind, PersistenceHook};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Saves filter snapshots into a JSON file, one key per [`PersistKind`].
#[derive(Debug, Clone)]
pub struct JsonFilePersistence {
    path: PathBuf,
}

impl JsonFilePersistence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Persistence file in the app data directory
    pub fn default_location() -> Option<Self> {
        super::filter_state_path().map(Self::new)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<Map<String, Value>> {
        if !self.path.exists() {
            return Ok(Map::new());
        }
        let content = std::fs::read_to_string(&self.path).map_err(|e| {
            GridError::Config(format!("Failed to read filter state {:?}: {}", self.path, e))
        })?;
        match serde_json::from_str(&content)? {
            Value::Object(map) => Ok(map),
            _ => Err(GridError::Config(format!(
                "Filter state {:?} is not a JSON object",
                self.path
            ))),
        }
    }

    /// Write one snapshot, keeping other kinds already in the file.
    pub fn write(&self, kind: PersistKind, filters: &[FilterDescriptor]) -> Result<()> {
        let mut state = self.read_all()?;
        state.insert(kind.as_str().to_string(), serde_json::to_value(filters)?);

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                GridError::Config(format!("Failed to create filter state directory: {}", e))
            })?;
        }
        let content = serde_json::to_string_pretty(&Value::Object(state))?;
        std::fs::write(&self.path, content).map_err(|e| {
            GridError::Config(format!("Failed to write filter state {:?}: {}", self.path, e))
        })
    }

    /// The last saved snapshot for `kind`, empty if nothing was saved.
    pub fn load_snapshot(&self, kind: PersistKind) -> Result<Vec<FilterDescriptor>> {
        match self.read_all()?.remove(kind.as_str()) {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Ok(Vec::new()),
        }
    }

    /// The saved filter list as specs, ready for `set_filter`.
    ///
    /// Function conditions were saved under the `"function"` label and no
    /// longer resolve; the store drops them when they are re-added.
    pub fn restore_filters(&self) -> Result<Vec<FilterSpec>> {
        Ok(self
            .load_snapshot(PersistKind::Filter)?
            .into_iter()
            .map(FilterSpec::from)
            .collect())
    }
}

impl PersistenceHook for JsonFilePersistence {
    fn save(&self, kind: PersistKind, filters: &[FilterDescriptor]) {
        match self.write(kind, filters) {
            Ok(()) => tracing::trace!(path = ?self.path, count = filters.len(), "Filter state saved"),
            Err(e) => tracing::warn!("Failed to persist {} state: {}", kind.as_str(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let persistence = JsonFilePersistence::new(dir.path().join("filters.json"));
        assert!(persistence.load_snapshot(PersistKind::Filter).unwrap().is_empty());
    }

    #[test]
    fn test_save_and_restore() {
        let dir = TempDir::new().unwrap();
        let persistence = JsonFilePersistence::new(dir.path().join("nested").join("filters.json"));
        let spec = FilterSpec::new("age", ">", json!(3));

        persistence.save(PersistKind::Filter, &[spec.descriptor()]);

        assert_eq!(persistence.restore_filters().unwrap(), vec![spec]);
    }

    #[test]
    fn test_corrupt_file_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("filters.json");
        std::fs::write(&path, "[1, 2]").unwrap();
        let persistence = JsonFilePersistence::new(path);
        assert!(persistence.load_snapshot(PersistKind::Filter).is_err());
    }
}
