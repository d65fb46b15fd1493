//! Config store for persisting configured locations to disk
//!
//! Provides a `ConfigStore` that keeps every configured location in a single
//! JSON document, rewritten as a whole on each change.

use std::fs;
use std::path::PathBuf;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ConfigError, LocationConfig};

/// Name of the document inside the config directory
const LOCATIONS_FILE: &str = "locations.json";

/// Current layout version of the document
const DOCUMENT_VERSION: u32 = 1;

/// Wrapper struct for the document stored on disk
#[derive(Debug, Serialize, Deserialize)]
struct StoreDocument {
    #[serde(default = "document_version")]
    version: u32,
    #[serde(default)]
    locations: Vec<LocationConfig>,
}

fn document_version() -> u32 {
    DOCUMENT_VERSION
}

/// Manages reading and writing configured locations
///
/// The store keeps its document in an XDG-compliant config directory
/// (`~/.config/pollenwatch/` on Linux). A missing document means no location
/// is configured yet.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    /// Directory where the document is stored
    config_dir: PathBuf,
}

impl ConfigStore {
    /// Creates a new ConfigStore using the XDG-compliant config directory
    ///
    /// Returns `None` if the directory cannot be determined (e.g., no home directory).
    pub fn new() -> Option<Self> {
        let project_dirs = ProjectDirs::from("", "", "pollenwatch")?;
        let config_dir = project_dirs.config_dir().to_path_buf();
        Some(Self { config_dir })
    }

    /// Creates a new ConfigStore with a custom config directory
    pub fn with_dir(config_dir: PathBuf) -> Self {
        Self { config_dir }
    }

    /// Returns the path of the locations document
    pub fn path(&self) -> PathBuf {
        self.config_dir.join(LOCATIONS_FILE)
    }

    /// Loads every configured location
    pub fn load(&self) -> Result<Vec<LocationConfig>, ConfigError> {
        let path = self.path();
        if !path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&path)?;
        let document: StoreDocument = serde_json::from_str(&content)?;
        debug!(path = %path.display(), count = document.locations.len(), "Loaded locations");

        Ok(document.locations)
    }

    /// Returns the location with this unique id
    pub fn get(&self, unique_id: &str) -> Result<Option<LocationConfig>, ConfigError> {
        Ok(self
            .load()?
            .into_iter()
            .find(|location| location.unique_id() == unique_id))
    }

    /// Returns true if a location with this unique id is stored
    pub fn contains(&self, unique_id: &str) -> Result<bool, ConfigError> {
        Ok(self.get(unique_id)?.is_some())
    }

    /// Stores a new location
    ///
    /// # Returns
    /// * `Ok(())` on success
    /// * `Err(ConfigError::AlreadyConfigured)` if its coordinates are already stored
    pub fn insert(&self, location: LocationConfig) -> Result<(), ConfigError> {
        let mut locations = self.load()?;
        let unique_id = location.unique_id();

        if locations.iter().any(|l| l.unique_id() == unique_id) {
            return Err(ConfigError::AlreadyConfigured(unique_id));
        }

        locations.push(location);
        self.save(&locations)
    }

    /// Changes the language of a stored location and returns the updated entry
    pub fn update_language(
        &self,
        unique_id: &str,
        language: &str,
    ) -> Result<LocationConfig, ConfigError> {
        let mut locations = self.load()?;
        let location = locations
            .iter_mut()
            .find(|l| l.unique_id() == unique_id)
            .ok_or_else(|| ConfigError::NotFound(unique_id.to_string()))?;

        location.language = language.to_string();
        let updated = location.clone();

        self.save(&locations)?;
        Ok(updated)
    }

    /// Removes a stored location and returns it
    pub fn remove(&self, unique_id: &str) -> Result<LocationConfig, ConfigError> {
        let mut locations = self.load()?;
        let index = locations
            .iter()
            .position(|l| l.unique_id() == unique_id)
            .ok_or_else(|| ConfigError::NotFound(unique_id.to_string()))?;

        let removed = locations.remove(index);
        self.save(&locations)?;
        Ok(removed)
    }

    /// Rewrites the whole document, creating the directory if needed
    fn save(&self, locations: &[LocationConfig]) -> Result<(), ConfigError> {
        fs::create_dir_all(&self.config_dir)?;

        let document = StoreDocument {
            version: DOCUMENT_VERSION,
            locations: locations.to_vec(),
        };
        let json = serde_json::to_string_pretty(&document)?;

        fs::write(self.path(), json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_store() -> (ConfigStore, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = ConfigStore::with_dir(temp_dir.path().to_path_buf());
        (store, temp_dir)
    }

    fn location(lat: f64, lon: f64) -> LocationConfig {
        LocationConfig::new("AIzaKEY", lat, lon, "en").expect("location should be valid")
    }

    #[test]
    fn test_load_returns_empty_without_file() {
        let (store, _temp_dir) = create_test_store();

        let locations = store.load().expect("load should succeed");

        assert!(locations.is_empty());
    }

    #[test]
    fn test_insert_creates_file() {
        let (store, temp_dir) = create_test_store();

        store.insert(location(52.3676, 4.9041)).expect("insert should succeed");

        let expected_path = temp_dir.path().join("locations.json");
        assert!(expected_path.exists(), "Config file should exist");

        let content = fs::read_to_string(&expected_path).expect("Should read file");
        assert!(content.contains("\"api_key\""));
        assert!(content.contains("52.3676"));
    }

    #[test]
    fn test_insert_rejects_duplicate_coordinates() {
        let (store, _temp_dir) = create_test_store();

        store.insert(location(52.3676, 4.9041)).expect("first insert");
        // Rounds onto the same key
        let result = store.insert(location(52.367_61, 4.904_09));

        assert!(matches!(result, Err(ConfigError::AlreadyConfigured(id)) if id == "52.3676-4.9041"));
        assert_eq!(store.load().expect("load").len(), 1);
    }

    #[test]
    fn test_insert_rejects_coordinates_rounding_to_zero_from_either_side() {
        let (store, _temp_dir) = create_test_store();

        store.insert(location(0.000_01, 5.0)).expect("first insert");
        let result = store.insert(location(-0.000_01, 5.0));

        assert!(matches!(result, Err(ConfigError::AlreadyConfigured(id)) if id == "0.0-5.0"));
        assert_eq!(store.load().expect("load").len(), 1);
    }

    #[test]
    fn test_get_and_contains() {
        let (store, _temp_dir) = create_test_store();
        store.insert(location(10.0, 20.0)).expect("insert");
        store.insert(location(-33.8688, 151.2093)).expect("insert");

        let found = store.get("-33.8688-151.2093").expect("get").expect("present");
        assert_eq!(found.longitude, 151.2093);
        assert!(store.contains("10.0-20.0").expect("contains"));
        assert!(!store.contains("0-0").expect("contains"));
    }

    #[test]
    fn test_update_language() {
        let (store, _temp_dir) = create_test_store();
        store.insert(location(10.0, 20.0)).expect("insert");

        let updated = store.update_language("10.0-20.0", "de").expect("update");

        assert_eq!(updated.language, "de");
        assert_eq!(store.get("10.0-20.0").expect("get").map(|l| l.language), Some("de".to_string()));
    }

    #[test]
    fn test_update_language_unknown_location() {
        let (store, _temp_dir) = create_test_store();

        let result = store.update_language("1-2", "de");

        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_remove() {
        let (store, _temp_dir) = create_test_store();
        store.insert(location(10.0, 20.0)).expect("insert");
        store.insert(location(30.0, 40.0)).expect("insert");

        let removed = store.remove("10.0-20.0").expect("remove");

        assert_eq!(removed.latitude, 10.0);
        let remaining: Vec<String> = store.load().expect("load").iter().map(|l| l.unique_id()).collect();
        assert_eq!(remaining, vec!["30.0-40.0"]);
        assert!(matches!(store.remove("10.0-20.0"), Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_save_creates_directory_if_missing() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let nested_path = temp_dir.path().join("nested").join("config");
        let store = ConfigStore::with_dir(nested_path.clone());

        store.insert(location(1.0, 2.0)).expect("insert should succeed");

        assert!(nested_path.join("locations.json").exists());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let (store, _temp_dir) = create_test_store();
        fs::write(store.path(), "{not json").expect("write");

        assert!(matches!(store.load(), Err(ConfigError::Json(_))));
    }

    #[test]
    fn test_new_creates_xdg_compliant_path() {
        if let Some(store) = ConfigStore::new() {
            let path_str = store.config_dir.to_string_lossy();
            assert!(
                path_str.contains("pollenwatch"),
                "Config path should contain project name"
            );
        }
        // Test passes if new() returns None (e.g., no home directory in CI)
    }
}
