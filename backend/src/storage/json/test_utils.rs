//! Test utilities for storage-backed tests.
//!
//! RAII-based: the temp directory is removed when the environment drops,
//! even if a test panics.

use anyhow::Result;
use std::sync::Arc;
use tempfile::TempDir;

use super::store::JsonFileStore;

/// A fresh store over a temporary directory, cleaned up on drop.
pub struct TestEnvironment {
    pub store: Arc<JsonFileStore>,
    pub base_path: std::path::PathBuf,
    _temp_dir: TempDir, // keep alive to prevent cleanup
}

impl TestEnvironment {
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let store = Arc::new(JsonFileStore::new(temp_dir.path())?);
        Ok(Self {
            store,
            base_path: temp_dir.path().to_path_buf(),
            _temp_dir: temp_dir,
        })
    }
}
