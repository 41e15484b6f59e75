//! Export bundle assembly, checksum and the prepared-file cache.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use chrono::{Local, Utc};
use log::{info, warn};

use shared::PreparedExportInfo;

use crate::domain::errors::ImportError;
use crate::domain::models::{to_base36, AllData, ImportBundle};
use crate::storage::RecordStore;

/// Bundle format version. Imports accept any bundle with the same major.
pub const EXPORT_VERSION: &str = "1.0.0";
/// App name stamped into bundles; import validation checks it loosely.
pub const EXPORT_APP_NAME: &str = "摩托车维护记录";

/// Rolling 32-bit hash over UTF-16 code units of the canonical JSON
/// serialization: `h = (h << 5) - h + code` wrapping, absolute value,
/// base-36. Key order is the `AllData` declaration order. Stable for a
/// given dataset; numeric formatting of floats may differ from checksums
/// produced by other serializers, which is why mismatches only warn.
pub fn generate_checksum(data: &AllData) -> Result<String> {
    let json = serde_json::to_string(data).context("序列化导出数据失败")?;
    let mut hash: i32 = 0;
    for code in json.encode_utf16() {
        hash = hash.wrapping_shl(5).wrapping_sub(hash).wrapping_add(code as i32);
    }
    Ok(to_base36((hash as i64).unsigned_abs()))
}

/// Builds export bundles and remembers the last prepared file so repeated
/// "share" taps reuse it while the data is unchanged.
pub struct ExportService<S: RecordStore> {
    store: Arc<S>,
    prepared: Mutex<Option<PreparedExportInfo>>,
}

impl<S: RecordStore> ExportService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            prepared: Mutex::new(None),
        }
    }

    /// Snapshot the store into a self-describing bundle.
    /// Fails with [`ImportError::NoData`] when there are no vehicles:
    /// an empty export is never useful and usually means a broken store.
    pub fn build_export_bundle(&self) -> Result<ImportBundle> {
        let data = self.store.get_all_data()?;
        if data.vehicles.is_empty() {
            return Err(ImportError::NoData.into());
        }
        let checksum = generate_checksum(&data)?;
        info!(
            "EXPORT: bundle with {} vehicles / {} maintenance / {} fuel, checksum {}",
            data.vehicles.len(),
            data.maintenance_records.len(),
            data.fuel_records.len(),
            checksum
        );
        Ok(ImportBundle {
            version: EXPORT_VERSION.to_string(),
            app_name: EXPORT_APP_NAME.to_string(),
            export_time: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            data,
            checksum: Some(checksum),
        })
    }

    /// Write the bundle as pretty JSON under `dir` (or the platform
    /// downloads/documents directory). Returns the written path.
    pub fn export_to_file(&self, dir: Option<&Path>) -> Result<PathBuf> {
        let bundle = self.build_export_bundle()?;
        let dir = match dir {
            Some(d) => d.to_path_buf(),
            None => default_export_dir()?,
        };
        fs::create_dir_all(&dir)
            .with_context(|| format!("创建导出目录失败: {}", dir.display()))?;

        let file_name = format!("{}_{}.json", EXPORT_APP_NAME, Local::now().format("%Y-%m-%d"));
        let path = dir.join(&file_name);
        let json = serde_json::to_string_pretty(&bundle).context("序列化导出文件失败")?;
        fs::write(&path, json)
            .with_context(|| format!("写入导出文件失败: {}", path.display()))?;

        info!("EXPORT: wrote {}", path.display());
        Ok(path)
    }

    /// Write the export file and cache its metadata for quick re-share.
    pub fn prepare(&self, dir: Option<&Path>) -> Result<PreparedExportInfo> {
        let path = self.export_to_file(dir)?;
        let data = self.store.get_all_data()?;
        let entry = PreparedExportInfo {
            file_path: path.display().to_string(),
            file_name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            timestamp: Utc::now().timestamp_millis(),
            data_checksum: generate_checksum(&data)?,
        };
        *self.lock_prepared() = Some(entry.clone());
        Ok(entry)
    }

    /// Metadata of the last prepared file, if any.
    pub fn info(&self) -> Option<PreparedExportInfo> {
        self.lock_prepared().clone()
    }

    /// True when no prepared file exists or the data changed since it was
    /// written.
    pub fn is_stale(&self, current_checksum: &str) -> bool {
        match self.lock_prepared().as_ref() {
            Some(entry) => entry.data_checksum != current_checksum,
            None => true,
        }
    }

    /// Drop the cache entry. The file on disk is left alone; the next
    /// prepare overwrites it.
    pub fn invalidate(&self) {
        if self.lock_prepared().take().is_some() {
            info!("EXPORT: prepared file cache invalidated");
        }
    }

    fn lock_prepared(&self) -> std::sync::MutexGuard<'_, Option<PreparedExportInfo>> {
        self.prepared.lock().unwrap_or_else(|poisoned| {
            warn!("EXPORT: prepared cache lock poisoned, recovering");
            poisoned.into_inner()
        })
    }
}

fn default_export_dir() -> Result<PathBuf> {
    dirs::download_dir()
        .or_else(dirs::document_dir)
        .or_else(dirs::home_dir)
        .context("找不到默认导出目录")
}
