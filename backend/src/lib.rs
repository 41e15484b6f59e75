//! Core library for the moto-log vehicle maintenance and fuel tracker.
//!
//! Everything UI-independent lives here: the JSON-file record store, the
//! fuel metrics engine, the CSV import/export pipeline, whole-dataset
//! import/export with backup and rollback, and the one-time storage-model
//! migrations. Hosts construct a [`Backend`] over a data directory and call
//! the services it exposes.

pub mod domain;
pub mod storage;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use log::info;

use domain::{ExportService, ImportService, MigrationService, VehicleService};
use storage::JsonFileStore;

/// The assembled core: one store, one instance of each service.
///
/// Construction runs the pending one-time migrations, so callers always see
/// multi-vehicle storage with up-to-date derived fields.
pub struct Backend {
    pub store: Arc<JsonFileStore>,
    pub vehicles: VehicleService<JsonFileStore>,
    pub exports: ExportService<JsonFileStore>,
    pub imports: ImportService<JsonFileStore>,
    pub migrations: MigrationService<JsonFileStore>,
}

impl Backend {
    pub fn new(base_directory: &Path) -> Result<Self> {
        let store =
            Arc::new(JsonFileStore::new(base_directory).context("初始化存储失败")?);

        let migrations = MigrationService::new(store.clone());
        let outcome = migrations
            .migrate_to_multi_vehicle()
            .context("多车辆迁移失败")?;
        if !outcome.skipped {
            info!(
                "BACKEND: migrated to multi-vehicle storage, vehicle {}",
                outcome.vehicle_id.as_deref().unwrap_or_default()
            );
        }
        migrations
            .recompute_fuel_consumption_once()
            .context("油耗数据迁移失败")?;

        Ok(Self {
            vehicles: VehicleService::new(store.clone()),
            exports: ExportService::new(store.clone()),
            imports: ImportService::new(store.clone()),
            migrations,
            store,
        })
    }
}
