//! # JSON File Store
//!
//! File-backed [`RecordStore`] implementation: each named collection persists
//! as `{key}.json` under a base directory. Reads of absent files return the
//! collection's empty default; writes go through a temp file and an atomic
//! rename so a crash mid-write never leaves a half-written collection.
//!
//! ## File layout
//!
//! ```text
//! data/
//! ├── vehicles.json
//! ├── maintenanceRecords.json
//! ├── fuelRecords.json
//! ├── currentVehicleId.json
//! ├── migrated.json
//! ├── backupVehicleInfo.json      ← migration backup slot
//! ├── importBackup.json           ← pre-import snapshot slot
//! └── vehicleInfo.json            ← legacy single-vehicle slot
//! ```

use anyhow::{Context, Result};
use chrono::Utc;
use log::{debug, info, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::models::{FuelRecord, LegacyVehicleInfo, MaintenanceRecord, Vehicle};
use crate::storage::traits::{ImportBackup, RecordStore};

/// Collection keys, matching the external record-store contract.
pub mod keys {
    pub const VEHICLES: &str = "vehicles";
    pub const MAINTENANCE_RECORDS: &str = "maintenanceRecords";
    pub const FUEL_RECORDS: &str = "fuelRecords";
    pub const CURRENT_VEHICLE_ID: &str = "currentVehicleId";
    pub const MIGRATED: &str = "migrated";
    pub const CONSUMPTION_RECOMPUTED: &str = "fuelConsumptionMigrated";
    pub const MIGRATION_BACKUP: &str = "backupVehicleInfo";
    pub const IMPORT_BACKUP: &str = "importBackup";
    pub const LEGACY_VEHICLE_INFO: &str = "vehicleInfo";
}

/// Record store persisting each collection as a JSON file.
#[derive(Clone)]
pub struct JsonFileStore {
    base_directory: PathBuf,
}

impl JsonFileStore {
    /// Open (and create if needed) a store rooted at `base_directory`.
    pub fn new<P: AsRef<Path>>(base_directory: P) -> Result<Self> {
        let base_path = base_directory.as_ref().to_path_buf();
        if !base_path.exists() {
            fs::create_dir_all(&base_path)
                .with_context(|| format!("创建数据目录失败: {}", base_path.display()))?;
        }
        Ok(Self {
            base_directory: base_path,
        })
    }

    pub fn base_directory(&self) -> &Path {
        &self.base_directory
    }

    fn collection_path(&self, key: &str) -> PathBuf {
        self.base_directory.join(format!("{}.json", key))
    }

    /// Load a collection, or `None` when its file does not exist.
    fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let path = self.collection_path(key);
        if !path.exists() {
            debug!("Collection {} not present, using default", key);
            return Ok(None);
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("读取集合失败: {}", key))?;
        let value = serde_json::from_str(&content)
            .with_context(|| format!("解析集合失败: {}", key))?;
        Ok(Some(value))
    }

    /// Write a collection atomically: temp file in the same directory, then
    /// rename over the target.
    fn save<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let path = self.collection_path(key);
        let temp_path = self.base_directory.join(format!(".{}.json.tmp", key));
        let content =
            serde_json::to_string_pretty(value).with_context(|| format!("序列化集合失败: {}", key))?;
        fs::write(&temp_path, content).with_context(|| format!("写入集合失败: {}", key))?;
        fs::rename(&temp_path, &path).with_context(|| format!("提交集合失败: {}", key))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.collection_path(key);
        if path.exists() {
            fs::remove_file(&path).with_context(|| format!("删除集合失败: {}", key))?;
        }
        Ok(())
    }
}

impl RecordStore for JsonFileStore {
    fn get_vehicles(&self) -> Result<Vec<Vehicle>> {
        Ok(self.load(keys::VEHICLES)?.unwrap_or_default())
    }

    fn set_vehicles(&self, vehicles: &[Vehicle]) -> Result<()> {
        self.save(keys::VEHICLES, &vehicles)
    }

    fn clear_vehicles(&self) -> Result<()> {
        self.remove(keys::VEHICLES)
    }

    fn get_maintenance_records(&self) -> Result<Vec<MaintenanceRecord>> {
        Ok(self.load(keys::MAINTENANCE_RECORDS)?.unwrap_or_default())
    }

    fn set_maintenance_records(&self, records: &[MaintenanceRecord]) -> Result<()> {
        self.save(keys::MAINTENANCE_RECORDS, &records)
    }

    fn get_fuel_records(&self) -> Result<Vec<FuelRecord>> {
        Ok(self.load(keys::FUEL_RECORDS)?.unwrap_or_default())
    }

    fn set_fuel_records(&self, records: &[FuelRecord]) -> Result<()> {
        self.save(keys::FUEL_RECORDS, &records)
    }

    fn get_current_vehicle_id(&self) -> Result<String> {
        Ok(self.load(keys::CURRENT_VEHICLE_ID)?.unwrap_or_default())
    }

    fn set_current_vehicle_id(&self, id: &str) -> Result<()> {
        self.save(keys::CURRENT_VEHICLE_ID, &id)
    }

    fn clear_current_vehicle_id(&self) -> Result<()> {
        self.remove(keys::CURRENT_VEHICLE_ID)
    }

    fn is_migrated(&self) -> Result<bool> {
        Ok(self.load(keys::MIGRATED)?.unwrap_or(false))
    }

    fn set_migrated(&self, migrated: bool) -> Result<()> {
        self.save(keys::MIGRATED, &migrated)
    }

    fn clear_migrated(&self) -> Result<()> {
        self.remove(keys::MIGRATED)
    }

    fn is_consumption_recomputed(&self) -> Result<bool> {
        Ok(self.load(keys::CONSUMPTION_RECOMPUTED)?.unwrap_or(false))
    }

    fn set_consumption_recomputed(&self, done: bool) -> Result<()> {
        self.save(keys::CONSUMPTION_RECOMPUTED, &done)
    }

    fn get_legacy_vehicle_info(&self) -> Result<LegacyVehicleInfo> {
        Ok(self.load(keys::LEGACY_VEHICLE_INFO)?.unwrap_or_default())
    }

    fn set_legacy_vehicle_info(&self, info: &LegacyVehicleInfo) -> Result<()> {
        self.save(keys::LEGACY_VEHICLE_INFO, info)
    }

    fn get_migration_backup(&self) -> Result<Option<LegacyVehicleInfo>> {
        self.load(keys::MIGRATION_BACKUP)
    }

    fn set_migration_backup(&self, info: &LegacyVehicleInfo) -> Result<()> {
        self.save(keys::MIGRATION_BACKUP, info)
    }

    fn clear_migration_backup(&self) -> Result<()> {
        self.remove(keys::MIGRATION_BACKUP)
    }

    fn backup_all(&self) -> Result<ImportBackup> {
        let backup = ImportBackup {
            timestamp: Utc::now().timestamp_millis(),
            data: self.get_all_data()?,
        };
        self.save(keys::IMPORT_BACKUP, &backup)?;
        info!("STORAGE: backup written, timestamp {}", backup.timestamp);
        Ok(backup)
    }

    fn restore_backup(&self) -> Result<bool> {
        let backup: Option<ImportBackup> = self.load(keys::IMPORT_BACKUP)?;
        let Some(backup) = backup else {
            warn!("STORAGE: no backup to restore");
            return Ok(false);
        };
        // Write all four slots directly so restoration is exact even when the
        // snapshot's current-vehicle pointer was empty.
        self.set_vehicles(&backup.data.vehicles)?;
        self.set_maintenance_records(&backup.data.maintenance_records)?;
        self.set_fuel_records(&backup.data.fuel_records)?;
        self.set_current_vehicle_id(&backup.data.current_vehicle_id)?;
        info!("STORAGE: backup restored, timestamp {}", backup.timestamp);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::json::test_utils::TestEnvironment;

    #[test]
    fn absent_collections_read_as_defaults() {
        let env = TestEnvironment::new().unwrap();
        assert!(env.store.get_vehicles().unwrap().is_empty());
        assert!(env.store.get_fuel_records().unwrap().is_empty());
        assert_eq!(env.store.get_current_vehicle_id().unwrap(), "");
        assert!(!env.store.is_migrated().unwrap());
    }

    #[test]
    fn collections_round_trip() {
        let env = TestEnvironment::new().unwrap();
        let vehicles = vec![Vehicle {
            id: "v_1_a".to_string(),
            name: "测试车辆".to_string(),
            is_default: true,
            ..Default::default()
        }];
        env.store.set_vehicles(&vehicles).unwrap();
        env.store.set_current_vehicle_id("v_1_a").unwrap();

        assert_eq!(env.store.get_vehicles().unwrap(), vehicles);
        assert_eq!(env.store.get_current_vehicle_id().unwrap(), "v_1_a");
    }

    #[test]
    fn backup_and_restore_round_trip() {
        let env = TestEnvironment::new().unwrap();
        env.store
            .set_vehicles(&[Vehicle {
                id: "v_1_a".to_string(),
                name: "A".to_string(),
                ..Default::default()
            }])
            .unwrap();
        env.store.backup_all().unwrap();

        // Clobber everything, then restore
        env.store.set_vehicles(&[]).unwrap();
        env.store.set_current_vehicle_id("v_other").unwrap();
        assert!(env.store.restore_backup().unwrap());

        assert_eq!(env.store.get_vehicles().unwrap().len(), 1);
        assert_eq!(env.store.get_current_vehicle_id().unwrap(), "");
    }

    #[test]
    fn restore_without_backup_reports_false() {
        let env = TestEnvironment::new().unwrap();
        assert!(!env.store.restore_backup().unwrap());
    }

    #[test]
    fn migration_flags_persist() {
        let env = TestEnvironment::new().unwrap();
        env.store.set_migrated(true).unwrap();
        assert!(env.store.is_migrated().unwrap());
        env.store.clear_migrated().unwrap();
        assert!(!env.store.is_migrated().unwrap());
    }
}
