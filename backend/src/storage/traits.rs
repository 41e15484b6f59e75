//! # Storage Traits
//!
//! The record-store abstraction the domain layer is written against. The
//! store holds named collections with synchronous get/set semantics; domain
//! services never touch files directly, so alternative backends can be
//! swapped in without touching business logic.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::domain::models::{AllData, FuelRecord, LegacyVehicleInfo, MaintenanceRecord, Vehicle};

/// A pre-import snapshot of the whole store, kept in the import backup slot
/// so a failed import can be rolled back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportBackup {
    /// Unix millis when the snapshot was taken
    pub timestamp: i64,
    pub data: AllData,
}

/// Key-value persistence over named collections.
///
/// Absent collections read as their empty default; write failures propagate
/// as errors (the legacy boolean-false convention is not carried over).
pub trait RecordStore: Send + Sync {
    fn get_vehicles(&self) -> Result<Vec<Vehicle>>;
    fn set_vehicles(&self, vehicles: &[Vehicle]) -> Result<()>;
    fn clear_vehicles(&self) -> Result<()>;

    fn get_maintenance_records(&self) -> Result<Vec<MaintenanceRecord>>;
    fn set_maintenance_records(&self, records: &[MaintenanceRecord]) -> Result<()>;

    fn get_fuel_records(&self) -> Result<Vec<FuelRecord>>;
    fn set_fuel_records(&self, records: &[FuelRecord]) -> Result<()>;

    fn get_current_vehicle_id(&self) -> Result<String>;
    fn set_current_vehicle_id(&self, id: &str) -> Result<()>;
    fn clear_current_vehicle_id(&self) -> Result<()>;

    /// One-time multi-vehicle migration flag.
    fn is_migrated(&self) -> Result<bool>;
    fn set_migrated(&self, migrated: bool) -> Result<()>;
    fn clear_migrated(&self) -> Result<()>;

    /// One-time fuel-consumption recompute flag.
    fn is_consumption_recomputed(&self) -> Result<bool>;
    fn set_consumption_recomputed(&self, done: bool) -> Result<()>;

    /// Legacy single-vehicle slot, consumed only by migration.
    fn get_legacy_vehicle_info(&self) -> Result<LegacyVehicleInfo>;
    fn set_legacy_vehicle_info(&self, info: &LegacyVehicleInfo) -> Result<()>;

    /// Verbatim backup of the legacy slot taken before migration.
    fn get_migration_backup(&self) -> Result<Option<LegacyVehicleInfo>>;
    fn set_migration_backup(&self, info: &LegacyVehicleInfo) -> Result<()>;
    fn clear_migration_backup(&self) -> Result<()>;

    /// Snapshot the three collections plus the current-vehicle pointer into
    /// the import backup slot.
    fn backup_all(&self) -> Result<ImportBackup>;

    /// Restore the import backup slot. Returns false when no backup exists.
    fn restore_backup(&self) -> Result<bool>;

    /// Whole-dataset read, the unit of export and backup.
    fn get_all_data(&self) -> Result<AllData> {
        Ok(AllData {
            vehicles: self.get_vehicles()?,
            maintenance_records: self.get_maintenance_records()?,
            fuel_records: self.get_fuel_records()?,
            current_vehicle_id: self.get_current_vehicle_id()?,
        })
    }

    /// Whole-dataset write. The current-vehicle pointer is only written when
    /// non-empty, so a merge result that kept the local pointer and a bundle
    /// without one behave the same.
    fn set_all_data(&self, data: &AllData) -> Result<()> {
        self.set_vehicles(&data.vehicles)?;
        self.set_maintenance_records(&data.maintenance_records)?;
        self.set_fuel_records(&data.fuel_records)?;
        if !data.current_vehicle_id.is_empty() {
            self.set_current_vehicle_id(&data.current_vehicle_id)?;
        }
        Ok(())
    }
}
