//! One-time data migrations.
//!
//! Two independent, flag-guarded transitions: the single-vehicle →
//! multi-vehicle storage model, and a recompute of the derived
//! `fuel_consumption` field after its formula changed. Both are idempotent:
//! re-running with the flag set is a no-op reported as skipped.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Local;
use log::{info, warn};

use shared::{MigrationOutcome, RecomputeOutcome};

use crate::domain::fuel_stats::recalculate_all;
use crate::domain::models::Vehicle;
use crate::storage::RecordStore;

/// Name given to the vehicle synthesized from legacy single-vehicle data
/// when none was recorded.
pub const DEFAULT_VEHICLE_NAME: &str = "默认车辆";

pub struct MigrationService<S: RecordStore> {
    store: Arc<S>,
}

impl<S: RecordStore> MigrationService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Convert legacy single-vehicle storage to the multi-vehicle model.
    ///
    /// The legacy vehicle info is backed up verbatim first (it feeds
    /// [`Self::rollback_migration`]), then one vehicle is synthesized from
    /// it and every record is stamped with the new vehicle id. Runs under
    /// the same snapshot/restore discipline as imports: any mid-transition
    /// failure restores the pre-migration state before surfacing.
    pub fn migrate_to_multi_vehicle(&self) -> Result<MigrationOutcome> {
        if self.store.is_migrated()? {
            return Ok(MigrationOutcome {
                success: true,
                skipped: true,
                ..Default::default()
            });
        }

        info!("MIGRATION: single-vehicle data detected, migrating");
        self.store.backup_all()?;
        match self.apply_migration() {
            Ok(outcome) => {
                info!(
                    "MIGRATION: done, vehicle {} with {} maintenance / {} fuel records",
                    outcome.vehicle_id.as_deref().unwrap_or_default(),
                    outcome.maintenance_count,
                    outcome.fuel_count
                );
                Ok(outcome)
            }
            Err(err) => {
                warn!("MIGRATION: failed ({err}), restoring snapshot");
                match self.store.restore_backup() {
                    Ok(true) => Err(err),
                    Ok(false) => Err(err.context("恢复迁移前快照失败：没有可用的备份")),
                    Err(restore_err) => {
                        Err(err.context(format!("恢复迁移前快照失败：{restore_err}")))
                    }
                }
            }
        }
    }

    fn apply_migration(&self) -> Result<MigrationOutcome> {
        let legacy = self.store.get_legacy_vehicle_info()?;
        self.store
            .set_migration_backup(&legacy)
            .context("备份旧车辆信息失败")?;

        let vehicle = Vehicle {
            id: Vehicle::generate_id(),
            name: legacy
                .name
                .clone()
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| DEFAULT_VEHICLE_NAME.to_string()),
            model: legacy.model.clone().unwrap_or_default(),
            mileage: legacy.mileage.unwrap_or(0.0),
            note: legacy.note.clone().unwrap_or_default(),
            created_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            is_default: true,
        };

        let mut maintenance = self.store.get_maintenance_records()?;
        for record in maintenance.iter_mut() {
            record.vehicle_id = vehicle.id.clone();
        }
        let mut fuel = self.store.get_fuel_records()?;
        for record in fuel.iter_mut() {
            record.vehicle_id = vehicle.id.clone();
        }

        self.store.set_vehicles(std::slice::from_ref(&vehicle))?;
        self.store.set_current_vehicle_id(&vehicle.id)?;
        self.store.set_maintenance_records(&maintenance)?;
        self.store.set_fuel_records(&fuel)?;
        self.store.set_migrated(true)?;

        Ok(MigrationOutcome {
            success: true,
            skipped: false,
            vehicle_id: Some(vehicle.id),
            maintenance_count: maintenance.len(),
            fuel_count: fuel.len(),
        })
    }

    /// Manual escape hatch: undo the multi-vehicle migration.
    ///
    /// Restores the backed-up legacy vehicle info, removes the vehicle
    /// collection and the migrated flag, and strips the vehicle stamp from
    /// every record.
    pub fn rollback_migration(&self) -> Result<()> {
        warn!("MIGRATION: rolling back to single-vehicle storage");

        if let Some(legacy) = self.store.get_migration_backup()? {
            self.store
                .set_legacy_vehicle_info(&legacy)
                .context("恢复旧车辆信息失败")?;
        }

        let mut maintenance = self.store.get_maintenance_records()?;
        for record in maintenance.iter_mut() {
            record.vehicle_id = String::new();
        }
        self.store.set_maintenance_records(&maintenance)?;

        let mut fuel = self.store.get_fuel_records()?;
        for record in fuel.iter_mut() {
            record.vehicle_id = String::new();
        }
        self.store.set_fuel_records(&fuel)?;

        self.store.clear_vehicles()?;
        self.store.clear_current_vehicle_id()?;
        self.store.clear_migrated()?;
        self.store.clear_migration_backup()?;
        Ok(())
    }

    /// Recompute the derived consumption field once, after the formula
    /// change. Old data is recognizable by `consumption == volume / 100`,
    /// the broken formula's output; when no record matches, the flag is set
    /// without touching anything.
    pub fn recompute_fuel_consumption_once(&self) -> Result<RecomputeOutcome> {
        if self.store.is_consumption_recomputed()? {
            return Ok(RecomputeOutcome {
                success: true,
                skipped: true,
                ..Default::default()
            });
        }

        let mut records = self.store.get_fuel_records()?;
        let total = records.len();

        let needs_recompute = records.iter().any(|r| {
            r.fuel_consumption > 0.0
                && (r.fuel_consumption - r.fuel_volume / 100.0).abs() < 1e-9
        });

        let updated = if needs_recompute {
            let updated = recalculate_all(&mut records);
            self.store.set_fuel_records(&records)?;
            updated
        } else {
            0
        };
        self.store.set_consumption_recomputed(true)?;

        info!(
            "MIGRATION: consumption recompute done, {}/{} records updated",
            updated, total
        );
        Ok(RecomputeOutcome {
            success: true,
            skipped: false,
            total,
            updated,
            unchanged: total - updated,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{FuelRecord, LegacyVehicleInfo, MaintenanceRecord};
    use crate::storage::json::test_utils::TestEnvironment;

    fn legacy_env() -> TestEnvironment {
        let env = TestEnvironment::new().unwrap();
        env.store
            .set_legacy_vehicle_info(&LegacyVehicleInfo {
                name: Some("春风450SR".to_string()),
                model: Some("450SR".to_string()),
                mileage: Some(12500.0),
                note: None,
            })
            .unwrap();
        env.store
            .set_maintenance_records(&[MaintenanceRecord {
                id: "m_1".to_string(),
                ..Default::default()
            }])
            .unwrap();
        env.store
            .set_fuel_records(&[FuelRecord {
                id: "f_1".to_string(),
                time: "2025-01-01 00:00".to_string(),
                total_mileage: 1000.0,
                ..Default::default()
            }])
            .unwrap();
        env
    }

    #[test]
    fn migration_synthesizes_vehicle_from_legacy_info() {
        let env = legacy_env();
        let service = MigrationService::new(env.store.clone());

        let outcome = service.migrate_to_multi_vehicle().unwrap();
        assert!(outcome.success);
        assert!(!outcome.skipped);
        assert_eq!(outcome.maintenance_count, 1);
        assert_eq!(outcome.fuel_count, 1);

        let vehicles = env.store.get_vehicles().unwrap();
        assert_eq!(vehicles.len(), 1);
        assert_eq!(vehicles[0].name, "春风450SR");
        assert_eq!(vehicles[0].mileage, 12500.0);
        assert!(vehicles[0].is_default);
        assert_eq!(env.store.get_current_vehicle_id().unwrap(), vehicles[0].id);

        // Every record carries the new vehicle id
        assert_eq!(
            env.store.get_maintenance_records().unwrap()[0].vehicle_id,
            vehicles[0].id
        );
        assert_eq!(
            env.store.get_fuel_records().unwrap()[0].vehicle_id,
            vehicles[0].id
        );
        assert!(env.store.is_migrated().unwrap());
    }

    #[test]
    fn migration_without_legacy_info_uses_defaults() {
        let env = TestEnvironment::new().unwrap();
        let service = MigrationService::new(env.store.clone());
        service.migrate_to_multi_vehicle().unwrap();

        let vehicles = env.store.get_vehicles().unwrap();
        assert_eq!(vehicles[0].name, DEFAULT_VEHICLE_NAME);
        assert_eq!(vehicles[0].model, "");
        assert_eq!(vehicles[0].mileage, 0.0);
    }

    #[test]
    fn migration_is_idempotent() {
        let env = legacy_env();
        let service = MigrationService::new(env.store.clone());

        service.migrate_to_multi_vehicle().unwrap();
        let vehicles_after_first = env.store.get_vehicles().unwrap();

        let second = service.migrate_to_multi_vehicle().unwrap();
        assert!(second.success);
        assert!(second.skipped);
        assert_eq!(env.store.get_vehicles().unwrap(), vehicles_after_first);
    }

    #[test]
    fn rollback_restores_legacy_shape() {
        let env = legacy_env();
        let service = MigrationService::new(env.store.clone());
        service.migrate_to_multi_vehicle().unwrap();

        service.rollback_migration().unwrap();

        assert!(env.store.get_vehicles().unwrap().is_empty());
        assert_eq!(env.store.get_current_vehicle_id().unwrap(), "");
        assert!(!env.store.is_migrated().unwrap());
        assert!(env.store.get_migration_backup().unwrap().is_none());

        let legacy = env.store.get_legacy_vehicle_info().unwrap();
        assert_eq!(legacy.name.as_deref(), Some("春风450SR"));
        assert_eq!(env.store.get_fuel_records().unwrap()[0].vehicle_id, "");

        // Migration can run again after rollback
        let outcome = service.migrate_to_multi_vehicle().unwrap();
        assert!(!outcome.skipped);
    }

    #[test]
    fn consumption_recompute_targets_broken_formula_output() {
        let env = TestEnvironment::new().unwrap();
        let service = MigrationService::new(env.store.clone());

        // Two records; the second carries volume/100, the broken formula's
        // signature (10.5 / 100 = 0.105)
        let first = FuelRecord {
            id: "f_1".to_string(),
            vehicle_id: "v_1_a".to_string(),
            time: "2025-01-01 00:00".to_string(),
            date: "2025-01-01".to_string(),
            total_mileage: 1000.0,
            fuel_volume: 10.0,
            is_full: true,
            ..Default::default()
        };
        let second = FuelRecord {
            id: "f_2".to_string(),
            vehicle_id: "v_1_a".to_string(),
            time: "2025-02-01 00:00".to_string(),
            date: "2025-02-01".to_string(),
            total_mileage: 1200.0,
            fuel_volume: 10.5,
            fuel_consumption: 0.105,
            ..Default::default()
        };
        env.store.set_fuel_records(&[first, second]).unwrap();

        let outcome = service.recompute_fuel_consumption_once().unwrap();
        assert!(!outcome.skipped);
        assert_eq!(outcome.total, 2);
        assert_eq!(outcome.updated, 1);
        assert_eq!(outcome.unchanged, 1);

        let records = env.store.get_fuel_records().unwrap();
        // 10.5 L over 200 km with a full previous fill = 5.25 L/100km
        assert_eq!(records[1].fuel_consumption, 5.25);

        // Flag is set; the second run skips
        assert!(service.recompute_fuel_consumption_once().unwrap().skipped);
    }

    #[test]
    fn clean_data_only_sets_the_flag() {
        let env = TestEnvironment::new().unwrap();
        let service = MigrationService::new(env.store.clone());
        let record = FuelRecord {
            id: "f_1".to_string(),
            time: "2025-01-01 00:00".to_string(),
            fuel_consumption: 5.0,
            fuel_volume: 10.0,
            ..Default::default()
        };
        env.store.set_fuel_records(std::slice::from_ref(&record)).unwrap();

        let outcome = service.recompute_fuel_consumption_once().unwrap();
        assert!(!outcome.skipped);
        assert_eq!(outcome.updated, 0);
        assert_eq!(env.store.get_fuel_records().unwrap()[0], record);
    }
}
