//! Whole-bundle and CSV-batch import with backup/rollback.
//!
//! Both import paths follow the same discipline: snapshot the store first,
//! apply, verify what was written, and restore the snapshot on any failure.
//! Only a failed restore surfaces as [`ImportError::RollbackFailed`]; every
//! other failure leaves the store byte-identical to its pre-import state.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use log::{info, warn};

use shared::{
    CsvFieldError, CsvImportOutcome, CsvImportStats, DuplicateDetail, ImportMode, ImportStats,
};

use crate::domain::csv::{detect_duplicates, map_csv_row_to_fuel_record, validate_all_records};
use crate::domain::errors::{CsvError, ImportError};
use crate::domain::export_service::{generate_checksum, EXPORT_VERSION};
use crate::domain::fuel_stats::calculate_single_fuel_consumption;
use crate::domain::models::{AllData, FuelRecord, ImportBundle};
use crate::storage::RecordStore;

/// Parse bundle text. Shape errors (not JSON, wrong field types) are
/// [`ImportError::Structural`].
pub fn load_bundle_from_str(text: &str) -> Result<ImportBundle, ImportError> {
    serde_json::from_str(text.trim_start_matches('\u{feff}'))
        .map_err(|e| ImportError::Structural(e.to_string()))
}

/// Merge `incoming` into `local`, id-keyed per collection. The incoming copy
/// wins on id collision; each collision counts as one conflict. The local
/// current-vehicle pointer survives unless it was never set.
pub fn merge_data(local: &AllData, incoming: &AllData) -> (AllData, usize) {
    let mut conflicts = 0;

    fn merge_by_id<T: Clone>(
        local: &[T],
        incoming: &[T],
        id_of: impl Fn(&T) -> &str,
        conflicts: &mut usize,
    ) -> Vec<T> {
        let mut merged: Vec<T> = local.to_vec();
        let mut index: HashMap<String, usize> = merged
            .iter()
            .enumerate()
            .map(|(i, item)| (id_of(item).to_string(), i))
            .collect();
        for item in incoming {
            match index.get(id_of(item)) {
                Some(&i) => {
                    merged[i] = item.clone();
                    *conflicts += 1;
                }
                None => {
                    index.insert(id_of(item).to_string(), merged.len());
                    merged.push(item.clone());
                }
            }
        }
        merged
    }

    let merged = AllData {
        vehicles: merge_by_id(&local.vehicles, &incoming.vehicles, |v| &v.id, &mut conflicts),
        maintenance_records: merge_by_id(
            &local.maintenance_records,
            &incoming.maintenance_records,
            |r| &r.id,
            &mut conflicts,
        ),
        fuel_records: merge_by_id(
            &local.fuel_records,
            &incoming.fuel_records,
            |r| &r.id,
            &mut conflicts,
        ),
        current_vehicle_id: if local.current_vehicle_id.is_empty() {
            incoming.current_vehicle_id.clone()
        } else {
            local.current_vehicle_id.clone()
        },
    };
    (merged, conflicts)
}

/// Structural validation of a bundle before anything is written.
///
/// Checksum mismatches only warn: bundles written by other serializers hash
/// float formatting differently, and refusing them would strand old exports.
pub fn validate_import_bundle(bundle: &ImportBundle) -> Result<(), ImportError> {
    let bundle_major = bundle.version.split('.').next().unwrap_or_default();
    let current_major = EXPORT_VERSION.split('.').next().unwrap_or_default();
    if bundle_major != current_major {
        return Err(ImportError::VersionMismatch {
            bundle: bundle.version.clone(),
            current: EXPORT_VERSION.to_string(),
        });
    }

    if bundle.data.vehicles.is_empty() {
        return Err(ImportError::NoData);
    }
    for vehicle in &bundle.data.vehicles {
        if vehicle.id.is_empty() || vehicle.name.is_empty() {
            return Err(ImportError::Structural(
                "车辆数据缺少 id 或名称".to_string(),
            ));
        }
    }

    // Records with an empty vehicle id are legal (data exported before the
    // multi-vehicle migration); only a set-but-unknown id is dangling.
    let vehicle_ids: HashSet<&str> =
        bundle.data.vehicles.iter().map(|v| v.id.as_str()).collect();
    for record in &bundle.data.maintenance_records {
        if !record.vehicle_id.is_empty() && !vehicle_ids.contains(record.vehicle_id.as_str()) {
            return Err(ImportError::DanglingReference {
                record_kind: "维修记录".to_string(),
                vehicle_id: record.vehicle_id.clone(),
            });
        }
    }
    for record in &bundle.data.fuel_records {
        if !record.vehicle_id.is_empty() && !vehicle_ids.contains(record.vehicle_id.as_str()) {
            return Err(ImportError::DanglingReference {
                record_kind: "油耗记录".to_string(),
                vehicle_id: record.vehicle_id.clone(),
            });
        }
    }

    if let Some(declared) = bundle.checksum.as_deref() {
        let computed = generate_checksum(&bundle.data)?;
        if computed != declared {
            warn!(
                "IMPORT: checksum mismatch (declared {}, computed {}), importing anyway",
                declared, computed
            );
        }
    }

    Ok(())
}

/// Imports bundles and CSV batches into a [`RecordStore`].
pub struct ImportService<S: RecordStore> {
    store: Arc<S>,
}

impl<S: RecordStore> ImportService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Replace or merge the whole dataset from a bundle.
    pub fn import_data(
        &self,
        bundle: &ImportBundle,
        mode: ImportMode,
    ) -> Result<ImportStats, ImportError> {
        info!("IMPORT: starting {} import", mode);
        self.store.backup_all()?;
        match self.apply_bundle(bundle, mode) {
            Ok(stats) => {
                info!(
                    "IMPORT: done, {} vehicles / {} maintenance / {} fuel, {} conflicts",
                    stats.vehicles, stats.maintenance_records, stats.fuel_records, stats.conflicts
                );
                Ok(stats)
            }
            Err(err) => Err(self.roll_back(err)),
        }
    }

    fn apply_bundle(
        &self,
        bundle: &ImportBundle,
        mode: ImportMode,
    ) -> Result<ImportStats, ImportError> {
        validate_import_bundle(bundle)?;

        let (data, conflicts) = match mode {
            ImportMode::Overwrite => (bundle.data.clone(), 0),
            ImportMode::Merge => {
                let local = self.store.get_all_data()?;
                merge_data(&local, &bundle.data)
            }
        };
        self.store.set_all_data(&data)?;

        if self.store.get_vehicles()?.is_empty() {
            return Err(ImportError::VerificationFailed(
                "导入后没有任何车辆".to_string(),
            ));
        }

        Ok(ImportStats {
            mode,
            vehicles: data.vehicles.len(),
            maintenance_records: data.maintenance_records.len(),
            fuel_records: data.fuel_records.len(),
            conflicts,
        })
    }

    /// Import parsed CSV rows as fuel records for one vehicle.
    ///
    /// `fuel_types[i]` labels row `i`; missing entries default to empty.
    /// Bad rows and duplicates are skipped, not fatal; the outcome reports
    /// them per row. Derived consumption is recomputed for every imported
    /// record against the merged record set.
    pub fn import_csv_data(
        &self,
        rows: &[HashMap<String, String>],
        vehicle_id: &str,
        fuel_types: &[String],
    ) -> Result<CsvImportOutcome, ImportError> {
        info!("IMPORT: csv batch of {} rows for {}", rows.len(), vehicle_id);
        self.store.backup_all()?;
        match self.apply_csv(rows, vehicle_id, fuel_types) {
            Ok(outcome) => Ok(outcome),
            Err(err) => Err(self.roll_back(err)),
        }
    }

    fn apply_csv(
        &self,
        rows: &[HashMap<String, String>],
        vehicle_id: &str,
        fuel_types: &[String],
    ) -> Result<CsvImportOutcome, ImportError> {
        let total = rows.len();
        let mut errors: Vec<CsvFieldError> = Vec::new();
        let mut mapped: Vec<(usize, FuelRecord)> = Vec::new();

        for (i, row) in rows.iter().enumerate() {
            // Header is row 1, first data row is row 2
            let row_number = i + 2;
            let fuel_type = fuel_types.get(i).map(String::as_str).unwrap_or_default();
            match map_csv_row_to_fuel_record(row, vehicle_id, fuel_type) {
                Ok(record) => mapped.push((row_number, record)),
                Err(err) => errors.push(csv_field_error(row_number, &err)),
            }
        }

        let outcome = validate_all_records(mapped);
        errors.extend(outcome.errors);

        let all_records = self.store.get_fuel_records()?;
        let existing: Vec<FuelRecord> = all_records
            .iter()
            .filter(|r| r.vehicle_id == vehicle_id)
            .cloned()
            .collect();
        let scan = detect_duplicates(outcome.valid_records, &existing);
        let duplicates: Vec<DuplicateDetail> = scan.duplicates;

        let imported_ids: HashSet<String> = scan
            .safe_records
            .iter()
            .map(|(_, r)| r.id.clone())
            .collect();
        let imported = imported_ids.len();

        let mut merged = all_records;
        merged.extend(scan.safe_records.into_iter().map(|(_, r)| r));
        merged.sort_by(|a, b| a.sort_key().cmp(b.sort_key()));

        let snapshot = merged.clone();
        for record in merged.iter_mut() {
            if imported_ids.contains(&record.id) {
                record.fuel_consumption = calculate_single_fuel_consumption(record, &snapshot);
            }
        }

        self.store.set_fuel_records(&merged)?;
        let written = self.store.get_fuel_records()?.len();
        if written != merged.len() {
            return Err(ImportError::VerificationFailed(format!(
                "导入后记录数不符：期望 {}，实际 {}",
                merged.len(),
                written
            )));
        }

        info!(
            "IMPORT: csv done, {} imported, {} error rows, {} duplicates",
            imported,
            total - imported - duplicates.len(),
            duplicates.len()
        );
        Ok(CsvImportOutcome {
            stats: CsvImportStats {
                total,
                imported,
                skipped_errors: total - imported - duplicates.len(),
                skipped_duplicates: duplicates.len(),
            },
            errors,
            duplicates,
        })
    }

    fn roll_back(&self, err: ImportError) -> ImportError {
        if let ImportError::RollbackFailed { .. } = err {
            return err;
        }
        warn!("IMPORT: failed ({err}), restoring backup");
        match self.store.restore_backup() {
            Ok(true) => err,
            Ok(false) => ImportError::RollbackFailed {
                reason: "没有可用的备份".to_string(),
            },
            Err(restore_err) => ImportError::RollbackFailed {
                reason: restore_err.to_string(),
            },
        }
    }
}

fn csv_field_error(row: usize, err: &CsvError) -> CsvFieldError {
    let (field, value) = match err {
        CsvError::DateFormat { value } | CsvError::InvalidDate { value } => {
            ("日期".to_string(), value.clone())
        }
        CsvError::BooleanFormat { field, value, .. }
        | CsvError::NumberFormat { field, value } => (field.clone(), value.clone()),
        CsvError::Parse(_) | CsvError::MissingColumns(_) => (String::new(), String::new()),
    };
    CsvFieldError {
        row,
        field,
        value,
        message: err.to_string(),
    }
}
