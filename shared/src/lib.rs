//! Shared data types for the moto-log vehicle maintenance tracker.
//!
//! Everything the UI layer receives from the core lives here: import reports,
//! per-row error details, import statistics and migration outcomes. These are
//! plain serde types with no behavior; the core fills them in and the UI only
//! renders them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One field-level problem found in a CSV row.
///
/// Row numbering starts at 2: row 1 is the header line, so the first data row
/// is reported as row 2.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CsvFieldError {
    pub row: usize,
    /// Column label as it appears in the CSV header (e.g. "公里数")
    pub field: String,
    /// The offending cell value, verbatim
    pub value: String,
    pub message: String,
}

impl fmt::Display for CsvFieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "第{}行 [{}]: {}", self.row, self.field, self.message)
    }
}

/// A CSV row skipped because an existing record already covers the same
/// fill-up (same date + same odometer reading).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateDetail {
    pub row: usize,
    pub reason: String,
    /// Date portion of the incoming row
    pub date: String,
    /// Odometer reading of the incoming row
    pub mileage: f64,
    /// Displayed fuel cost of the incoming row
    pub cost: f64,
}

/// Counts for an import-preview report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportReportSummary {
    pub total: usize,
    pub valid: usize,
    pub error: usize,
    pub duplicate: usize,
    pub to_import: usize,
}

/// Full import-preview report shown before the user confirms a CSV import.
///
/// Display-only: nothing downstream consumes it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportReport {
    pub summary: ImportReportSummary,
    pub errors: Vec<CsvFieldError>,
    pub duplicates: Vec<DuplicateDetail>,
}

impl ImportReport {
    /// Bounded preview of error messages for a summary dialog.
    pub fn error_preview(&self, limit: usize) -> Vec<String> {
        self.errors.iter().take(limit).map(|e| e.to_string()).collect()
    }
}

/// Which strategy a whole-dataset import used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportMode {
    /// Replace all local collections with the bundle's
    Overwrite,
    /// Union by id, bundle wins ties, local current-vehicle pointer kept
    Merge,
}

impl fmt::Display for ImportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportMode::Overwrite => write!(f, "overwrite"),
            ImportMode::Merge => write!(f, "merge"),
        }
    }
}

/// Result counts of a whole-dataset (JSON bundle) import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportStats {
    pub mode: ImportMode,
    pub vehicles: usize,
    pub maintenance_records: usize,
    pub fuel_records: usize,
    /// Id collisions resolved in favor of the bundle (always 0 in overwrite mode)
    pub conflicts: usize,
}

/// Result counts of a CSV fuel-record import.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CsvImportStats {
    /// Data rows in the source file
    pub total: usize,
    pub imported: usize,
    pub skipped_errors: usize,
    pub skipped_duplicates: usize,
}

/// Everything the UI needs to report after a CSV import: counts plus the
/// detail lists behind them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CsvImportOutcome {
    pub stats: CsvImportStats,
    pub errors: Vec<CsvFieldError>,
    pub duplicates: Vec<DuplicateDetail>,
}

/// Outcome of the one-time single→multi-vehicle migration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MigrationOutcome {
    pub success: bool,
    /// True when the migrated flag was already set and nothing ran
    pub skipped: bool,
    /// Id of the synthesized default vehicle (when a migration actually ran)
    pub vehicle_id: Option<String>,
    pub maintenance_count: usize,
    pub fuel_count: usize,
}

/// Outcome of the one-time fuel-consumption recompute migration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecomputeOutcome {
    pub success: bool,
    pub skipped: bool,
    pub total: usize,
    pub updated: usize,
    pub unchanged: usize,
}

/// Metadata for a pre-generated export file kept warm for quick sharing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreparedExportInfo {
    pub file_path: String,
    pub file_name: String,
    /// Unix millis at generation time
    pub timestamp: i64,
    /// Checksum of the data the file was generated from; compared against the
    /// live dataset to decide staleness
    pub data_checksum: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_preview_is_bounded() {
        let report = ImportReport {
            errors: (0..10)
                .map(|i| CsvFieldError {
                    row: i + 2,
                    field: "公里数".to_string(),
                    value: "abc".to_string(),
                    message: "公里数必须是数字".to_string(),
                })
                .collect(),
            ..Default::default()
        };
        assert_eq!(report.error_preview(3).len(), 3);
        assert!(report.error_preview(3)[0].contains("第2行"));
    }

    #[test]
    fn import_mode_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&ImportMode::Overwrite).unwrap(),
            "\"overwrite\""
        );
    }
}
