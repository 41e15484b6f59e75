//! Range and duplicate validation for mapped fuel records.
//!
//! Runs after the parser, so type errors (unparseable numbers, unknown
//! boolean labels) are already out of the batch. What remains here is the
//! plausibility layer: numeric ranges, calendar-valid dates, and the coarse
//! duplicate key against records already stored.

use std::collections::{BTreeSet, HashSet};

use chrono::NaiveDate;
use log::info;

use shared::{CsvFieldError, DuplicateDetail, ImportReport, ImportReportSummary};

use crate::domain::models::FuelRecord;

/// Inclusive numeric bounds per column. Discount has no lower bound: a
/// negative discount is a surcharge and legal.
const MILEAGE_MAX: f64 = 999_999.0;
const MONEY_MAX: f64 = 99_999.0;
const UNIT_PRICE_MAX: f64 = 999.0;
const VOLUME_MAX: f64 = 999.0;

/// Validation verdict for a single record.
#[derive(Debug, Clone)]
pub struct RecordValidation {
    pub valid: bool,
    pub errors: Vec<CsvFieldError>,
}

/// Batch verdict: survivors keep their source-row tags for later reporting.
#[derive(Debug, Clone, Default)]
pub struct ValidationOutcome {
    pub valid_records: Vec<(usize, FuelRecord)>,
    pub errors: Vec<CsvFieldError>,
}

/// Duplicate scan result.
#[derive(Debug, Clone, Default)]
pub struct DuplicateScan {
    pub duplicates: Vec<DuplicateDetail>,
    pub safe_records: Vec<(usize, FuelRecord)>,
}

fn range_error(row: usize, field: &str, value: f64, message: String) -> CsvFieldError {
    CsvFieldError {
        row,
        field: field.to_string(),
        value: value.to_string(),
        message,
    }
}

fn check_range(
    errors: &mut Vec<CsvFieldError>,
    row: usize,
    field: &str,
    value: f64,
    min: Option<f64>,
    max: f64,
) {
    if !value.is_finite() {
        errors.push(range_error(row, field, value, "必须是有效数字".to_string()));
        return;
    }
    if let Some(min) = min {
        if value < min {
            errors.push(range_error(
                row,
                field,
                value,
                format!("超出有效范围 ({min}-{max})"),
            ));
            return;
        }
    }
    if value > max {
        let low = min.unwrap_or(f64::NEG_INFINITY);
        let range = if low.is_finite() {
            format!("({low}-{max})")
        } else {
            format!("(最大 {max})")
        };
        errors.push(range_error(row, field, value, format!("超出有效范围 {range}")));
    }
}

/// Validate one mapped record against the plausibility rules.
/// `row` is the source CSV row number (header = row 1).
pub fn validate_csv_record(record: &FuelRecord, row: usize) -> RecordValidation {
    let mut errors = Vec::new();

    let date_part = record.date_part();
    if date_part.is_empty() || NaiveDate::parse_from_str(date_part, "%Y-%m-%d").is_err() {
        errors.push(CsvFieldError {
            row,
            field: "日期".to_string(),
            value: record.sort_key().to_string(),
            message: "不是有效日期".to_string(),
        });
    }

    check_range(&mut errors, row, "公里数", record.total_mileage, Some(0.0), MILEAGE_MAX);
    check_range(&mut errors, row, "油费", record.display_amount, Some(0.0), MONEY_MAX);
    check_range(&mut errors, row, "单价", record.display_unit_price, Some(0.0), UNIT_PRICE_MAX);
    check_range(&mut errors, row, "油量", record.fuel_volume, Some(0.0), VOLUME_MAX);
    check_range(&mut errors, row, "实际付金额", record.actual_amount, Some(0.0), MONEY_MAX);
    check_range(&mut errors, row, "优惠金额", record.discount, None, MONEY_MAX);
    check_range(&mut errors, row, "实付单价", record.actual_unit_price, Some(0.0), UNIT_PRICE_MAX);

    RecordValidation {
        valid: errors.is_empty(),
        errors,
    }
}

/// Validate a row-tagged batch; invalid rows drop out, their errors
/// accumulate.
pub fn validate_all_records(records: Vec<(usize, FuelRecord)>) -> ValidationOutcome {
    let mut outcome = ValidationOutcome::default();
    for (row, record) in records {
        let verdict = validate_csv_record(&record, row);
        if verdict.valid {
            outcome.valid_records.push((row, record));
        } else {
            outcome.errors.extend(verdict.errors);
        }
    }
    info!(
        "CSV: validation kept {} records, {} field errors",
        outcome.valid_records.len(),
        outcome.errors.len()
    );
    outcome
}

fn duplicate_key(record: &FuelRecord) -> String {
    format!("{}_{}", record.date_part(), record.total_mileage)
}

/// Flag incoming records whose (date, odometer) pair already exists.
///
/// Existing records win; within the batch the first occurrence of a key
/// wins over later ones. Time-of-day is deliberately ignored so re-imports
/// of a zero-padded export match records entered with a real clock time.
pub fn detect_duplicates(
    incoming: Vec<(usize, FuelRecord)>,
    existing: &[FuelRecord],
) -> DuplicateScan {
    let mut seen: HashSet<String> = existing.iter().map(duplicate_key).collect();
    let existing_count = seen.len();

    let mut scan = DuplicateScan::default();
    for (row, record) in incoming {
        let key = duplicate_key(&record);
        if seen.contains(&key) {
            scan.duplicates.push(DuplicateDetail {
                row,
                reason: format!(
                    "已存在 {} 公里数 {} 的记录",
                    record.date_part(),
                    record.total_mileage
                ),
                date: record.date_part().to_string(),
                mileage: record.total_mileage,
                cost: record.display_amount,
            });
        } else {
            seen.insert(key);
            scan.safe_records.push((row, record));
        }
    }
    info!(
        "CSV: duplicate scan against {} existing keys flagged {} rows",
        existing_count,
        scan.duplicates.len()
    );
    scan
}

/// Assemble the preview report shown before the user confirms an import.
pub fn generate_import_report(
    total: usize,
    errors: Vec<CsvFieldError>,
    duplicates: Vec<DuplicateDetail>,
) -> ImportReport {
    let error_rows: BTreeSet<usize> = errors.iter().map(|e| e.row).collect();
    let valid = total.saturating_sub(error_rows.len());
    let to_import = valid.saturating_sub(duplicates.len());
    ImportReport {
        summary: ImportReportSummary {
            total,
            valid,
            error: error_rows.len(),
            duplicate: duplicates.len(),
            to_import,
        },
        errors,
        duplicates,
    }
}
