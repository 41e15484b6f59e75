//! CSV import/export pipeline for fuel records.
//!
//! The wire format is the Chinese-header CSV the original exports produced;
//! import stays compatible with hand-edited spreadsheets (flexible date
//! separators, label booleans). Failures are row-scoped: a bad row becomes
//! a [`shared::CsvFieldError`], never a batch abort.

pub mod exporter;
pub mod parser;
pub mod validator;

pub use exporter::{export_fuel_records_csv, fuel_records_to_csv};
pub use parser::{map_csv_row_to_fuel_record, parse_csv, parse_csv_boolean, parse_flexible_date};
pub use validator::{
    detect_duplicates, generate_import_report, validate_all_records, validate_csv_record,
    DuplicateScan, RecordValidation, ValidationOutcome,
};
