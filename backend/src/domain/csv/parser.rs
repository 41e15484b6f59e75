//! CSV text → fuel records.

use std::collections::HashMap;

use chrono::NaiveDate;
use log::{debug, info};

use crate::domain::errors::CsvError;
use crate::domain::models::{round_to, FuelRecord};

/// Column labels the import format requires, in export order.
pub const REQUIRED_COLUMNS: [&str; 11] = [
    "日期",
    "公里数",
    "油费",
    "单价",
    "油量",
    "实际付金额",
    "优惠金额",
    "实付单价",
    "是否加满",
    "是否亮灯",
    "上次记录了吗",
];

/// Parse CSV text into header-keyed rows.
///
/// The first row is the header; cells are trimmed; fully empty lines are
/// skipped. Structural failures (unbalanced quotes, IO) surface as
/// [`CsvError::Parse`]; a header missing required columns as
/// [`CsvError::MissingColumns`].
pub fn parse_csv(text: &str) -> Result<Vec<HashMap<String, String>>, CsvError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(text.trim_start_matches('\u{feff}').as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| CsvError::Parse(e.to_string()))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .filter(|c| !headers.iter().any(|h| h == *c))
        .copied()
        .collect();
    if !missing.is_empty() {
        return Err(CsvError::MissingColumns(missing.join("、")));
    }

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| CsvError::Parse(e.to_string()))?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        let mut row = HashMap::new();
        for (i, header) in headers.iter().enumerate() {
            row.insert(
                header.clone(),
                record.get(i).unwrap_or_default().trim().to_string(),
            );
        }
        rows.push(row);
    }

    info!("CSV: parsed {} data rows", rows.len());
    Ok(rows)
}

/// Normalize a date cell to `"YYYY-MM-DD 00:00"`.
///
/// Accepts `YYYY/M/D`, `YYYY-MM-DD` and `YYYY.M.D`; the dash form must
/// already be zero-padded, the others may not be. Impossible calendar dates
/// (2025/2/30) are rejected outright.
pub fn parse_flexible_date(value: &str) -> Result<String, CsvError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CsvError::DateFormat {
            value: value.to_string(),
        });
    }

    let parts: Option<Vec<&str>> = if trimmed.contains('/') {
        Some(trimmed.split('/').collect())
    } else if trimmed.contains('-') {
        Some(trimmed.split('-').collect())
    } else if trimmed.contains('.') {
        Some(trimmed.split('.').collect())
    } else {
        None
    };
    let parts = parts.ok_or_else(|| CsvError::DateFormat {
        value: value.to_string(),
    })?;

    if parts.len() != 3 || parts[0].len() != 4 {
        return Err(CsvError::DateFormat {
            value: value.to_string(),
        });
    }
    // The dash form is the canonical already-padded spelling
    if trimmed.contains('-') && (parts[1].len() != 2 || parts[2].len() != 2) {
        return Err(CsvError::DateFormat {
            value: value.to_string(),
        });
    }

    let numbers: Result<Vec<u32>, _> = parts.iter().map(|p| p.parse::<u32>()).collect();
    let numbers = numbers.map_err(|_| CsvError::DateFormat {
        value: value.to_string(),
    })?;

    let date = NaiveDate::from_ymd_opt(numbers[0] as i32, numbers[1], numbers[2]).ok_or(
        CsvError::InvalidDate {
            value: value.to_string(),
        },
    )?;

    Ok(format!("{} 00:00", date.format("%Y-%m-%d")))
}

/// Parse a label boolean cell (e.g. `加满` / `没加满`).
pub fn parse_csv_boolean(
    value: &str,
    true_text: &str,
    false_text: &str,
    field: &str,
) -> Result<bool, CsvError> {
    let trimmed = value.trim();
    if trimmed == true_text {
        Ok(true)
    } else if trimmed == false_text {
        Ok(false)
    } else {
        Err(CsvError::BooleanFormat {
            field: field.to_string(),
            true_text: true_text.to_string(),
            false_text: false_text.to_string(),
            value: value.to_string(),
        })
    }
}

fn parse_numeric(
    row: &HashMap<String, String>,
    field: &str,
    decimals: u32,
) -> Result<f64, CsvError> {
    let raw = row.get(field).map(String::as_str).unwrap_or_default().trim();
    // Every numeric column is required; an empty cell is a row error, not 0
    if raw.is_empty() {
        return Err(CsvError::NumberFormat {
            field: field.to_string(),
            value: String::new(),
        });
    }
    let parsed: f64 = raw.parse().map_err(|_| CsvError::NumberFormat {
        field: field.to_string(),
        value: raw.to_string(),
    })?;
    if !parsed.is_finite() {
        return Err(CsvError::NumberFormat {
            field: field.to_string(),
            value: raw.to_string(),
        });
    }
    Ok(round_to(parsed, decimals))
}

/// Map one header-keyed row to a [`FuelRecord`] for `vehicle_id`.
///
/// The record gets a fresh id and `fuel_consumption = 0`; the derived value
/// is recomputed after the batch lands next to its neighbors. Any cell
/// failure aborts only this row.
pub fn map_csv_row_to_fuel_record(
    row: &HashMap<String, String>,
    vehicle_id: &str,
    fuel_type: &str,
) -> Result<FuelRecord, CsvError> {
    let raw_date = row.get("日期").map(String::as_str).unwrap_or_default();
    let time = parse_flexible_date(raw_date)?;
    let date = time.split(' ').next().unwrap_or_default().to_string();

    let is_full = parse_csv_boolean(
        row.get("是否加满").map(String::as_str).unwrap_or_default(),
        "加满",
        "没加满",
        "是否加满",
    )?;
    let is_light_on = parse_csv_boolean(
        row.get("是否亮灯").map(String::as_str).unwrap_or_default(),
        "亮灯",
        "没亮",
        "是否亮灯",
    )?;
    let is_last_recorded = parse_csv_boolean(
        row.get("上次记录了吗").map(String::as_str).unwrap_or_default(),
        "记录了",
        "漏记了",
        "上次记录了吗",
    )?;

    let record = FuelRecord {
        id: FuelRecord::generate_id(),
        vehicle_id: vehicle_id.to_string(),
        time,
        date,
        fuel_type: fuel_type.to_string(),
        total_mileage: parse_numeric(row, "公里数", 0)?,
        display_amount: parse_numeric(row, "油费", 2)?,
        display_unit_price: parse_numeric(row, "单价", 2)?,
        fuel_volume: parse_numeric(row, "油量", 2)?,
        actual_amount: parse_numeric(row, "实际付金额", 2)?,
        discount: parse_numeric(row, "优惠金额", 2)?,
        actual_unit_price: parse_numeric(row, "实付单价", 2)?,
        is_full,
        is_light_on,
        is_last_recorded,
        note: String::new(),
        fuel_consumption: 0.0,
    };
    debug!(
        "CSV: mapped row date={} mileage={}",
        record.date, record.total_mileage
    );
    Ok(record)
}
