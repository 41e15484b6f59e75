//! Fuel records → CSV text/file.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use chrono::Local;
use log::info;

use crate::domain::csv::parser::REQUIRED_COLUMNS;
use crate::domain::models::FuelRecord;

/// `"YYYY-MM-DD"` → `"YYYY/M/D"` (unpadded month/day, the original export
/// spelling).
fn format_export_date(date: &str) -> String {
    let parts: Vec<&str> = date.split('-').collect();
    if parts.len() != 3 {
        return date.to_string();
    }
    let month = parts[1].trim_start_matches('0');
    let day = parts[2].trim_start_matches('0');
    format!(
        "{}/{}/{}",
        parts[0],
        if month.is_empty() { "0" } else { month },
        if day.is_empty() { "0" } else { day }
    )
}

fn label(value: bool, true_text: &str, false_text: &str) -> String {
    if value { true_text } else { false_text }.to_string()
}

/// Render records as CSV with the canonical 11-column Chinese header.
///
/// Rows are written in the order given. Money and volume columns carry two
/// decimals, mileage none; booleans use the import labels so an export
/// re-imports cleanly.
pub fn fuel_records_to_csv(records: &[FuelRecord]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(REQUIRED_COLUMNS)
        .context("写入 CSV 表头失败")?;

    for record in records {
        writer
            .write_record(&[
                format_export_date(record.date_part()),
                format!("{:.0}", record.total_mileage),
                format!("{:.2}", record.display_amount),
                format!("{:.2}", record.display_unit_price),
                format!("{:.2}", record.fuel_volume),
                format!("{:.2}", record.actual_amount),
                format!("{:.2}", record.discount),
                format!("{:.2}", record.actual_unit_price),
                label(record.is_full, "加满", "没加满"),
                label(record.is_light_on, "亮灯", "没亮"),
                label(record.is_last_recorded, "记录了", "漏记了"),
            ])
            .context("写入 CSV 数据行失败")?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow!("CSV 缓冲区回收失败: {e}"))?;
    let body = String::from_utf8(bytes).context("CSV 内容不是有效 UTF-8")?;
    // Excel only detects UTF-8 when the BOM is present
    Ok(format!("\u{feff}{body}"))
}

/// Write one vehicle's records, newest first, as `油耗记录_<date>.csv`
/// under `dir`. Returns the written path.
pub fn export_fuel_records_csv(records: &[FuelRecord], dir: &Path) -> Result<PathBuf> {
    let mut sorted: Vec<FuelRecord> = records.to_vec();
    sorted.sort_by(|a, b| b.sort_key().cmp(a.sort_key()));

    let content = fuel_records_to_csv(&sorted)?;
    let file_name = format!("油耗记录_{}.csv", Local::now().format("%Y-%m-%d"));
    let path = dir.join(&file_name);
    fs::create_dir_all(dir).with_context(|| format!("创建导出目录失败: {}", dir.display()))?;
    fs::write(&path, content).with_context(|| format!("写入 CSV 文件失败: {}", path.display()))?;

    info!("CSV: exported {} records to {}", sorted.len(), path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::csv::parser::{map_csv_row_to_fuel_record, parse_csv};
    use crate::storage::json::test_utils::TestEnvironment;

    fn record(date: &str, mileage: f64) -> FuelRecord {
        FuelRecord {
            id: FuelRecord::generate_id(),
            vehicle_id: "v_1_a".to_string(),
            time: format!("{date} 00:00"),
            date: date.to_string(),
            total_mileage: mileage,
            display_amount: 80.0,
            display_unit_price: 7.62,
            fuel_volume: 10.5,
            actual_amount: 78.5,
            discount: 1.5,
            actual_unit_price: 7.48,
            is_full: true,
            ..Default::default()
        }
    }

    #[test]
    fn export_uses_unpadded_dates_and_labels() {
        let csv_text = fuel_records_to_csv(&[record("2025-06-07", 12500.0)]).unwrap();
        assert!(csv_text.starts_with('\u{feff}'));
        assert!(csv_text.contains("日期,公里数,油费"));
        assert!(csv_text.contains("2025/6/7,12500,80.00,7.62,10.50,78.50,1.50,7.48,加满,没亮,漏记了"));
    }

    #[test]
    fn export_round_trips_through_the_parser() {
        let original = record("2025-06-27", 12500.0);
        let csv_text = fuel_records_to_csv(std::slice::from_ref(&original)).unwrap();
        let rows = parse_csv(&csv_text).unwrap();
        let reimported = map_csv_row_to_fuel_record(&rows[0], "v_1_a", "").unwrap();
        assert_eq!(reimported.date, original.date);
        assert_eq!(reimported.total_mileage, original.total_mileage);
        assert_eq!(reimported.fuel_volume, original.fuel_volume);
        assert_eq!(reimported.is_full, original.is_full);
    }

    #[test]
    fn file_export_sorts_newest_first() {
        let env = TestEnvironment::new().unwrap();
        let records = vec![record("2025-01-01", 1000.0), record("2025-06-27", 12500.0)];
        let path = export_fuel_records_csv(&records, &env.base_path).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        let first_data_line = content.lines().nth(1).unwrap();
        assert!(first_data_line.starts_with("2025/6/27"));
    }
}
