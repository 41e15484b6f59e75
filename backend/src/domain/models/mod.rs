//! Domain models for the moto-log core.

pub mod fuel_record;
pub mod maintenance_record;
pub mod vehicle;

pub use fuel_record::FuelRecord;
pub use maintenance_record::MaintenanceRecord;
pub use vehicle::{LegacyVehicleInfo, Vehicle};

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Snapshot of every business collection: the unit of export, backup and
/// restore. Field order matters: it defines the canonical JSON key order the
/// checksum is computed over.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllData {
    pub vehicles: Vec<Vehicle>,
    pub maintenance_records: Vec<MaintenanceRecord>,
    pub fuel_records: Vec<FuelRecord>,
    #[serde(default)]
    pub current_vehicle_id: String,
}

/// The on-disk export file format.
///
/// `checksum` is advisory: validated on import but a mismatch only logs a
/// warning, it never blocks the import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportBundle {
    pub version: String,
    pub app_name: String,
    pub export_time: String,
    pub data: AllData,
    #[serde(default)]
    pub checksum: Option<String>,
}

/// Generate a record id: `<prefix>_<epoch_millis>_<suffix>`.
///
/// Example: `v_1719475200123_k3j9x0q2m`
pub fn generate_id(prefix: &str) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    let millis = now.as_millis() as u64;
    let suffix = to_base36(now.as_nanos() as u64 % 36u64.pow(9));
    format!("{}_{}_{:0>9}", prefix, millis, suffix)
}

/// Lowercase base-36 rendering, matching `Number.toString(36)`.
pub(crate) fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

/// Round to `decimals` places, half away from zero (as `toFixed` does for the
/// values in range here).
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}
