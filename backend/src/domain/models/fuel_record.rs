//! Domain model for a refueling event.
//!
//! Legacy data carries duplicate compatibility fields (`mileage` beside
//! `totalMileage`, `volume` beside `fuelVolume`, `cost` beside
//! `actualAmount`). Those are normalized into one canonical schema at the
//! deserialization boundary via [`RawFuelRecord`]; business logic only ever
//! sees the canonical names, and serialization emits only the canonical
//! names.

use serde::{Deserialize, Serialize};

/// One fill-up transaction.
///
/// `time` is a `"YYYY-MM-DD HH:mm"` string; the format sorts
/// lexicographically, which is what every chronological sort in the core
/// relies on. `fuel_consumption` (L/100km) is derived, recomputed whenever
/// the vehicle's record set changes order or membership, never user input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "RawFuelRecord")]
pub struct FuelRecord {
    pub id: String,
    #[serde(default)]
    pub vehicle_id: String,
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub fuel_type: String,
    #[serde(default)]
    pub total_mileage: f64,
    #[serde(default)]
    pub display_amount: f64,
    #[serde(default)]
    pub display_unit_price: f64,
    #[serde(default)]
    pub fuel_volume: f64,
    #[serde(default)]
    pub actual_amount: f64,
    #[serde(default)]
    pub discount: f64,
    #[serde(default)]
    pub actual_unit_price: f64,
    #[serde(default)]
    pub is_full: bool,
    #[serde(default)]
    pub is_light_on: bool,
    #[serde(default)]
    pub is_last_recorded: bool,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub fuel_consumption: f64,
}

impl FuelRecord {
    pub fn generate_id() -> String {
        super::generate_id("f")
    }

    /// Chronological sort key: `time`, falling back to `date` when `time` is
    /// absent (older records only ever stored a date).
    pub fn sort_key(&self) -> &str {
        if self.time.is_empty() {
            &self.date
        } else {
            &self.time
        }
    }

    /// Date portion of the timestamp, ignoring time-of-day.
    pub fn date_part(&self) -> &str {
        self.sort_key().split(' ').next().unwrap_or_default()
    }
}

/// Accepts both the canonical and the legacy duplicate field spellings.
/// A plain serde alias cannot do this: legacy objects contain *both*
/// spellings at once, which serde rejects as a duplicate field.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFuelRecord {
    #[serde(default)]
    id: String,
    #[serde(default)]
    vehicle_id: String,
    #[serde(default)]
    time: String,
    #[serde(default)]
    date: String,
    #[serde(default)]
    fuel_type: String,
    #[serde(default)]
    total_mileage: Option<f64>,
    #[serde(default)]
    mileage: Option<f64>,
    #[serde(default)]
    display_amount: Option<f64>,
    #[serde(default)]
    display_unit_price: f64,
    #[serde(default)]
    fuel_volume: Option<f64>,
    #[serde(default)]
    volume: Option<f64>,
    #[serde(default)]
    actual_amount: Option<f64>,
    #[serde(default)]
    cost: Option<f64>,
    #[serde(default)]
    discount: f64,
    #[serde(default)]
    actual_unit_price: f64,
    #[serde(default)]
    is_full: bool,
    #[serde(default)]
    is_light_on: bool,
    #[serde(default)]
    is_last_recorded: bool,
    #[serde(default)]
    note: String,
    #[serde(default)]
    fuel_consumption: f64,
}

impl From<RawFuelRecord> for FuelRecord {
    fn from(raw: RawFuelRecord) -> Self {
        let total_mileage = raw.total_mileage.or(raw.mileage).unwrap_or(0.0);
        let fuel_volume = raw.fuel_volume.or(raw.volume).unwrap_or(0.0);
        let actual_amount = raw.actual_amount.or(raw.cost).unwrap_or(0.0);
        FuelRecord {
            id: raw.id,
            vehicle_id: raw.vehicle_id,
            time: raw.time,
            date: raw.date,
            fuel_type: raw.fuel_type,
            total_mileage,
            display_amount: raw.display_amount.unwrap_or(actual_amount),
            display_unit_price: raw.display_unit_price,
            fuel_volume,
            actual_amount,
            discount: raw.discount,
            actual_unit_price: raw.actual_unit_price,
            is_full: raw.is_full,
            is_light_on: raw.is_light_on,
            is_last_recorded: raw.is_last_recorded,
            note: raw.note,
            fuel_consumption: raw.fuel_consumption,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_duplicate_fields_normalize_to_canonical() {
        let json = r#"{
            "id": "f_1_a",
            "vehicleId": "v_1_a",
            "time": "2025-06-27 00:00",
            "totalMileage": 12500,
            "mileage": 12500,
            "fuelVolume": 10.5,
            "volume": 10.5,
            "actualAmount": 80.0,
            "cost": 80.0,
            "isFull": true
        }"#;
        let record: FuelRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.total_mileage, 12500.0);
        assert_eq!(record.fuel_volume, 10.5);
        assert_eq!(record.actual_amount, 80.0);
        assert!(record.is_full);

        // Re-serialization drops the legacy spellings
        let out = serde_json::to_string(&record).unwrap();
        assert!(out.contains("totalMileage"));
        assert!(!out.contains(r#""mileage""#));
        assert!(!out.contains(r#""volume""#));
        assert!(!out.contains(r#""cost""#));
    }

    #[test]
    fn legacy_only_fields_still_deserialize() {
        let json = r#"{"id":"f_2_b","date":"2024-01-01","mileage":100,"volume":5,"cost":40}"#;
        let record: FuelRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.total_mileage, 100.0);
        assert_eq!(record.fuel_volume, 5.0);
        assert_eq!(record.actual_amount, 40.0);
        // display_amount falls back to the paid amount when absent
        assert_eq!(record.display_amount, 40.0);
    }

    #[test]
    fn sort_key_falls_back_to_date() {
        let with_time = FuelRecord {
            time: "2025-06-27 08:30".to_string(),
            date: "2025-06-27".to_string(),
            ..Default::default()
        };
        let date_only = FuelRecord {
            date: "2025-06-27".to_string(),
            ..Default::default()
        };
        assert_eq!(with_time.sort_key(), "2025-06-27 08:30");
        assert_eq!(date_only.sort_key(), "2025-06-27");
        assert_eq!(with_time.date_part(), "2025-06-27");
    }
}
