//! Domain model for a maintenance event.

use serde::{Deserialize, Serialize};

/// One maintenance event (oil change, chain service, tires) for a vehicle.
///
/// `vehicle_id` is validated against the vehicle collection on bulk import;
/// single-record creation trusts the caller's current-vehicle binding.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceRecord {
    pub id: String,
    #[serde(default)]
    pub vehicle_id: String,
    #[serde(default, rename = "type")]
    pub record_type: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub mileage: f64,
    #[serde(default)]
    pub cost: f64,
    #[serde(default)]
    pub items: Vec<String>,
    #[serde(default)]
    pub note: String,
}

impl MaintenanceRecord {
    pub fn generate_id() -> String {
        super::generate_id("m")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_field_keeps_legacy_wire_name() {
        let record = MaintenanceRecord {
            id: "m_1_a".to_string(),
            record_type: "保养".to_string(),
            ..Default::default()
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains(r#""type":"保养""#));

        let back: MaintenanceRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.record_type, "保养");
    }
}
