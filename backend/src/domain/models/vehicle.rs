//! Domain model for a vehicle.

use serde::{Deserialize, Serialize};

/// A tracked vehicle owning its own maintenance and fuel records.
///
/// `is_default` is advisory metadata: it is set for the first vehicle but no
/// routine enforces that exactly one vehicle carries it. The current vehicle
/// is tracked separately by id in the record store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub mileage: f64,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub is_default: bool,
}

/// The legacy single-vehicle blob consumed once by the multi-vehicle
/// migration and then superseded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyVehicleInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub mileage: Option<f64>,
    #[serde(default)]
    pub note: Option<String>,
}

impl Vehicle {
    pub fn generate_id() -> String {
        super::generate_id("v")
    }
}
