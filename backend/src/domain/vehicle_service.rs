//! Vehicle CRUD and the current-vehicle pointer.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use chrono::Local;
use log::info;

use crate::domain::models::Vehicle;
use crate::storage::RecordStore;

/// Input for creating or updating a vehicle.
#[derive(Debug, Clone, Default)]
pub struct VehicleInput {
    pub name: String,
    pub model: String,
    pub mileage: f64,
    pub note: String,
}

pub struct VehicleService<S: RecordStore> {
    store: Arc<S>,
}

impl<S: RecordStore> VehicleService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Create a vehicle. The first vehicle created becomes the default and
    /// the current one.
    pub fn create_vehicle(&self, input: VehicleInput) -> Result<Vehicle> {
        if input.name.trim().is_empty() {
            return Err(anyhow!("车辆名称不能为空"));
        }

        let mut vehicles = self.store.get_vehicles()?;
        let vehicle = Vehicle {
            id: Vehicle::generate_id(),
            name: input.name.trim().to_string(),
            model: input.model,
            mileage: input.mileage,
            note: input.note,
            created_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            is_default: vehicles.is_empty(),
        };

        vehicles.push(vehicle.clone());
        self.store.set_vehicles(&vehicles)?;
        if vehicles.len() == 1 {
            self.store.set_current_vehicle_id(&vehicle.id)?;
        }

        info!("VEHICLE: created {} ({})", vehicle.name, vehicle.id);
        Ok(vehicle)
    }

    pub fn update_vehicle(&self, id: &str, input: VehicleInput) -> Result<Vehicle> {
        if input.name.trim().is_empty() {
            return Err(anyhow!("车辆名称不能为空"));
        }

        let mut vehicles = self.store.get_vehicles()?;
        let vehicle = vehicles
            .iter_mut()
            .find(|v| v.id == id)
            .ok_or_else(|| anyhow!("车辆不存在：{id}"))?;

        vehicle.name = input.name.trim().to_string();
        vehicle.model = input.model;
        vehicle.mileage = input.mileage;
        vehicle.note = input.note;
        let updated = vehicle.clone();

        self.store.set_vehicles(&vehicles)?;
        Ok(updated)
    }

    pub fn get_vehicle(&self, id: &str) -> Result<Option<Vehicle>> {
        Ok(self.store.get_vehicles()?.into_iter().find(|v| v.id == id))
    }

    pub fn list_vehicles(&self) -> Result<Vec<Vehicle>> {
        self.store.get_vehicles()
    }

    /// Delete a vehicle and everything recorded under it.
    ///
    /// Refused while it is the only vehicle; at least one must remain. When
    /// the deleted vehicle was current, the pointer moves to the first
    /// remaining one.
    pub fn delete_vehicle(&self, id: &str) -> Result<()> {
        let mut vehicles = self.store.get_vehicles()?;
        if !vehicles.iter().any(|v| v.id == id) {
            return Err(anyhow!("车辆不存在：{id}"));
        }
        if vehicles.len() <= 1 {
            return Err(anyhow!("至少需要保留一辆车"));
        }

        vehicles.retain(|v| v.id != id);
        self.store.set_vehicles(&vehicles)?;

        let mut maintenance = self.store.get_maintenance_records()?;
        let before = maintenance.len();
        maintenance.retain(|r| r.vehicle_id != id);
        let maintenance_removed = before - maintenance.len();
        self.store.set_maintenance_records(&maintenance)?;

        let mut fuel = self.store.get_fuel_records()?;
        let before = fuel.len();
        fuel.retain(|r| r.vehicle_id != id);
        let fuel_removed = before - fuel.len();
        self.store.set_fuel_records(&fuel)?;

        if self.store.get_current_vehicle_id()? == id {
            self.store.set_current_vehicle_id(&vehicles[0].id)?;
        }

        info!(
            "VEHICLE: deleted {} with {} maintenance / {} fuel records",
            id, maintenance_removed, fuel_removed
        );
        Ok(())
    }

    pub fn set_current_vehicle(&self, id: &str) -> Result<()> {
        if self.get_vehicle(id)?.is_none() {
            return Err(anyhow!("车辆不存在：{id}"));
        }
        self.store.set_current_vehicle_id(id)
    }

    /// The current vehicle, falling back to the first one when the pointer
    /// is unset or stale.
    pub fn current_vehicle(&self) -> Result<Option<Vehicle>> {
        let vehicles = self.store.get_vehicles()?;
        let current_id = self.store.get_current_vehicle_id()?;
        Ok(vehicles
            .iter()
            .find(|v| v.id == current_id)
            .or_else(|| vehicles.first())
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{FuelRecord, MaintenanceRecord};
    use crate::storage::json::test_utils::TestEnvironment;

    fn input(name: &str) -> VehicleInput {
        VehicleInput {
            name: name.to_string(),
            model: "450SR".to_string(),
            mileage: 0.0,
            ..Default::default()
        }
    }

    #[test]
    fn first_vehicle_becomes_default_and_current() {
        let env = TestEnvironment::new().unwrap();
        let service = VehicleService::new(env.store.clone());

        let first = service.create_vehicle(input("春风450SR")).unwrap();
        assert!(first.is_default);
        assert_eq!(env.store.get_current_vehicle_id().unwrap(), first.id);

        let second = service.create_vehicle(input("DL250")).unwrap();
        assert!(!second.is_default);
        assert_eq!(env.store.get_current_vehicle_id().unwrap(), first.id);
    }

    #[test]
    fn name_is_required() {
        let env = TestEnvironment::new().unwrap();
        let service = VehicleService::new(env.store.clone());
        assert!(service.create_vehicle(input("  ")).is_err());
    }

    #[test]
    fn update_edits_in_place() {
        let env = TestEnvironment::new().unwrap();
        let service = VehicleService::new(env.store.clone());
        let vehicle = service.create_vehicle(input("春风450SR")).unwrap();

        let mut edited = input("改名了");
        edited.mileage = 13000.0;
        let updated = service.update_vehicle(&vehicle.id, edited).unwrap();
        assert_eq!(updated.name, "改名了");
        assert_eq!(updated.mileage, 13000.0);
        assert_eq!(service.list_vehicles().unwrap().len(), 1);

        assert!(service.update_vehicle("v_gone", input("x")).is_err());
    }

    #[test]
    fn the_last_vehicle_cannot_be_deleted() {
        let env = TestEnvironment::new().unwrap();
        let service = VehicleService::new(env.store.clone());
        let only = service.create_vehicle(input("春风450SR")).unwrap();
        assert!(service.delete_vehicle(&only.id).is_err());
        assert_eq!(service.list_vehicles().unwrap().len(), 1);
    }

    #[test]
    fn delete_cascades_and_moves_the_pointer() {
        let env = TestEnvironment::new().unwrap();
        let service = VehicleService::new(env.store.clone());
        let first = service.create_vehicle(input("春风450SR")).unwrap();
        let second = service.create_vehicle(input("DL250")).unwrap();

        env.store
            .set_maintenance_records(&[
                MaintenanceRecord {
                    id: "m_1".to_string(),
                    vehicle_id: first.id.clone(),
                    ..Default::default()
                },
                MaintenanceRecord {
                    id: "m_2".to_string(),
                    vehicle_id: second.id.clone(),
                    ..Default::default()
                },
            ])
            .unwrap();
        env.store
            .set_fuel_records(&[FuelRecord {
                id: "f_1".to_string(),
                vehicle_id: first.id.clone(),
                ..Default::default()
            }])
            .unwrap();

        service.delete_vehicle(&first.id).unwrap();

        assert_eq!(service.list_vehicles().unwrap().len(), 1);
        assert_eq!(env.store.get_current_vehicle_id().unwrap(), second.id);
        let maintenance = env.store.get_maintenance_records().unwrap();
        assert_eq!(maintenance.len(), 1);
        assert_eq!(maintenance[0].id, "m_2");
        assert!(env.store.get_fuel_records().unwrap().is_empty());
    }

    #[test]
    fn current_vehicle_falls_back_to_first() {
        let env = TestEnvironment::new().unwrap();
        let service = VehicleService::new(env.store.clone());
        assert!(service.current_vehicle().unwrap().is_none());

        let vehicle = service.create_vehicle(input("春风450SR")).unwrap();
        env.store.set_current_vehicle_id("v_stale").unwrap();
        assert_eq!(service.current_vehicle().unwrap().unwrap().id, vehicle.id);

        assert!(service.set_current_vehicle("v_stale").is_err());
        service.set_current_vehicle(&vehicle.id).unwrap();
    }
}
