//! Business logic: models, the metrics engine, and the services that sit
//! between callers and the record store.

pub mod csv;
pub mod errors;
pub mod export_service;
pub mod fuel_stats;
pub mod import_service;
pub mod migration_service;
pub mod models;
pub mod vehicle_service;

pub use errors::{CsvError, ImportError};
pub use export_service::ExportService;
pub use import_service::ImportService;
pub use migration_service::MigrationService;
pub use vehicle_service::{VehicleInput, VehicleService};
