//! Storage layer: the record-store abstraction and its JSON-file backend.

pub mod json;
pub mod traits;

pub use json::JsonFileStore;
pub use traits::RecordStore;
