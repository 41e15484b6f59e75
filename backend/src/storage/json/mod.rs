//! JSON-file record store: one file per named collection.

pub mod store;

#[cfg(test)]
pub mod test_utils;

pub use store::JsonFileStore;
