//! Persistence layer: JSON documents and the SQLite table store

pub mod db;
pub mod json;

pub use db::TableStore;
pub use json::write_json;
