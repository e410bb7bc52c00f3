//! Data persistence layer
//!
//! This module provides SQLite-based storage for extension settings.

mod database;
mod migrations;
mod storage_area;

pub use database::{Database, DatabaseError};
pub use storage_area::SqliteStorageArea;
