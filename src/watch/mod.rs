// src/watch/mod.rs

//! Filesystem watching.
//!
//! Only the compilation database locations are watched: when a database
//! shows up or goes away, command lines built from now on change, so the
//! caller is told to re-resolve.

pub mod database;

pub use database::{
    DatabaseEvent, DatabaseWatcherHandle, affected_candidates, is_location_change,
    spawn_database_watcher,
};
