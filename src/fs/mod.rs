// src/fs/mod.rs

//! The two filesystem queries checkrunner makes: reading the settings file
//! and probing for compilation databases. Tests swap in
//! [`mock::MockFileSystem`].

use std::fmt::Debug;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

pub mod mock;

pub trait FileSystem: Send + Sync + Debug {
    fn read_to_string(&self, path: &Path) -> Result<String>;

    /// Regular file (or symlink to one). Directories named like a database
    /// do not count.
    fn is_file(&self, path: &Path) -> bool;
}

/// Backed by `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path).with_context(|| format!("reading settings file {}", path.display()))
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }
}
