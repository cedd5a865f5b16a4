// src/fs/mock.rs

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{Result, anyhow};

use super::FileSystem;

#[derive(Debug, Clone, PartialEq, Eq)]
enum MockEntry {
    File(String),
    Dir,
}

/// In-memory filesystem. Clones share the same contents, so a test can keep
/// one handle and mutate files while the code under test holds another.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    entries: Arc<Mutex<HashMap<PathBuf, MockEntry>>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or overwrite) a file. Parent directories are created implicitly.
    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<String>) {
        let path = path.as_ref();
        let mut entries = self.lock();

        for ancestor in path.ancestors().skip(1) {
            if ancestor.as_os_str().is_empty() {
                break;
            }
            entries.entry(ancestor.to_path_buf()).or_insert(MockEntry::Dir);
        }

        entries.insert(path.to_path_buf(), MockEntry::File(content.into()));
    }

    /// Remove a file. Directories stay.
    pub fn remove_file(&self, path: impl AsRef<Path>) {
        let mut entries = self.lock();
        if matches!(entries.get(path.as_ref()), Some(MockEntry::File(_))) {
            entries.remove(path.as_ref());
        }
    }

    // A poisoned lock only means another test thread panicked mid-update;
    // the map itself is still usable.
    fn lock(&self) -> MutexGuard<'_, HashMap<PathBuf, MockEntry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl FileSystem for MockFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        match self.lock().get(path) {
            Some(MockEntry::File(content)) => Ok(content.clone()),
            Some(MockEntry::Dir) => Err(anyhow!("Is a directory: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn is_file(&self, path: &Path) -> bool {
        matches!(self.lock().get(path), Some(MockEntry::File(_)))
    }
}
