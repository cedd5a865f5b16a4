// src/command/database.rs

//! Compilation database lookup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::errors::BuildError;
use crate::fs::FileSystem;

/// Folders searched inside the workspace, in order. Empty is the root.
pub const DATABASE_FOLDERS: [&str; 3] = [".codechecker", "", "build"];

/// Accepted database file names, in order.
pub const DATABASE_FILE_NAMES: [&str; 2] = ["compile_commands.json", "compile_cmd.json"];

/// Candidate locations for a workspace, excluding any configured path.
pub fn workspace_candidates(workspace: &Path) -> Vec<PathBuf> {
    DATABASE_FOLDERS
        .iter()
        .flat_map(|folder| {
            DATABASE_FILE_NAMES.iter().map(move |name| {
                if folder.is_empty() {
                    workspace.join(name)
                } else {
                    workspace.join(folder).join(name)
                }
            })
        })
        .collect()
}

/// All candidates in lookup order: the configured path first, then the
/// conventional locations of `workspace`.
pub fn candidate_paths(configured: Option<&Path>, workspace: Option<&Path>) -> Vec<PathBuf> {
    configured
        .map(Path::to_path_buf)
        .into_iter()
        .chain(workspace.map(workspace_candidates).unwrap_or_default())
        .collect()
}

/// Finds the first existing compilation database among the candidates.
#[derive(Debug, Clone)]
pub struct DatabaseLocator {
    fs: Arc<dyn FileSystem>,
}

impl DatabaseLocator {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    /// Look up a database.
    ///
    /// With `workspace` set, the conventional locations inside it are
    /// searched after `configured`; otherwise only `configured` is checked.
    pub fn locate(
        &self,
        configured: Option<&Path>,
        workspace: Option<&Path>,
    ) -> Result<PathBuf, BuildError> {
        let candidates = candidate_paths(configured, workspace);

        if let Some(found) = candidates.iter().find(|path| self.fs.is_file(path)) {
            info!(path = %found.display(), "compilation database found");
            return Ok(found.clone());
        }

        if configured.is_none() {
            debug!("no compilation database path set in settings");
        }
        if workspace.is_none() {
            debug!("no workspace folder searched for a compilation database");
        }
        for path in &candidates {
            warn!(path = %path.display(), "no compilation database at candidate path");
        }

        Err(BuildError::NoCompilationDatabase {
            searched: candidates,
        })
    }
}
