// src/config/vars.rs

//! `${...}` variable substitution in settings values.
//!
//! Supported variables:
//! - `${workspaceFolder}` and `${workspaceRoot}`: the workspace root
//! - `${cwd}`: the process working directory
//! - `${env.NAME}`: environment variable `NAME`, empty if unset

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::errors::{CheckrunnerError, Result};

static ENV_VARIABLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{env\.([^}]+)\}").expect("env variable regex is valid"));

/// Values available for substitution.
#[derive(Debug, Clone)]
pub struct VariableContext {
    workspace_folder: Option<PathBuf>,
    cwd: PathBuf,
    /// Replaces the process environment when set.
    env_override: Option<HashMap<String, String>>,
}

impl VariableContext {
    pub fn new(workspace_folder: Option<PathBuf>) -> Self {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            workspace_folder,
            cwd,
            env_override: None,
        }
    }

    /// Fixed working directory and environment, for reproducible results.
    pub fn with_env(
        workspace_folder: Option<PathBuf>,
        cwd: PathBuf,
        env: HashMap<String, String>,
    ) -> Self {
        Self {
            workspace_folder,
            cwd,
            env_override: Some(env),
        }
    }

    pub fn workspace_folder(&self) -> Option<&Path> {
        self.workspace_folder.as_deref()
    }

    fn env_var(&self, name: &str) -> String {
        match &self.env_override {
            Some(env) => env.get(name).cloned().unwrap_or_default(),
            None => std::env::var(name).unwrap_or_default(),
        }
    }

    /// Substitute every known variable in `value`.
    ///
    /// Returns `None` when no workspace is open, since the result could not
    /// be meaningful.
    pub fn replace_variables(&self, value: &str) -> Option<String> {
        let workspace = self.workspace_folder.as_ref()?.display().to_string();
        let cwd = self.cwd.display().to_string();

        let replaced = value
            .replace("${workspaceRoot}", &workspace)
            .replace("${workspaceFolder}", &workspace)
            .replace("${cwd}", &cwd);

        let replaced = ENV_VARIABLE.replace_all(&replaced, |caps: &Captures<'_>| self.env_var(&caps[1]));

        Some(replaced.into_owned())
    }

    /// Split a shell-style argument string and substitute each token.
    ///
    /// Empty tokens are dropped. Without a workspace the result is empty.
    pub fn parse_shell_args(&self, args: &str) -> Result<Vec<String>> {
        if self.workspace_folder.is_none() {
            return Ok(Vec::new());
        }

        let tokens = shell_words::split(args).map_err(|e| {
            CheckrunnerError::ConfigError(format!("invalid argument string {args:?}: {e}"))
        })?;

        Ok(tokens
            .into_iter()
            .filter(|token| !token.is_empty())
            .filter_map(|token| self.replace_variables(&token))
            .collect())
    }
}
