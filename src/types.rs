// src/types.rs

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Logical kind of an external tool invocation.
///
/// The string tags double as queue keys, so they must stay stable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProcessCategory {
    /// `analyzer-version`: cheap, side-effect free.
    Version,
    /// `checkers`: lists the available checkers as JSON.
    Checkers,
    /// `parse`: turns stored reports into JSON.
    Parse,
    /// `log`: records a build into a compilation database.
    Log,
    /// `analyze`: the main analysis run.
    Analyze,
    #[default]
    Other,
}

impl ProcessCategory {
    pub const ALL: [ProcessCategory; 6] = [
        ProcessCategory::Version,
        ProcessCategory::Checkers,
        ProcessCategory::Parse,
        ProcessCategory::Log,
        ProcessCategory::Analyze,
        ProcessCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessCategory::Version => "version",
            ProcessCategory::Checkers => "list-checkers",
            ProcessCategory::Parse => "parse",
            ProcessCategory::Log => "log",
            ProcessCategory::Analyze => "analyze",
            ProcessCategory::Other => "other",
        }
    }

    /// Whether stdout of this category is forwarded to the shared log
    /// streams by default.
    ///
    /// Checker listings and parse results are JSON meant for a parser only.
    pub fn forwards_stdout_by_default(&self) -> bool {
        !matches!(self, ProcessCategory::Checkers | ProcessCategory::Parse)
    }
}

impl fmt::Display for ProcessCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProcessCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "version" => Ok(ProcessCategory::Version),
            "list-checkers" | "checkers" => Ok(ProcessCategory::Checkers),
            "parse" => Ok(ProcessCategory::Parse),
            "log" => Ok(ProcessCategory::Log),
            "analyze" => Ok(ProcessCategory::Analyze),
            "other" => Ok(ProcessCategory::Other),
            other => Err(format!("invalid process category: {other}")),
        }
    }
}

/// Where a newly submitted process lands in its category queue.
///
/// - `Append`: at the end (default).
/// - `Prepend`: at the front; an identical queued entry is replaced so the
///   work is effectively promoted.
/// - `Replace`: the whole category queue is cleared first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnqueueMode {
    #[default]
    Append,
    Prepend,
    Replace,
}

impl FromStr for EnqueueMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "append" => Ok(EnqueueMode::Append),
            "prepend" => Ok(EnqueueMode::Prepend),
            "replace" => Ok(EnqueueMode::Replace),
            other => Err(format!(
                "invalid enqueue mode: {other} (expected \"append\", \"prepend\" or \"replace\")"
            )),
        }
    }
}
