// src/process/classify.rs

//! Outcome classification from exit codes and the tool's last log line.
//!
//! The external tool prefixes its log lines with a bracketed severity, e.g.
//! `[WARNING 2024-01-02 10:11] - skipped 3 files`. A run that exits cleanly
//! can still have failed if the last thing it logged was an error, so the
//! exit code alone is not enough.

use std::sync::LazyLock;

use regex::Regex;

use super::status::{ProcessStatus, StatusKind};

/// Exit code the tool uses for "ran fine, found reports".
pub const FINDINGS_EXIT_CODE: i32 = 2;

static SEVERITY_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[(\w+)").expect("severity regex is valid"));

static BRACKET_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[[^\]]*\]").expect("prefix regex is valid"));

/// Severity extracted from a `[SEVERITY ...]` line prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Critical,
    Error,
    Warning,
    Debug,
    Other,
}

impl Severity {
    fn from_tag(tag: &str) -> Self {
        match tag {
            "CRITICAL" => Severity::Critical,
            "ERROR" => Severity::Error,
            "WARNING" => Severity::Warning,
            "DEBUG" => Severity::Debug,
            _ => Severity::Other,
        }
    }
}

/// Split a log line into its severity (if tagged) and the message with the
/// bracketed prefix removed.
pub fn split_log_line(line: &str) -> (Option<Severity>, String) {
    let severity = SEVERITY_TAG
        .captures(line)
        .and_then(|c| c.get(1))
        .map(|m| Severity::from_tag(m.as_str()));

    // Untagged lines are kept whole, leading dashes included.
    let message = match BRACKET_PREFIX.find(line) {
        Some(prefix) => line[prefix.end()..].trim_start_matches([' ', '-']),
        None => line,
    };

    (severity, message.trim_end().to_string())
}

/// Whether an exit code counts as a normal completion.
///
/// `None` means the process was terminated by a signal without a code.
pub fn is_success_exit(code: Option<i32>) -> bool {
    matches!(code, None | Some(0) | Some(FINDINGS_EXIT_CODE))
}

/// Classify a process that closed with the given exit code.
pub fn classify_exit(code: Option<i32>, last_log_line: Option<&str>) -> ProcessStatus {
    let parsed = last_log_line.map(split_log_line);

    if !is_success_exit(code) {
        return errored(parsed.map(|(_, msg)| msg));
    }

    match parsed {
        None => ProcessStatus::new(StatusKind::Finished),
        Some((severity, message)) => match severity {
            Some(Severity::Critical) | Some(Severity::Error) => errored(Some(message)),
            Some(Severity::Warning) => reason_status(StatusKind::Warning, message),
            Some(Severity::Debug) => ProcessStatus::new(StatusKind::Finished),
            Some(Severity::Other) | None => reason_status(StatusKind::Finished, message),
        },
    }
}

/// Classify a process whose spawn or IO failed at the OS level.
pub fn classify_spawn_error(message: &str) -> ProcessStatus {
    errored(Some(message.to_string()))
}

fn errored(reason: Option<String>) -> ProcessStatus {
    match reason {
        Some(r) => reason_status(StatusKind::Errored, r),
        None => ProcessStatus::new(StatusKind::Errored),
    }
}

fn reason_status(kind: StatusKind, message: String) -> ProcessStatus {
    if message.is_empty() {
        ProcessStatus::new(kind)
    } else {
        ProcessStatus::with_reason(kind, message)
    }
}

/// Extract the last line from an output chunk that can serve as a log
/// message.
///
/// JSON output (`{...`) and metadata lines (`> cmd`, `>>> info`) are skipped.
pub fn last_log_line(chunk: &str) -> Option<&str> {
    chunk
        .split('\n')
        .map(|line| line.trim_end_matches('\r'))
        .rev()
        .find(|line| !line.is_empty() && !line.starts_with('{') && !line.starts_with('>'))
}
