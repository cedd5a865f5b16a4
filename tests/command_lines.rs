// tests/command_lines.rs

mod common;
use crate::common::builders::SettingsBuilder;

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use checkrunner::command::database::workspace_candidates;
use checkrunner::command::{
    DatabaseLocator, ToolVersion, analyze_args, candidate_paths, checkers_args, log_args,
    parse_args, version_args,
};
use checkrunner::errors::{BuildError, CheckrunnerError};
use checkrunner::fs::mock::MockFileSystem;

type TestResult = Result<(), Box<dyn Error>>;

const OLD: ToolVersion = ToolVersion::new(6, 20, 1);
const NEW: ToolVersion = ToolVersion::new(6, 23, 0);

fn locator(fs: &MockFileSystem) -> DatabaseLocator {
    DatabaseLocator::new(Arc::new(fs.clone()))
}

fn paths(files: &[&str]) -> Vec<PathBuf> {
    files.iter().map(PathBuf::from).collect()
}

fn strings(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}

#[test]
fn metadata_commands() {
    assert_eq!(version_args(), strings(&["analyzer-version", "--output", "json"]));
    assert_eq!(
        checkers_args(),
        strings(&["checkers", "--details", "--output", "json"])
    );
}

#[test]
fn parse_reads_the_reports_folder() -> TestResult {
    let settings = SettingsBuilder::new("/ws").build();

    assert_eq!(
        parse_args(&settings, &[])?,
        strings(&["parse", "/ws/.codechecker/reports", "-e", "json"])
    );
    assert_eq!(
        parse_args(&settings, &paths(&["/ws/a.c", "/ws/b.c"]))?,
        strings(&[
            "parse",
            "/ws/.codechecker/reports",
            "-e",
            "json",
            "--file",
            "/ws/a.c",
            "/ws/b.c",
        ])
    );

    let custom = SettingsBuilder::new("/ws").output_folder("${workspaceFolder}/out").build();
    assert_eq!(parse_args(&custom, &[])?[1], "/ws/out/reports");
    Ok(())
}

#[test]
fn builders_need_a_workspace() {
    let settings = SettingsBuilder::without_workspace().build();
    let fs = MockFileSystem::new();

    assert!(matches!(
        parse_args(&settings, &[]),
        Err(CheckrunnerError::Build(BuildError::NoWorkspace))
    ));
    assert!(matches!(
        log_args(&settings, &locator(&fs), None),
        Err(CheckrunnerError::Build(BuildError::NoWorkspace))
    ));
    assert!(matches!(
        analyze_args(&settings, &locator(&fs), Some(NEW), &[]),
        Err(CheckrunnerError::Build(BuildError::NoWorkspace))
    ));
}

#[test]
fn log_writes_into_the_output_folder_by_default() -> TestResult {
    let settings = SettingsBuilder::new("/ws").build();
    let fs = MockFileSystem::new();

    assert_eq!(
        log_args(&settings, &locator(&fs), None)?,
        strings(&[
            "log",
            "--output",
            "/ws/.codechecker/compile_commands.json",
            "--build",
            "make",
        ])
    );
    Ok(())
}

#[test]
fn log_uses_configured_database_arguments_and_build_command() -> TestResult {
    let settings = SettingsBuilder::new("/ws")
        .database("${workspaceFolder}/build/compile_commands.json")
        .log_arguments("--quiet -o ${env.LOG_DIR}")
        .log_build_command("make -j${env.JOBS}")
        .env("LOG_DIR", "/tmp/logs")
        .env("JOBS", "8")
        .build();
    let fs = MockFileSystem::new();
    fs.add_file("/ws/build/compile_commands.json", "[]");

    assert_eq!(
        log_args(&settings, &locator(&fs), None)?,
        strings(&[
            "log",
            "--quiet",
            "-o",
            "/tmp/logs",
            "--output",
            "/ws/build/compile_commands.json",
            "--build",
            "make -j8",
        ])
    );

    let explicit = log_args(&settings, &locator(&fs), Some("ninja -C ${workspaceFolder}/build"))?;
    assert_eq!(explicit.last().map(String::as_str), Some("ninja -C /ws/build"));
    Ok(())
}

#[test]
fn log_ignores_conventional_locations() -> TestResult {
    // An existing database in the workspace is not what `log` writes to
    // unless it is configured.
    let settings = SettingsBuilder::new("/ws").build();
    let fs = MockFileSystem::new();
    fs.add_file("/ws/build/compile_commands.json", "[]");

    let args = log_args(&settings, &locator(&fs), None)?;
    assert_eq!(args[2], "/ws/.codechecker/compile_commands.json");
    Ok(())
}

#[test]
fn older_tools_always_need_a_located_database() -> TestResult {
    let settings = SettingsBuilder::new("/ws").build();
    let fs = MockFileSystem::new();

    assert!(matches!(
        analyze_args(&settings, &locator(&fs), Some(OLD), &[]),
        Err(CheckrunnerError::Build(BuildError::NoCompilationDatabase { .. }))
    ));

    fs.add_file("/ws/build/compile_cmd.json", "[]");
    assert_eq!(
        analyze_args(&settings, &locator(&fs), Some(OLD), &paths(&["/ws/a.c"]))?,
        strings(&[
            "analyze",
            "--output",
            "/ws/.codechecker/reports",
            "/ws/build/compile_cmd.json",
            "--file",
            "/ws/a.c",
        ])
    );
    Ok(())
}

#[test]
fn newer_tools_resolve_the_database_themselves() -> TestResult {
    let settings = SettingsBuilder::new("/ws").build();
    let fs = MockFileSystem::new();
    // A conventional database does not matter for the built-in resolver.
    fs.add_file("/ws/compile_commands.json", "[]");

    assert_eq!(
        analyze_args(&settings, &locator(&fs), Some(NEW), &[])?,
        strings(&["analyze", "--output", "/ws/.codechecker/reports", "/ws"])
    );
    assert_eq!(
        analyze_args(&settings, &locator(&fs), Some(NEW), &paths(&["/ws/src/a.c"]))?,
        strings(&["analyze", "--output", "/ws/.codechecker/reports", "/ws/src/a.c"])
    );
    Ok(())
}

#[test]
fn newer_tools_prefer_a_configured_database() -> TestResult {
    let settings = SettingsBuilder::new("/ws")
        .database("/db/compile_commands.json")
        .build();
    let fs = MockFileSystem::new();
    fs.add_file("/db/compile_commands.json", "[]");

    assert_eq!(
        analyze_args(&settings, &locator(&fs), Some(NEW), &paths(&["/ws/a.c"]))?,
        strings(&[
            "analyze",
            "--output",
            "/ws/.codechecker/reports",
            "/db/compile_commands.json",
            "--file",
            "/ws/a.c",
        ])
    );
    Ok(())
}

#[test]
fn several_files_need_a_database() -> TestResult {
    let settings = SettingsBuilder::new("/ws").build();
    let fs = MockFileSystem::new();
    let files = paths(&["/ws/a.c", "/ws/b.c"]);

    assert!(matches!(
        analyze_args(&settings, &locator(&fs), Some(NEW), &files),
        Err(CheckrunnerError::Build(BuildError::MultipleFilesNeedDatabase))
    ));

    fs.add_file("/ws/.codechecker/compile_commands.json", "[]");
    let args = analyze_args(&settings, &locator(&fs), Some(NEW), &files)?;
    assert_eq!(
        &args[3..],
        &strings(&[
            "/ws/.codechecker/compile_commands.json",
            "--file",
            "/ws/a.c",
            "/ws/b.c",
        ])[..]
    );
    Ok(())
}

#[test]
fn threads_and_extra_arguments() -> TestResult {
    let settings = SettingsBuilder::new("/ws")
        .thread_count(4)
        .arguments("--analyzers clangsa --skip ${workspaceFolder}/skip.list \"\"")
        .build();
    let fs = MockFileSystem::new();

    assert_eq!(
        analyze_args(&settings, &locator(&fs), Some(NEW), &[])?,
        strings(&[
            "analyze",
            "--output",
            "/ws/.codechecker/reports",
            "-j",
            "4",
            "/ws",
            "--analyzers",
            "clangsa",
            "--skip",
            "/ws/skip.list",
        ])
    );
    Ok(())
}

#[test]
fn analyze_needs_a_known_version() {
    let settings = SettingsBuilder::new("/ws").build();
    let fs = MockFileSystem::new();

    assert!(matches!(
        analyze_args(&settings, &locator(&fs), None, &[]),
        Err(CheckrunnerError::Build(BuildError::VersionUnknown))
    ));
}

#[test]
fn database_candidates_are_searched_in_order() -> TestResult {
    assert_eq!(
        workspace_candidates("/ws".as_ref()),
        paths(&[
            "/ws/.codechecker/compile_commands.json",
            "/ws/.codechecker/compile_cmd.json",
            "/ws/compile_commands.json",
            "/ws/compile_cmd.json",
            "/ws/build/compile_commands.json",
            "/ws/build/compile_cmd.json",
        ])
    );

    let all = candidate_paths(Some("/db/cc.json".as_ref()), Some("/ws".as_ref()));
    assert_eq!(all.len(), 7);
    assert_eq!(all[0], PathBuf::from("/db/cc.json"));

    let fs = MockFileSystem::new();
    fs.add_file("/ws/build/compile_commands.json", "[]");
    fs.add_file("/ws/compile_cmd.json", "[]");
    let found = locator(&fs).locate(None, Some("/ws".as_ref()))?;
    assert_eq!(found, PathBuf::from("/ws/compile_cmd.json"));

    // A directory named like a database does not count.
    let fs = MockFileSystem::new();
    fs.add_file("/ws/compile_commands.json/nested", "x");
    let err = locator(&fs).locate(None, Some("/ws".as_ref())).unwrap_err();
    match err {
        BuildError::NoCompilationDatabase { searched } => assert_eq!(searched.len(), 6),
        other => panic!("unexpected error {other:?}"),
    }
    Ok(())
}
