// tests/version_parsing.rs

use std::error::Error;

use checkrunner::command::{
    BUILTIN_RESOLVER_VERSION, MINIMUM_SUPPORTED_VERSION, ToolVersion, VersionError,
    parse_version_output,
};

type TestResult = Result<(), Box<dyn Error>>;

#[test]
fn reads_current_and_legacy_keys() -> TestResult {
    let current = r#"{"base_package_version": "6.23.1", "package_build_date": "2024-01-01"}"#;
    assert_eq!(parse_version_output(current)?, ToolVersion::new(6, 23, 1));

    let legacy = r#"{"Base package version": "6.18.2", "Package build date": "2022"}"#;
    assert_eq!(parse_version_output(legacy)?, ToolVersion::new(6, 18, 2));
    Ok(())
}

#[test]
fn banner_before_the_json_is_skipped() -> TestResult {
    let output = "[INFO 2024] - some banner\n{\"base_package_version\": \"6.22.0\"}\n";
    assert_eq!(parse_version_output(output)?, ToolVersion::new(6, 22, 0));
    Ok(())
}

#[test]
fn malformed_output_is_rejected() {
    assert!(matches!(
        parse_version_output("CodeChecker 6.23"),
        Err(VersionError::InvalidJson(_))
    ));
    assert!(matches!(
        parse_version_output("{not json"),
        Err(VersionError::InvalidJson(_))
    ));
    assert_eq!(
        parse_version_output(r#"{"other": "1.0.0"}"#),
        Err(VersionError::MissingField)
    );
    assert_eq!(
        parse_version_output(r#"{"base_package_version": ""}"#),
        Err(VersionError::MissingField)
    );
    assert!(matches!(
        parse_version_output(r#"{"base_package_version": "dev"}"#),
        Err(VersionError::InvalidVersion(_))
    ));
}

#[test]
fn partial_and_suffixed_versions() -> TestResult {
    assert_eq!("6".parse::<ToolVersion>()?, ToolVersion::new(6, 0, 0));
    assert_eq!("6.19".parse::<ToolVersion>()?, ToolVersion::new(6, 19, 0));
    assert_eq!("6.24.0-rc1".parse::<ToolVersion>()?, ToolVersion::new(6, 24, 0));
    assert_eq!(ToolVersion::new(6, 18, 2).to_string(), "6.18.2");
    Ok(())
}

#[test]
fn versions_compare_numerically() {
    assert!(ToolVersion::new(6, 9, 0) < ToolVersion::new(6, 10, 0));
    assert!(ToolVersion::new(10, 0, 0) > ToolVersion::new(6, 99, 99));

    assert!(!ToolVersion::new(6, 18, 1).is_supported());
    assert!(MINIMUM_SUPPORTED_VERSION.is_supported());
    assert!(ToolVersion::new(6, 19, 0).is_supported());

    assert!(!ToolVersion::new(6, 21, 9).has_builtin_resolver());
    assert!(BUILTIN_RESOLVER_VERSION.has_builtin_resolver());
    assert!(ToolVersion::new(7, 0, 0).has_builtin_resolver());
}
