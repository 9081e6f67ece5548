//! Configuration loading and precedence tests

use pretty_assertions::assert_eq;
use scalar_config::{ConfigError, ConfigLoader, ProjectConfig, PROJECT_CONFIG_FILE};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn create_config_file(dir: &Path, content: &str) -> PathBuf {
    let config_path = dir.join(PROJECT_CONFIG_FILE);
    fs::write(&config_path, content).unwrap();
    config_path
}

fn isolated_loader(dir: &TempDir) -> ConfigLoader {
    ConfigLoader::new().with_global_config_path(dir.path().join("missing-global.toml"))
}

// ============================================================================
// Config Loading Tests
// ============================================================================

#[test]
fn test_load_with_empty_config() {
    let temp_dir = TempDir::new().unwrap();
    create_config_file(temp_dir.path(), "");

    let config = isolated_loader(&temp_dir)
        .load_from_directory(temp_dir.path())
        .unwrap();

    // Empty config is valid (all fields optional)
    assert!(config.is_project());
    assert_eq!(config.scala_version().as_str(), "2.12.8");
}

#[test]
fn test_load_from_specific_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = create_config_file(
        temp_dir.path(),
        r#"
[scalac]
scala_version = "2.13.8"
sdk_name = "Scala 2.13"
"#,
    );

    let config = isolated_loader(&temp_dir).load_from_file(&path).unwrap();

    assert_eq!(config.scala_version().as_str(), "2.13.8");
    assert_eq!(config.sdk_name(), "Scala 2.13");
    assert_eq!(config.project_root(), Some(temp_dir.path()));
}

#[test]
fn test_load_missing_file() {
    let temp_dir = TempDir::new().unwrap();
    let result = isolated_loader(&temp_dir).load_from_file(&temp_dir.path().join("nope.toml"));
    assert!(matches!(result, Err(ConfigError::NotFound(_))));
}

#[test]
fn test_invalid_toml_reports_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = create_config_file(temp_dir.path(), "[scalac\nscala_version = ");

    match ProjectConfig::load_from_file(&path) {
        Err(ConfigError::TomlParseError { file, .. }) => assert_eq!(file, path),
        other => panic!("Expected TomlParseError, got {:?}", other),
    }
}

#[test]
fn test_malformed_version_in_file() {
    let temp_dir = TempDir::new().unwrap();
    create_config_file(
        temp_dir.path(),
        r#"
[scalac]
scala_version = "2"
"#,
    );

    let result = isolated_loader(&temp_dir).load_from_directory(temp_dir.path());
    match result {
        Err(ConfigError::InvalidVersion(msg)) => {
            assert!(msg.contains("'2'"));
        }
        other => panic!("Expected InvalidVersion, got {:?}", other),
    }
}

#[test]
fn test_malformed_global_version_is_fatal() {
    let temp_dir = TempDir::new().unwrap();
    let project_file = create_config_file(temp_dir.path(), "");
    let global_path = temp_dir.path().join("global.toml");
    fs::write(
        &global_path,
        r#"
[defaults]
scala_version = "2"
"#,
    )
    .unwrap();

    let mut loader = ConfigLoader::new().with_global_config_path(&global_path);
    assert!(matches!(
        loader.load_from_directory(temp_dir.path()),
        Err(ConfigError::InvalidVersion(_))
    ));
    assert!(matches!(
        loader.load_from_file(&project_file),
        Err(ConfigError::InvalidVersion(_))
    ));
}

#[test]
fn test_unparsable_global_config_is_fatal() {
    let temp_dir = TempDir::new().unwrap();
    create_config_file(temp_dir.path(), "");
    let global_path = temp_dir.path().join("global.toml");
    fs::write(&global_path, "[defaults\n").unwrap();

    let result = ConfigLoader::new()
        .with_global_config_path(&global_path)
        .load_from_directory(temp_dir.path());
    assert!(matches!(result, Err(ConfigError::TomlParseError { .. })));
}

// ============================================================================
// Path Resolution Tests
// ============================================================================

#[test]
fn test_source_set_settings_and_paths() {
    let temp_dir = TempDir::new().unwrap();
    create_config_file(
        temp_dir.path(),
        r#"
[build]
dir = "out"

[toolchain]
artifacts = ["toolchain/scala-library-2.13.8.jar", "toolchain/scala-compiler-2.13.8.jar"]
repositories = ["repo"]

[source_sets.test]
classpath = ["lib/junit.jar"]
"#,
    );

    let config = isolated_loader(&temp_dir)
        .load_from_directory(temp_dir.path())
        .unwrap();
    let root = temp_dir.path();

    assert_eq!(config.build_dir(root), root.join("out"));
    assert_eq!(
        config.toolchain_artifacts(root),
        vec![
            root.join("toolchain/scala-library-2.13.8.jar"),
            root.join("toolchain/scala-compiler-2.13.8.jar"),
        ]
    );
    assert_eq!(config.repositories(root), vec![root.join("repo")]);
    assert_eq!(
        config.source_set("test").classpath,
        vec![PathBuf::from("lib/junit.jar")]
    );
    assert!(config.source_set("main").classpath.is_empty());
}
