//! End-to-end builds of small projects
//!
//! The JVM is replaced by a shell script speaking the same command line:
//! `-cp <toolchain> <main class> -classpath <cp> -d <dest> <sources...>`.
//! It "compiles" every `object Name` or `class Name` line into
//! `<dest>/Name.class` and fails on `uses Name` when `Name.class` is not on
//! the classpath.
#![cfg(unix)]

use pretty_assertions::assert_eq;
use scalar_build::{BuildError, Builder, TaskOutcome};
use scalar_config::ConfigLoader;
use serial_test::serial;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use tempfile::TempDir;

const FAKE_SCALAC: &str = r#"#!/bin/sh
shift
artifacts="$1"; shift
main="$1"; shift
shift
classpath="$1"; shift
shift
dest="$1"; shift
status=0
for src in "$@"; do
  while read -r word name rest; do
    case "$word" in
      object|class)
        : > "$dest/$name.class"
        ;;
      uses)
        found=no
        old_ifs=$IFS
        IFS=:
        for entry in $classpath; do
          if [ -f "$entry/$name.class" ]; then found=yes; fi
        done
        IFS=$old_ifs
        if [ "$found" = no ]; then
          echo "$src:1: error: not found: object $name" >&2
          status=1
        fi
        ;;
      import)
        case "$name" in
          scala.jdk*)
            case "$artifacts" in
              *2.13*) ;;
              *)
                echo "$src:1: error: object jdk is not a member of package scala" >&2
                status=1
                ;;
            esac
            ;;
        esac
        ;;
    esac
  done < "$src"
done
echo "compiled by $main"
exit $status
"#;

/// Create a project whose toolchain is the fake compiler above
fn create_test_project(extra_config: &str, files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();

    fs::create_dir_all(root.join("lib")).unwrap();
    fs::write(root.join("lib/scala-library-2.12.8.jar"), "library").unwrap();
    fs::write(root.join("lib/scala-compiler-2.12.8.jar"), "compiler").unwrap();

    let java = root.join("bin/java");
    fs::create_dir_all(java.parent().unwrap()).unwrap();
    fs::write(&java, FAKE_SCALAC).unwrap();
    fs::set_permissions(&java, fs::Permissions::from_mode(0o755)).unwrap();

    let config = format!(
        r#"
[package]
name = "test-project"

[scalac]
scala_version = "2.12.8"

[toolchain]
java = "bin/java"
artifacts = ["lib/scala-library-2.12.8.jar", "lib/scala-compiler-2.12.8.jar"]

[source_sets.main]
classpath = ["lib/scala-library-2.12.8.jar"]
{}
"#,
        extra_config
    );
    fs::write(root.join("scalar.toml"), config).unwrap();

    for (path, content) in files {
        let full = root.join(path);
        fs::create_dir_all(full.parent().unwrap()).unwrap();
        fs::write(full, content).unwrap();
    }

    dir
}

fn make_builder(path: &Path) -> Builder {
    let config = ConfigLoader::new()
        .with_global_config_path(path.join("no-global.toml"))
        .load_from_directory(path)
        .unwrap();
    Builder::from_config(path, config).unwrap().with_jobs(2)
}

fn class_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
#[serial]
fn test_test_sources_compile_against_main_output() {
    let temp = create_test_project(
        "",
        &[
            ("src/main/scala/Person.scala", "object Person\n"),
            (
                "src/test/scala/PersonTest.scala",
                "object PersonTest\nuses Person\n",
            ),
        ],
    );

    let report = make_builder(temp.path()).build(&[]).unwrap();

    assert!(report.success(), "failures: {:?}", report.failures());
    assert_eq!(report.outcome("compileScala"), Some(TaskOutcome::Success));
    assert_eq!(report.outcome("compileTestScala"), Some(TaskOutcome::Success));
    assert_eq!(
        class_files(&temp.path().join("build/classes/scala/main")),
        vec!["Person.class"]
    );
    assert!(temp
        .path()
        .join("build/classes/scala/test/PersonTest.class")
        .exists());
}

#[test]
#[serial]
fn test_requesting_test_task_runs_main_first() {
    let temp = create_test_project(
        "",
        &[
            ("src/main/scala/Person.scala", "object Person\n"),
            ("src/test/scala/PersonTest.scala", "uses Person\n"),
        ],
    );

    let report = make_builder(temp.path())
        .build(&["compileTestScala".to_string()])
        .unwrap();

    assert!(report.success());
    let order: Vec<_> = report.results().iter().map(|r| r.name.as_str()).collect();
    assert_eq!(order, vec!["compileScala", "compileTestScala"]);
}

#[test]
#[serial]
fn test_custom_set_without_edge_cannot_see_main() {
    let temp = create_test_project(
        r#"
[source_sets.integration]
classpath = ["lib/scala-library-2.12.8.jar"]
"#,
        &[
            ("src/main/scala/Person.scala", "object Person\n"),
            ("src/integration/scala/PersonIT.scala", "uses Person\n"),
        ],
    );

    let report = make_builder(temp.path()).build(&[]).unwrap();

    assert!(!report.success());
    assert_eq!(report.outcome("compileScala"), Some(TaskOutcome::Success));
    assert_eq!(
        report.outcome("compileIntegrationScala"),
        Some(TaskOutcome::Failed)
    );
    let failure = report.first_failure().unwrap();
    assert!(failure
        .error
        .diagnostics()
        .unwrap()
        .contains("not found: object Person"));
}

#[test]
#[serial]
fn test_declared_edge_makes_main_visible() {
    let temp = create_test_project(
        r#"
[source_sets.integration]
depends_on = ["main"]
"#,
        &[
            ("src/main/scala/Person.scala", "object Person\n"),
            ("src/integration/scala/PersonIT.scala", "uses Person\n"),
        ],
    );

    let report = make_builder(temp.path()).build(&[]).unwrap();

    assert!(report.success(), "failures: {:?}", report.failures());
    assert_eq!(
        report.outcome("compileIntegrationScala"),
        Some(TaskOutcome::Success)
    );
}

#[test]
#[serial]
fn test_version_mismatch_surfaces_diagnostics_and_skips_dependents() {
    let temp = create_test_project(
        "",
        &[
            (
                "src/main/scala/Converters.scala",
                "import scala.jdk.CollectionConverters._\nobject Converters\n",
            ),
            ("src/test/scala/ConvertersTest.scala", "uses Converters\n"),
        ],
    );

    let report = make_builder(temp.path()).build(&[]).unwrap();

    assert!(!report.success());
    assert_eq!(report.outcome("compileScala"), Some(TaskOutcome::Failed));
    assert_eq!(
        report.outcome("compileTestScala"),
        Some(TaskOutcome::NotAttempted)
    );

    match &report.first_failure().unwrap().error {
        BuildError::CompileFailed { task, diagnostics } => {
            assert_eq!(task, "compileScala");
            assert!(diagnostics
                .contains("Converters.scala:1: error: object jdk is not a member of package scala"));
        }
        other => panic!("Expected CompileFailed, got {:?}", other),
    }
}

#[test]
#[serial]
fn test_second_build_is_up_to_date() {
    let temp = create_test_project(
        "",
        &[
            ("src/main/scala/Person.scala", "object Person\n"),
            ("src/test/scala/PersonTest.scala", "uses Person\n"),
        ],
    );

    let first = make_builder(temp.path()).build(&[]).unwrap();
    assert!(first.success());

    let second = make_builder(temp.path()).build(&[]).unwrap();
    assert_eq!(second.outcome("compileScala"), Some(TaskOutcome::UpToDate));
    assert_eq!(second.outcome("compileTestScala"), Some(TaskOutcome::UpToDate));
    assert_eq!(second.stats().up_to_date, 2);

    fs::write(
        temp.path().join("src/main/scala/Person.scala"),
        "object Person\nobject Address\n",
    )
    .unwrap();
    let third = make_builder(temp.path()).build(&[]).unwrap();
    assert_eq!(third.outcome("compileScala"), Some(TaskOutcome::Success));
    assert_eq!(third.outcome("compileTestScala"), Some(TaskOutcome::Success));
}

#[test]
#[serial]
fn test_rerun_ignores_fingerprints() {
    let temp = create_test_project("", &[("src/main/scala/Person.scala", "object Person\n")]);

    make_builder(temp.path()).build(&[]).unwrap();
    let report = make_builder(temp.path())
        .with_rerun(true)
        .build(&[])
        .unwrap();

    assert_eq!(report.outcome("compileScala"), Some(TaskOutcome::Success));
}

#[test]
#[serial]
fn test_empty_source_sets_report_no_source() {
    let temp = create_test_project("", &[]);

    let report = make_builder(temp.path()).build(&[]).unwrap();

    assert!(report.success());
    assert_eq!(report.outcome("compileScala"), Some(TaskOutcome::NoSource));
    assert_eq!(report.outcome("compileTestScala"), Some(TaskOutcome::NoSource));
    assert!(!temp.path().join("build/classes/scala/main").exists());
}

#[test]
#[serial]
fn test_library_missing_from_compile_classpath() {
    let temp = create_test_project(
        r#"
[source_sets.tools]
"#,
        &[("src/tools/scala/Tool.scala", "object Tool\n")],
    );

    let report = make_builder(temp.path()).build(&[]).unwrap();

    assert_eq!(report.outcome("compileToolsScala"), Some(TaskOutcome::Failed));
    let failure = report.first_failure().unwrap();
    assert!(matches!(failure.error, BuildError::ArtifactNotFound { .. }));
}

#[test]
#[serial]
fn test_cycle_is_rejected_before_any_task_runs() {
    let temp = create_test_project(
        r#"
[source_sets.a]
depends_on = ["b"]

[source_sets.b]
depends_on = ["a"]
"#,
        &[("src/main/scala/Person.scala", "object Person\n")],
    );

    let err = make_builder(temp.path()).build(&[]).unwrap_err();

    assert!(err.is_graph_error(), "unexpected error: {:?}", err);
    assert!(!temp.path().join("build/classes/scala/main").exists());
}

#[test]
#[serial]
fn test_clean_then_rebuild() {
    let temp = create_test_project("", &[("src/main/scala/Person.scala", "object Person\n")]);
    let builder = make_builder(temp.path());

    builder.build(&[]).unwrap();
    builder.clean().unwrap();
    assert!(!temp.path().join("build/classes/scala/main").exists());

    let report = builder.build(&[]).unwrap();
    assert_eq!(report.outcome("compileScala"), Some(TaskOutcome::Success));
    assert_eq!(
        class_files(&temp.path().join("build/classes/scala/main")),
        vec!["Person.class"]
    );
}
