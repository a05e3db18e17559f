// tests/runtime_resolution.rs
#![cfg(unix)]

mod common;
use crate::common::{fake_python, init_tracing, isolated_resolver, with_timeout, write_executable};

use std::fs;
use std::path::Path;

use kiosk::errors::KioskError;
use kiosk::runtime::RuntimeResolver;

#[tokio::test]
async fn constraint_picks_the_matching_minor_only() {
    init_tracing();
    let tmp = tempfile::tempdir().unwrap();
    let bin = tmp.path().join("bin");
    fs::create_dir_all(&bin).unwrap();
    let py312 = fake_python(&tmp.path().join("py312/python"), "3.12", 0);
    let py310 = fake_python(&tmp.path().join("py310/python"), "3.10", 0);
    let py311 = fake_python(&tmp.path().join("py311/python"), "3.11", 0);

    let mut resolver =
        RuntimeResolver::new(isolated_resolver(&bin, vec![py312, py310, py311.clone()]));
    let handle = with_timeout(resolver.resolve(Some("3.11"), false)).await.unwrap();

    assert_eq!(handle.path, py311);
    assert_eq!(handle.reported_version, "3.11");
}

#[tokio::test]
async fn patch_level_constraint_is_normalized() {
    init_tracing();
    let tmp = tempfile::tempdir().unwrap();
    let bin = tmp.path().join("bin");
    fs::create_dir_all(&bin).unwrap();
    let py311 = fake_python(&tmp.path().join("py311/python"), "3.11", 0);

    let mut resolver = RuntimeResolver::new(isolated_resolver(&bin, vec![py311.clone()]));
    let handle = with_timeout(resolver.resolve(Some("3.11.4"), false)).await.unwrap();
    assert_eq!(handle.path, py311);
}

#[tokio::test]
async fn neighbouring_minors_never_satisfy_a_constraint() {
    init_tracing();
    let tmp = tempfile::tempdir().unwrap();
    let bin = tmp.path().join("bin");
    fs::create_dir_all(&bin).unwrap();
    let py310 = fake_python(&tmp.path().join("py310/python"), "3.10", 0);
    let py312 = fake_python(&tmp.path().join("py312/python"), "3.12", 0);

    let mut resolver = RuntimeResolver::new(isolated_resolver(&bin, vec![py310, py312]));
    let err = with_timeout(resolver.resolve(Some("3.11"), false))
        .await
        .unwrap_err();

    assert!(matches!(err, KioskError::RuntimeNotFound(ref v) if v == "3.11"), "got {err:?}");
}

#[tokio::test]
async fn unconstrained_takes_the_first_working_candidate() {
    init_tracing();
    let tmp = tempfile::tempdir().unwrap();
    let bin = tmp.path().join("bin");
    fs::create_dir_all(&bin).unwrap();
    let missing = tmp.path().join("nowhere/python");
    let py312 = fake_python(&tmp.path().join("py312/python"), "3.12", 0);
    let py310 = fake_python(&tmp.path().join("py310/python"), "3.10", 0);

    let mut resolver =
        RuntimeResolver::new(isolated_resolver(&bin, vec![missing, py312.clone(), py310]));
    let handle = with_timeout(resolver.resolve(None, false)).await.unwrap();

    assert_eq!(handle.path, py312);
}

#[tokio::test]
async fn search_path_is_preferred_over_fixed_locations() {
    init_tracing();
    let tmp = tempfile::tempdir().unwrap();
    let bin = tmp.path().join("bin");
    let on_path = fake_python(&bin.join("python3.11"), "3.11", 0);
    let fixed = fake_python(&tmp.path().join("py311/python"), "3.11", 0);

    let mut resolver = RuntimeResolver::new(isolated_resolver(&bin, vec![fixed]));
    let handle = with_timeout(resolver.resolve(Some("3.11"), false)).await.unwrap();

    assert_eq!(handle.path, on_path);
}

/// A stand-in version manager rooted at `home`. `install` appends to
/// `home/installs` and exits `install_exit`; on success it copies `python`
/// into `home/versions/<v>/bin/python`.
fn fake_manager(bin: &Path, home: &Path, python: &Path, install_exit: i32) {
    let home = home.display();
    let python = python.display();
    let body = format!(
        r#"case "$1" in
  prefix)
    [ -x "{home}/versions/$2/bin/python" ] || exit 1
    echo "{home}/versions/$2" ;;
  install)
    echo "$3" >> "{home}/installs"
    [ {install_exit} -eq 0 ] || exit {install_exit}
    mkdir -p "{home}/versions/$3/bin" && cp "{python}" "{home}/versions/$3/bin/python" ;;
  *) exit 1 ;;
esac"#
    );
    write_executable(&bin.join("pyenv"), &body);
}

#[tokio::test]
async fn version_manager_installs_a_missing_version() {
    init_tracing();
    let tmp = tempfile::tempdir().unwrap();
    let bin = tmp.path().join("bin");
    let python = fake_python(&tmp.path().join("dist/python"), "3.11", 0);
    fake_manager(&bin, tmp.path(), &python, 0);

    let mut options = isolated_resolver(&bin, Vec::new());
    options.version_manager = Some("pyenv".to_string());
    let mut resolver = RuntimeResolver::new(options);
    let handle = with_timeout(resolver.resolve(Some("3.11"), true)).await.unwrap();

    assert_eq!(handle.path, tmp.path().join("versions/3.11/bin/python"));
    assert_eq!(fs::read_to_string(tmp.path().join("installs")).unwrap(), "3.11\n");
}

#[tokio::test]
async fn failed_version_manager_install_falls_through() {
    init_tracing();
    let tmp = tempfile::tempdir().unwrap();
    let bin = tmp.path().join("bin");
    let python = fake_python(&tmp.path().join("dist/python"), "3.11", 0);
    fake_manager(&bin, tmp.path(), &python, 1);

    let mut options = isolated_resolver(&bin, Vec::new());
    options.version_manager = Some("pyenv".to_string());
    let mut resolver = RuntimeResolver::new(options);
    let err = with_timeout(resolver.resolve(Some("3.11"), true)).await.unwrap_err();

    assert!(matches!(err, KioskError::RuntimeNotFound(ref v) if v == "3.11"), "got {err:?}");
    assert_eq!(fs::read_to_string(tmp.path().join("installs")).unwrap(), "3.11\n");
    assert!(!tmp.path().join("versions").exists());
}

#[tokio::test]
async fn version_manager_never_installs_offline() {
    init_tracing();
    let tmp = tempfile::tempdir().unwrap();
    let bin = tmp.path().join("bin");
    let python = fake_python(&tmp.path().join("dist/python"), "3.11", 0);
    fake_manager(&bin, tmp.path(), &python, 0);

    let mut options = isolated_resolver(&bin, Vec::new());
    options.version_manager = Some("pyenv".to_string());
    let mut resolver = RuntimeResolver::new(options);
    assert!(with_timeout(resolver.resolve(Some("3.11"), false)).await.is_err());
    assert!(!tmp.path().join("installs").exists());
}
