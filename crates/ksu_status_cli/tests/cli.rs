pub mod common;

use std::fs::read_to_string;

use assert_cmd::Command;
use indoc::indoc;
use predicates::prelude::*;
use tempfile::{TempDir, tempdir};

use crate::common::{prepare_args, print, write_file};

const MANAGER_FIXTURE: &str = indoc! {r#"
    {
        "is_manager": true,
        "kernel_version": "5.10.43",
        "native_version": 12,
        "minimal_supported_version": 11,
        "root_available": true,
        "lkm_mode": false
    }
"#};

const APP_FIXTURE: &str = indoc! {r#"
    {
        "is_manager": false,
        "kernel_version": "4.19.157",
        "native_version": 12,
        "minimal_supported_version": 11,
        "root_available": false
    }
"#};

/// A temporary directory with a fixture, dropped when the test completes.
struct Context {
    temp_dir: TempDir,
    fixture_arg: String,
}

impl Context {
    fn new(fixture: &str) -> Self {
        let temp_dir = tempdir().unwrap();
        let fixture_path = write_file(temp_dir.path(), "fixture.json", fixture);
        let fixture_arg = format!("--fixture {}", fixture_path.to_str().unwrap());

        Self {
            temp_dir,
            fixture_arg,
        }
    }
}

fn command() -> Command {
    Command::new(env!("CARGO_BIN_EXE_ksu_status"))
}

#[test]
fn show_prints_every_signal() {
    // given
    let ctx = Context::new(MANAGER_FIXTURE);

    // when
    command()
        .args(prepare_args(vec![ctx.fixture_arg.as_str(), "show"]))
        // then
        .assert()
        .success()
        .stderr(print("stderr"))
        .stdout(print("stdout"))
        .stdout(predicate::str::diff(indoc! {"
            is_manager: true
            kernel_version: 5.10.43
            native_ksu_version: 12
            is_root_available: true
            is_safe_mode: false
            native_is_lkm_mode: false
            ksu_version: 12
            request_new_kernel: false
            is_full_featured: true
            is_lkm_mode: false
        "}));
}

#[test]
fn show_reports_absent_values() {
    // given
    let ctx = Context::new(APP_FIXTURE);

    // when
    command()
        .args(prepare_args(vec![
            ctx.fixture_arg.as_str(),
            "show",
            "--signal ksu_version",
            "--signal is_lkm_mode",
        ]))
        // then
        .assert()
        .success()
        .stderr(print("stderr"))
        .stdout(print("stdout"))
        .stdout(predicate::str::diff("ksu_version: absent\nis_lkm_mode: absent\n"));
}

#[test]
fn show_as_json() {
    // given
    let ctx = Context::new(MANAGER_FIXTURE);

    // when
    let assert = command()
        .args(prepare_args(vec![
            ctx.fixture_arg.as_str(),
            "show",
            "--format json",
            "--signal ksu_version",
            "--signal kernel_version",
            "--signal is_lkm_mode",
        ]))
        .assert()
        .success()
        .stderr(print("stderr"));

    // then
    let output: serde_json::Value = serde_json::from_slice(&assert.get_output().stdout).unwrap();
    assert_eq!(
        output,
        serde_json::json!({
            "ksu_version": 12,
            "kernel_version": "5.10.43",
            "is_lkm_mode": false,
        })
    );
}

#[test]
fn watch_prints_each_emission() {
    // given
    let ctx = Context::new(MANAGER_FIXTURE);

    // when
    command()
        .args(prepare_args(vec![
            ctx.fixture_arg.as_str(),
            "watch",
            "--signal is_full_featured",
            "--signal request_new_kernel",
            "--set native_ksu_version=9",
            "--set native_ksu_version=9",
            "--set native_ksu_version=13",
        ]))
        // then
        .assert()
        .success()
        .stderr(print("stderr"))
        .stdout(print("stdout"))
        .stdout(predicate::str::diff(indoc! {"
            is_full_featured: true
            request_new_kernel: false
            request_new_kernel: true
            is_full_featured: false
            request_new_kernel: false
            is_full_featured: true
        "}));
}

#[test]
fn watch_atomic_applies_updates_as_one_change() {
    // given
    let ctx = Context::new(APP_FIXTURE);

    // when
    command()
        .args(prepare_args(vec![
            ctx.fixture_arg.as_str(),
            "watch",
            "--signal is_full_featured",
            "--atomic",
            "--set is_manager=true",
            "--set is_root_available=true",
        ]))
        // then
        .assert()
        .success()
        .stderr(print("stderr"))
        .stdout(print("stdout"))
        .stdout(predicate::str::diff("is_full_featured: false\nis_full_featured: true\n"));
}

#[test]
fn watch_rejects_updates_to_derived_signals() {
    // given
    let ctx = Context::new(MANAGER_FIXTURE);

    // when
    command()
        .args(prepare_args(vec![ctx.fixture_arg.as_str(), "watch", "--set ksu_version=1"]))
        // then
        .assert()
        .failure()
        .stderr(print("stderr"))
        .stderr(predicate::str::contains("Signal is derived and cannot be updated"));
}

#[test]
fn check_succeeds_with_a_version() {
    // given
    let ctx = Context::new(MANAGER_FIXTURE);

    // when
    command()
        .args(prepare_args(vec![ctx.fixture_arg.as_str(), "check"]))
        // then
        .assert()
        .success()
        .stdout(print("stdout"))
        .stdout(predicate::str::diff("ksu_version: 12\n"));
}

#[test]
fn check_fails_without_a_version() {
    // given
    let ctx = Context::new(APP_FIXTURE);

    // when
    command()
        .args(prepare_args(vec![ctx.fixture_arg.as_str(), "check"]))
        // then
        .assert()
        .code(1)
        .stdout(print("stdout"))
        .stdout(predicate::str::contains("not available"));
}

#[test]
fn missing_fixture_is_reported() {
    // given
    let temp_dir = tempdir().unwrap();
    let fixture_arg = format!("--fixture {}", temp_dir.path().join("missing.json").to_str().unwrap());

    // when
    command()
        .args(prepare_args(vec![fixture_arg.as_str(), "show"]))
        // then
        .assert()
        .failure()
        .stderr(print("stderr"))
        .stderr(predicate::str::contains("Unable to read accessor fixture"));
}

#[test]
fn procfs_host_without_the_kernel_component() {
    // given
    let temp_dir = tempdir().unwrap();
    write_file(temp_dir.path(), "sys/kernel/osrelease", "5.15.94-android14-11\n");
    write_file(temp_dir.path(), "self/status", "Name:\tksu_status\nUid:\t0\t0\t0\t0\n");
    let proc_root_arg = format!("--proc-root {}", temp_dir.path().to_str().unwrap());

    // when
    command()
        .args(prepare_args(vec![
            proc_root_arg.as_str(),
            "show",
            "--signal kernel_version",
            "--signal is_root_available",
            "--signal ksu_version",
        ]))
        // then
        .assert()
        .success()
        .stderr(print("stderr"))
        .stdout(print("stdout"))
        .stdout(predicate::str::diff(indoc! {"
            kernel_version: 5.15.94
            is_root_available: true
            ksu_version: absent
        "}));
}

#[test]
fn trace_log_records_graph_creation() {
    // given
    let ctx = Context::new(MANAGER_FIXTURE);
    let trace_log_path = ctx.temp_dir.path().join("trace.log");
    let trace_arg = format!("--trace {}", trace_log_path.to_str().unwrap());

    // when
    command()
        .args(prepare_args(vec![
            trace_arg.as_str(),
            ctx.fixture_arg.as_str(),
            "-v",
            "watch",
            "--set is_safe_mode=true",
        ]))
        // then
        .assert()
        .success()
        .stderr(print("stderr"))
        .stderr(predicate::str::contains("Loaded accessor fixture"));

    // and
    let trace_content = read_to_string(trace_log_path).unwrap();
    println!("{}", trace_content);
    assert!(trace_content.contains("Created status graph"));
    assert!(trace_content.contains("Watch complete. changed: 1"));
}

#[test]
fn arguments_from_a_file() {
    // given
    let ctx = Context::new(MANAGER_FIXTURE);
    let fixture_path = ctx.temp_dir.path().join("fixture.json");
    let args_path = write_file(
        ctx.temp_dir.path(),
        "args.txt",
        &format!("--fixture\n{}\nshow\n--signal\nis_full_featured\n", fixture_path.to_str().unwrap()),
    );

    // when
    command()
        .arg(format!("@{}", args_path.to_str().unwrap()))
        // then
        .assert()
        .success()
        .stderr(print("stderr"))
        .stdout(print("stdout"))
        .stdout(predicate::str::diff("is_full_featured: true\n"));
}
