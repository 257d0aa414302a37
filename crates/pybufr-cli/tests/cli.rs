//! End-to-end tests of the `pybufr` binary.
//!
//! Only commands that need neither network access nor a Fortran toolchain
//! are exercised here.

use pretty_assertions::assert_eq;
use std::fs;
use std::process::{Command, Output};

fn pybufr(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_pybufr"))
        .args(args)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .env_remove("PYBUFR_WORK_DIR")
        .env_remove("PYBUFR_LISTING_URL")
        .env_remove("PYBUFR_F2PY")
        .output()
        .expect("failed to run pybufr binary")
}

const SIGNATURES: &str = "\
python module ecmwfbufr
    interface
        subroutine bus012(kbufl,kbuff,ksup,ksec0,ksec1,ksec2,kerr)
            integer dimension(jsup) :: ksup
            integer dimension(jsec0) :: ksec0
        end subroutine bus012
    end interface
end python module ecmwfbufr
";

#[test]
fn test_patch_rewrites_file_and_keeps_backup() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("signatures.pyf");
    fs::write(&path, SIGNATURES).unwrap();

    let output = pybufr(&["patch", path.to_str().unwrap()]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("Patched in place"));

    let patched = fs::read_to_string(&path).unwrap();
    assert!(patched.contains("integer dimension(9) :: ksup"));
    assert!(patched.contains("integer dimension(3) :: ksec0"));
    assert_eq!(
        fs::read_to_string(dir.path().join("signatures.pyf.bak")).unwrap(),
        SIGNATURES
    );
}

#[test]
fn test_patch_json_summary() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("signatures.pyf");
    fs::write(&path, SIGNATURES).unwrap();

    let output = pybufr(&["patch", "--json", path.to_str().unwrap()]);
    assert!(output.status.success());

    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["lines_changed"], 2);
    assert_eq!(summary["substitutions"], 2);
}

#[test]
fn test_patch_missing_file_reports_code() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.pyf");

    let output = pybufr(&["patch", path.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("[filesystem/PYBUFR_011]"), "{}", stderr);
}

#[test]
fn test_install_short_circuits_when_module_present() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("ecmwfbufr.so"), b"").unwrap();

    let output = pybufr(&["install", "--json", "--work-dir", dir.path().to_str().unwrap()]);
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["stage"], "ready");
    assert_eq!(report["already_installed"], true);
    assert!(report["build_config"].is_null());
    assert!(!dir.path().join("ecmwf_bufr_lib").exists());
}

#[test]
fn test_install_rejects_bad_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("pybufr.json");
    fs::write(&config, "{ not json").unwrap();

    let output = pybufr(&["install", "--config", config.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("PYBUFR_015"), "{}", stderr);
}
