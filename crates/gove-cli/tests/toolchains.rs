use std::fs;

mod common;

use common::{parse_json, Sandbox};

#[test]
fn unknown_release_fails_closed() {
    let sandbox = Sandbox::new("gove-unknown");
    let assert = sandbox
        .gove()
        .args(["--json", "install", "0.1", "--mode", "source"])
        .assert()
        .code(1);
    let payload = parse_json(&assert);
    assert_eq!(payload["status"], "user-error");
    assert_eq!(payload["details"]["code"], "GOVE101");
    assert!(payload["message"]
        .as_str()
        .expect("message")
        .starts_with("gove install"));
    assert!(!sandbox.cache().join("0.1").exists());
}

#[test]
fn installed_versions_are_listed_and_removed() {
    let sandbox = Sandbox::new("gove-list");
    let root = sandbox.seed_version("1.3.2");

    let assert = sandbox
        .gove()
        .args(["--json", "install", "1.3.2", "--mode", "source"])
        .assert()
        .success();
    assert_eq!(parse_json(&assert)["details"]["already_installed"], true);

    let assert = sandbox
        .gove()
        .args(["--json", "list", "--installed"])
        .assert()
        .success();
    assert_eq!(
        parse_json(&assert)["details"]["installed"],
        serde_json::json!(["1.3.2"])
    );

    let assert = sandbox.gove().args(["list", "--installed"]).assert().success();
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout);
    assert!(stdout.starts_with("Installed\n    1.3.2"), "stdout: {stdout}");

    sandbox.gove().args(["uninstall", "1.3.2"]).assert().success();
    assert!(!root.exists());
    sandbox.gove().args(["uninstall", "1.3.2"]).assert().code(1);
}

#[test]
fn corrupted_toolchain_blocks_mkenv() {
    let sandbox = Sandbox::new("gove-corrupt");
    let root = sandbox.seed_version("1.3.2");
    fs::write(root.join("bin/go"), "tampered").expect("tamper");

    let assert = sandbox
        .gove()
        .args(["--json", "mkenv", "dev", "1.3.2"])
        .assert()
        .code(2);
    let payload = parse_json(&assert);
    assert_eq!(payload["status"], "error");
    assert_eq!(payload["details"]["code"], "GOVE104");
    assert!(!sandbox.home().join("dev").exists());
}

#[test]
fn quiet_suppresses_success_output() {
    let sandbox = Sandbox::new("gove-quiet");
    let assert = sandbox.gove().args(["-q", "lsenvs"]).assert().success();
    assert!(assert.get_output().stdout.is_empty());
}
