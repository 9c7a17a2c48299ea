//! CLI contract tests.

use assert_cmd::Command;
use tempfile::TempDir;

/// Command wired to an isolated database and config path.
fn wa_inbox(dir: &TempDir) -> Command {
    let mut cmd = match Command::cargo_bin("wa-inbox") {
        Ok(cmd) => cmd,
        Err(err) => panic!("binary should build: {err}"),
    };
    let db_url = format!("sqlite://{}", dir.path().join("inbox.db").display());
    cmd.current_dir(dir.path())
        .env("WA_INBOX_CONFIG_PATH", dir.path().join("missing.toml"))
        .env("WA_INBOX_DATABASE_URL", db_url)
        .env("EVOLUTION_API_URL", "https://evo.example.com")
        .env("EVOLUTION_API_KEY", "cli-secret")
        .env_remove("WA_INBOX_LOG_DIR")
        .env("RUST_LOG", "warn");
    cmd
}

fn stdout_json(output: &std::process::Output) -> serde_json::Value {
    match serde_json::from_slice(&output.stdout) {
        Ok(value) => value,
        Err(err) => panic!("stdout should be JSON: {err}"),
    }
}

#[test]
fn phone_prints_leading_digits() {
    let dir = TempDir::new().expect("tempdir");
    wa_inbox(&dir)
        .args(["phone", "5511999999999@s.whatsapp.net"])
        .assert()
        .success()
        .stdout("5511999999999\n");
}

#[test]
fn phone_prints_empty_line_for_non_jid() {
    let dir = TempDir::new().expect("tempdir");
    wa_inbox(&dir)
        .args(["phone", "abc"])
        .assert()
        .success()
        .stdout("\n");
}

#[test]
fn show_unknown_conversation_prints_failure_body() {
    let dir = TempDir::new().expect("tempdir");
    wa_inbox(&dir).arg("init").assert().success();

    let output = wa_inbox(&dir)
        .args(["show", "conv-404", "--company", "co-1"])
        .output()
        .expect("command should run");

    assert!(output.status.success());
    let body = stdout_json(&output);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "conversation not found or inaccessible");
}

#[test]
fn send_to_unknown_conversation_prints_failure_body() {
    let dir = TempDir::new().expect("tempdir");
    wa_inbox(&dir).arg("init").assert().success();

    let output = wa_inbox(&dir)
        .args(["send", "conv-404", "--content", "hello"])
        .output()
        .expect("command should run");

    let body = stdout_json(&output);
    assert_eq!(body["success"], false);
    assert!(body["details"].is_string());
}

#[test]
fn send_location_without_content_reaches_the_database() {
    let dir = TempDir::new().expect("tempdir");
    wa_inbox(&dir).arg("init").assert().success();

    let output = wa_inbox(&dir)
        .args(["send", "conv-404", "--type", "location"])
        .output()
        .expect("command should run");

    let body = stdout_json(&output);
    assert_eq!(body["success"], false);
    assert!(body["error"]
        .as_str()
        .is_some_and(|e| e.starts_with("failed to save message")));
}

#[test]
fn send_rejects_non_object_attachment() {
    let dir = TempDir::new().expect("tempdir");
    wa_inbox(&dir)
        .args(["send", "conv-1", "--attachment", "[1, 2]"])
        .assert()
        .failure();
}
