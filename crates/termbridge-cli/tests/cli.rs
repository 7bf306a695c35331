use assert_cmd::Command;
use std::path::PathBuf;

/// A config whose interpreter cannot be launched, so no host is touched.
fn offline_config(dir: &tempfile::TempDir) -> PathBuf {
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        "[bridge]\nprogram = \"/nonexistent/termbridge-osascript\"\n\n[host]\napp = \"terminal\"\n",
    )
    .unwrap();
    path
}

fn termbridge(config: &PathBuf) -> Command {
    let mut cmd = Command::cargo_bin("termbridge").unwrap();
    cmd.env_remove("MCP_TERMINAL_READONLY")
        .arg("--config")
        .arg(config);
    cmd
}

fn stdout_json(output: &std::process::Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn list_without_host_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let config = offline_config(&dir);
    let output = termbridge(&config).arg("list").output().unwrap();
    assert!(output.status.success());
    assert_eq!(stdout_json(&output), serde_json::json!({ "sessions": [] }));
}

#[test]
fn readonly_env_blocks_send() {
    let dir = tempfile::tempdir().unwrap();
    let config = offline_config(&dir);
    let output = termbridge(&config)
        .env("MCP_TERMINAL_READONLY", "1")
        .args(["send", "ls", "--session", "1_1"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["success"], false);
    assert!(json["message"]
        .as_str()
        .unwrap()
        .contains("MCP_TERMINAL_READONLY"));
}

#[test]
fn screen_without_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let config = offline_config(&dir);
    let output = termbridge(&config)
        .args(["screen", "--mode", "focus"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["content"], "No active session available");
    assert_eq!(json["mode"], "focus");
}

#[test]
fn batch_answers_each_line() {
    let dir = tempfile::tempdir().unwrap();
    let config = offline_config(&dir);
    let input = "{\"op\":\"list_sessions\"}\n\n{\"op\":\"scroll_back\",\"session_id\":\"1_1\"}\nnot json\n";
    let output = termbridge(&config)
        .arg("batch")
        .write_stdin(input)
        .output()
        .unwrap();
    assert!(output.status.success());

    let lines: Vec<serde_json::Value> = String::from_utf8(output.stdout)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0]["sessions"], serde_json::json!([]));
    assert_eq!(lines[1]["content"], "No buffer available for this session");
    assert!(lines[2]["error"].as_str().unwrap().starts_with("invalid request"));
}

#[test]
fn bad_config_exits_nonzero() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[host]\napp = \"kitty\"\n").unwrap();
    let output = termbridge(&path).arg("list").output().unwrap();
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn guide_prints_workflow() {
    let dir = tempfile::tempdir().unwrap();
    let config = offline_config(&dir);
    let output = termbridge(&config).arg("guide").output().unwrap();
    assert!(output.status.success());
    let json = stdout_json(&output);
    assert!(json["content"]
        .as_str()
        .unwrap()
        .contains("get_all_terminal_info"));
}
