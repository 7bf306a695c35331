//! Environment checks for `termbridge doctor`.

use crate::bridge::Osascript;
use crate::config::{Config, READONLY_ENV};
use crate::error::BridgeError;
use crate::host::HostVariant;
use serde::Serialize;

/// Wall-clock limit for each host probe.
const PROBE_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckResult {
    pub name: &'static str,
    pub passed: bool,
    pub detail: String,
}

impl CheckResult {
    fn new(name: &'static str, passed: bool, detail: impl Into<String>) -> Self {
        Self {
            name,
            passed,
            detail: detail.into(),
        }
    }
}

/// Run every check against the configured interpreter.
pub async fn run_checks(config: &Config) -> Vec<CheckResult> {
    let runner = Osascript::new(config.program.clone(), PROBE_TIMEOUT_SECS);
    vec![
        check_platform(),
        check_interpreter(&runner).await,
        check_host_apps(&runner).await,
        check_readonly(config.readonly),
        CheckResult::new(
            "Permissions",
            true,
            "grant Accessibility access to the calling app in System Settings → Privacy & Security",
        ),
    ]
}

fn check_platform() -> CheckResult {
    if cfg!(target_os = "macos") {
        CheckResult::new("macOS Platform", true, "running on macOS")
    } else {
        CheckResult::new("macOS Platform", false, "termbridge only works on macOS")
    }
}

async fn check_interpreter(runner: &Osascript) -> CheckResult {
    match runner.run_checked("return 1").await {
        Err(BridgeError::Launch(e)) => {
            CheckResult::new("Interpreter", false, format!("cannot launch interpreter: {e}"))
        }
        _ => CheckResult::new("Interpreter", true, "interpreter can be launched"),
    }
}

async fn check_host_apps(runner: &Osascript) -> CheckResult {
    for host in [HostVariant::TerminalApp, HostVariant::ITerm2] {
        let script = format!(r#"tell application "{}" to get name"#, host.app_name());
        if runner.run_checked(&script).await.is_ok() {
            return CheckResult::new("Terminal Apps", true, format!("{host} is available"));
        }
    }
    CheckResult::new(
        "Terminal Apps",
        false,
        "neither Terminal.app nor iTerm2 is available",
    )
}

fn check_readonly(readonly: bool) -> CheckResult {
    let detail = if readonly {
        "readonly mode enabled: input injection disabled".to_string()
    } else {
        format!("readonly mode disabled: input injection enabled (set {READONLY_ENV}=1 to disable)")
    };
    CheckResult::new("Readonly Mode", true, detail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_interpreter_fails_checks() {
        let config = Config {
            program: "/nonexistent/termbridge-osascript".into(),
            ..Config::default()
        };
        let results = run_checks(&config).await;
        assert_eq!(results.len(), 5);

        let by_name = |n: &str| results.iter().find(|r| r.name == n).unwrap().clone();
        assert!(!by_name("Interpreter").passed);
        assert!(!by_name("Terminal Apps").passed);
        assert!(by_name("Readonly Mode").passed);
        assert!(by_name("Permissions").passed);
        assert_eq!(by_name("macOS Platform").passed, cfg!(target_os = "macos"));
    }

    #[test]
    fn readonly_detail_reflects_state() {
        assert!(check_readonly(true).detail.contains("enabled"));
        assert!(check_readonly(false).detail.contains(READONLY_ENV));
    }
}
