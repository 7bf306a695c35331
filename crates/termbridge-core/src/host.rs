//! Host terminal applications and their detection.

use crate::bridge::ScriptRunner;
use std::fmt;
use std::str::FromStr;
use tracing::info;

/// The terminal application being driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostVariant {
    /// Apple Terminal.app: exposes tty and busy state per tab.
    TerminalApp,
    /// iTerm2: exposes ids and names only.
    ITerm2,
}

impl HostVariant {
    /// Application name as used in `tell application` and System Events.
    pub fn app_name(self) -> &'static str {
        match self {
            HostVariant::TerminalApp => "Terminal",
            HostVariant::ITerm2 => "iTerm2",
        }
    }

    /// Number of fields per record in enumeration output.
    pub fn stride(self) -> usize {
        match self {
            HostVariant::TerminalApp => 5,
            HostVariant::ITerm2 => 3,
        }
    }

    /// Probe the running system and pick a variant.
    ///
    /// iTerm2 wins only if System Events sees its process *and* iTerm2
    /// itself answers a window query. Anything else means Terminal.app.
    pub async fn detect<R: ScriptRunner>(runner: &R) -> Self {
        let process_probe = runner.run(ITERM_PROCESS_PROBE).await;
        if process_probe.contains("iTerm2") {
            let app_probe = runner.run(ITERM_APP_PROBE).await;
            if app_probe.contains("iTerm2") {
                info!("detected iTerm2");
                return HostVariant::ITerm2;
            }
        }
        info!("using Apple Terminal");
        HostVariant::TerminalApp
    }
}

impl fmt::Display for HostVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.app_name())
    }
}

/// A host choice from config or CLI: a fixed variant or auto-detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HostChoice {
    #[default]
    Auto,
    Fixed(HostVariant),
}

impl FromStr for HostChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" | "" => Ok(HostChoice::Auto),
            "terminal" | "terminal.app" | "apple_terminal" => {
                Ok(HostChoice::Fixed(HostVariant::TerminalApp))
            }
            "iterm" | "iterm2" | "iterm.app" => Ok(HostChoice::Fixed(HostVariant::ITerm2)),
            other => Err(format!("unknown host application '{other}'")),
        }
    }
}

impl HostChoice {
    pub async fn resolve<R: ScriptRunner>(self, runner: &R) -> HostVariant {
        match self {
            HostChoice::Auto => HostVariant::detect(runner).await,
            HostChoice::Fixed(v) => v,
        }
    }
}

const ITERM_PROCESS_PROBE: &str = r#"
tell application "System Events"
    try
        get name of every process whose name contains "iTerm"
        return "iTerm2"
    on error
        return "Terminal"
    end try
end tell
"#;

const ITERM_APP_PROBE: &str = r#"
tell application "iTerm2"
    try
        get name of windows
        return "iTerm2"
    on error
        return "Terminal"
    end try
end tell
"#;
