//! Caller-facing operations over a [`TerminalManager`].
//!
//! Every operation answers with a plain value: a `{success, message}` pair
//! or content text, possibly a sentinel. Input injection is refused up
//! front while the readonly toggle is on.

use crate::bridge::ScriptRunner;
use crate::buffer::ContentSnapshot;
use crate::config::{Config, READONLY_ENV};
use crate::error::TermError;
use crate::manager::{TerminalManager, NO_ACTIVE_SESSION};
use crate::registry::{most_recent, SessionRecord};
use crate::tty::most_recent_device;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{info, warn};

pub const NO_RECENT_OUTPUT: &str = "No recent output found";

const WORKFLOW_GUIDE: &str = "\
Working with terminal sessions

Recommended (single call):
1. get_all_terminal_info returns session ids, current contents and
   metadata for every session at once. Prefer it over sequential calls.

Alternative (multiple calls):
1. list_sessions returns the ids, e.g. [\"75294_1\", \"76536_1\"].
2. For each session to examine:
   a) set_active_session(id) switches to it
   b) get_screen reads its current content

Notes:
- Session ids have the form window_id_tab_id (e.g. 75294_1).
- scroll_back reads buffered history without touching the terminal.
- send_input, send_keypress and paste_text are refused while readonly mode is on.
";
pub const NO_ACTIVE_SESSION_AVAILABLE: &str = "No active session available";

/// Lines read by the session resource.
const RESOURCE_LINES: usize = 100;

/// How `get_screen` chooses its session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScreenMode {
    /// The active session, else the most recently seen one.
    #[default]
    Focus,
    /// The session whose tty was written most recently.
    RecentOutput,
    /// Same selection as `Focus`.
    Manual,
}

impl FromStr for ScreenMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "focus" => Ok(ScreenMode::Focus),
            "recent-output" => Ok(ScreenMode::RecentOutput),
            "manual" => Ok(ScreenMode::Manual),
            other => Err(format!("unknown screen mode '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListSessionsResponse {
    pub sessions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionResponse {
    pub success: bool,
    pub message: String,
}

impl ActionResponse {
    fn new(success: bool, message: impl Into<String>) -> Self {
        Self {
            success,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScreenResponse {
    pub mode: ScreenMode,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentResponse {
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionMeta {
    pub name: String,
    pub tty_device: Option<String>,
    pub is_active: bool,
    pub last_activity: f64,
}

impl From<&SessionRecord> for SessionMeta {
    fn from(r: &SessionRecord) -> Self {
        Self {
            name: r.name.clone(),
            tty_device: r.tty_device.clone(),
            is_active: r.is_active,
            last_activity: r.last_activity,
        }
    }
}

/// Everything about every session, captured in one pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TerminalInfo {
    pub session_ids: Vec<String>,
    pub session_contents: BTreeMap<String, String>,
    pub session_info: BTreeMap<String, SessionMeta>,
    pub default_session_id: Option<String>,
    pub total_sessions: usize,
    pub summary: String,
}

/// Which injection operation is being gated, for messages and logs.
#[derive(Debug, Clone, Copy)]
enum Injection {
    Input,
    Keypress,
    Paste,
}

impl Injection {
    fn sent(self, id: &str) -> String {
        match self {
            Injection::Input => format!("Input sent to session {id}"),
            Injection::Keypress => format!("Keypress sent to session {id}"),
            Injection::Paste => format!("Text pasted to session {id}"),
        }
    }

    fn failed(self, id: &str) -> String {
        match self {
            Injection::Input => format!("Failed to send input to session {id}"),
            Injection::Keypress => format!("Failed to send keypress to session {id}"),
            Injection::Paste => format!("Failed to paste text to session {id}"),
        }
    }
}

pub fn readonly_message() -> String {
    format!("Input injection is disabled. Set {READONLY_ENV}=0 to enable.")
}

/// The operations exposed to callers.
pub struct TerminalService<R> {
    manager: TerminalManager<R>,
    readonly: bool,
    device_dir: PathBuf,
    device_prefix: String,
}

impl<R: ScriptRunner> TerminalService<R> {
    pub fn new(manager: TerminalManager<R>, config: &Config) -> Self {
        Self {
            manager,
            readonly: config.readonly,
            device_dir: config.device_dir.clone(),
            device_prefix: config.device_prefix.clone(),
        }
    }

    pub fn manager(&self) -> &TerminalManager<R> {
        &self.manager
    }

    pub fn is_readonly(&self) -> bool {
        self.readonly
    }

    pub async fn list_sessions(&self) -> ListSessionsResponse {
        let sessions: Vec<String> = self.manager.scan().await.iter().map(SessionRecord::id).collect();
        info!(count = sessions.len(), "listed sessions");
        ListSessionsResponse { sessions }
    }

    pub async fn set_active_session(&self, session_id: &str) -> ActionResponse {
        if self.manager.set_active(session_id).await {
            ActionResponse::new(true, format!("Active session set to {session_id}"))
        } else {
            ActionResponse::new(false, format!("Session {session_id} not found"))
        }
    }

    pub async fn get_screen(&self, mode: ScreenMode, lines: usize) -> ScreenResponse {
        match mode {
            ScreenMode::RecentOutput => self.recent_output_screen(lines).await,
            ScreenMode::Focus | ScreenMode::Manual => {
                if self.manager.active().is_none() {
                    let sessions = self.manager.scan().await;
                    if let Some(recent) = most_recent(&sessions) {
                        self.manager.set_active(&recent.id()).await;
                    }
                }
                match self.manager.active() {
                    Some(id) => ScreenResponse {
                        mode,
                        content: self.manager.fetch_current(&id, lines).await,
                        session_id: Some(id),
                    },
                    None => ScreenResponse {
                        mode,
                        content: NO_ACTIVE_SESSION_AVAILABLE.to_string(),
                        session_id: None,
                    },
                }
            }
        }
    }

    async fn recent_output_screen(&self, lines: usize) -> ScreenResponse {
        let mode = ScreenMode::RecentOutput;
        if let Some(device) = most_recent_device(&self.device_dir, &self.device_prefix) {
            let device = device.to_string_lossy();
            let sessions = self.manager.scan().await;
            let matched = sessions
                .iter()
                .find(|s| s.tty_device.as_deref() == Some(&*device));
            if let Some(session) = matched {
                let id = session.id();
                self.manager.set_active(&id).await;
                return ScreenResponse {
                    mode,
                    content: self.manager.fetch_current(&id, lines).await,
                    session_id: Some(id),
                };
            }
        }
        ScreenResponse {
            mode,
            content: NO_RECENT_OUTPUT.to_string(),
            session_id: None,
        }
    }

    pub async fn send_input(
        &self,
        session_id: Option<&str>,
        text: &str,
        execute: bool,
    ) -> ActionResponse {
        let target = match self.gate(Injection::Input, session_id) {
            Ok(id) => id,
            Err(resp) => return resp,
        };
        let result = self.manager.send_text(&target, text, execute).await;
        self.report(Injection::Input, &target, result)
    }

    pub async fn send_keypress(
        &self,
        session_id: Option<&str>,
        key: &str,
        modifiers: &[String],
    ) -> ActionResponse {
        let target = match self.gate(Injection::Keypress, session_id) {
            Ok(id) => id,
            Err(resp) => return resp,
        };
        let result = self.manager.send_keypress(&target, key, modifiers).await;
        self.report(Injection::Keypress, &target, result)
    }

    pub async fn paste_text(&self, session_id: Option<&str>, text: &str) -> ActionResponse {
        let target = match self.gate(Injection::Paste, session_id) {
            Ok(id) => id,
            Err(resp) => return resp,
        };
        let result = self.manager.paste_text(&target, text).await;
        self.report(Injection::Paste, &target, result)
    }

    /// Readonly check, then target resolution.
    fn gate(&self, kind: Injection, session_id: Option<&str>) -> Result<String, ActionResponse> {
        if self.readonly {
            warn!(operation = ?kind, "injection blocked: readonly mode");
            return Err(ActionResponse::new(false, readonly_message()));
        }
        self.manager
            .target_id(session_id)
            .map_err(|_| ActionResponse::new(false, NO_ACTIVE_SESSION))
    }

    fn report(&self, kind: Injection, id: &str, result: Result<bool, TermError>) -> ActionResponse {
        match result {
            Ok(true) => ActionResponse::new(true, kind.sent(id)),
            Ok(false) => ActionResponse::new(false, kind.failed(id)),
            Err(e) => {
                warn!(session_id = id, error = %e, operation = ?kind, "injection failed");
                ActionResponse::new(false, kind.failed(id))
            }
        }
    }

    pub fn scroll_back(&self, session_id: Option<&str>, pages: u32) -> ContentResponse {
        match self.manager.target_id(session_id) {
            Ok(id) => ContentResponse {
                content: self.manager.scroll_back(&id, pages),
                session_id: Some(id),
            },
            Err(_) => ContentResponse {
                content: NO_ACTIVE_SESSION.to_string(),
                session_id: None,
            },
        }
    }

    /// Session ids, contents and metadata for every session in one call.
    pub async fn get_all_terminal_info(&self, lines: usize) -> TerminalInfo {
        let sessions = self.manager.scan().await;

        let mut session_ids = Vec::with_capacity(sessions.len());
        let mut session_contents = BTreeMap::new();
        let mut session_info = BTreeMap::new();
        for session in &sessions {
            let id = session.id();
            let content = self.manager.fetch_current(&id, lines).await;
            session_contents.insert(id.clone(), content);
            session_info.insert(id.clone(), SessionMeta::from(session));
            session_ids.push(id);
        }

        let default_session_id = self
            .manager
            .active()
            .or_else(|| most_recent(&sessions).map(SessionRecord::id));
        let summary = format!(
            "Found {} terminal sessions. Default session: {}",
            sessions.len(),
            default_session_id.as_deref().unwrap_or("None")
        );
        info!(count = sessions.len(), "collected terminal info");

        TerminalInfo {
            session_ids,
            session_contents,
            session_info,
            default_session_id,
            total_sessions: sessions.len(),
            summary,
        }
    }

    /// Buffered snapshots of one session, oldest first.
    pub fn history(&self, session_id: &str) -> Vec<ContentSnapshot> {
        self.manager.buffers().snapshots(session_id)
    }

    /// The `terminal://session/{id}` resource: recent screen text.
    pub async fn read_session(&self, session_id: &str) -> String {
        match self.known(session_id).await {
            Some(_) => self.manager.fetch_current(session_id, RESOURCE_LINES).await,
            None => not_found(session_id),
        }
    }

    pub async fn session_summary(&self, session_id: &str, include_history: bool) -> String {
        let Some(session) = self.known(session_id).await else {
            return not_found(session_id);
        };
        let content = self.manager.fetch_current(session_id, 50).await;

        let mut out = format!("Session: {}\n", session.name);
        out.push_str(&format!(
            "Window ID: {}, Tab ID: {}\n",
            session.window_id, session.tab_id
        ));
        out.push_str(&format!("TTY Device: {}\n", tty_label(&session)));
        out.push_str(&format!("Active: {}\n\n", session.is_active));
        out.push_str(&format!("Recent Content:\n{content}"));
        if include_history {
            let history = self.manager.scroll_back(session_id, 2);
            out.push_str(&format!("\n\nCommand History:\n{history}"));
        }
        out
    }

    pub async fn command_suggestion(&self, session_id: &str, context: &str) -> String {
        if self.known(session_id).await.is_none() {
            return not_found(session_id);
        }
        let content = self.manager.fetch_current(session_id, 20).await;

        let mut out = format!("Based on the current terminal state:\n\nRecent output:\n{content}\n\n");
        if !context.is_empty() {
            out.push_str(&format!("Context: {context}\n\n"));
        }
        out.push_str("Suggested next commands:\n");
        out.push_str("1. Check current directory: `pwd`\n");
        out.push_str("2. List files: `ls -la`\n");
        out.push_str("3. Check process status: `ps aux`\n");
        out.push_str("4. Check disk usage: `df -h`\n");
        out
    }

    /// How the operations fit together when examining sessions.
    pub fn workflow_guide(&self) -> &'static str {
        WORKFLOW_GUIDE
    }

    pub async fn troubleshoot(&self, session_id: &str) -> String {
        let Some(session) = self.known(session_id).await else {
            return not_found(session_id);
        };
        let content = self.manager.fetch_current(session_id, 30).await;
        let lower = content.to_lowercase();

        let mut out = String::from("Terminal Session Analysis:\n\n");
        out.push_str(&format!("Session: {}\n", session.name));
        out.push_str(&format!("TTY Device: {}\n", tty_label(&session)));
        out.push_str(&format!("Active: {}\n\n", session.is_active));
        for (needle, warning) in [
            ("error", "Errors detected in recent output"),
            ("permission denied", "Permission issues detected"),
            ("command not found", "Missing commands detected"),
        ] {
            if lower.contains(needle) {
                out.push_str(&format!("Warning: {warning}\n"));
            }
        }
        out.push_str(&format!("\nRecent output:\n{content}\n\n"));
        out.push_str("Troubleshooting suggestions:\n");
        out.push_str("1. Check if the session is responsive\n");
        out.push_str("2. Verify file permissions\n");
        out.push_str("3. Check if required commands are installed\n");
        out.push_str("4. Restart the terminal session if needed\n");
        out
    }

    async fn known(&self, session_id: &str) -> Option<SessionRecord> {
        self.manager.registry().get(session_id).await
    }
}

fn not_found(session_id: &str) -> String {
    format!("Session {session_id} not found")
}

fn tty_label(session: &SessionRecord) -> &str {
    session.tty_device.as_deref().unwrap_or("Unknown")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::HostVariant;
    use crate::testing::FakeRunner;
    use std::fs::File;
    use std::time::{Duration, SystemTime};

    const TWO_TABS: &str =
        "75081, 1, Terminal, /dev/ttys000, false, 74477, 1, Terminal, /dev/ttys001, false";

    fn host_with_tabs() -> FakeRunner {
        FakeRunner::new(|script| {
            if script.contains("sessionList") {
                TWO_TABS.to_string()
            } else if script.contains("return i as string") {
                "1".to_string()
            } else if script.contains("get contents") {
                "$ make\nerror: permission denied".to_string()
            } else {
                String::new()
            }
        })
    }

    fn service_with(runner: FakeRunner, config: Config) -> TerminalService<FakeRunner> {
        let manager = TerminalManager::new(runner, HostVariant::TerminalApp, &config);
        TerminalService::new(manager, &config)
    }

    fn service(runner: FakeRunner) -> TerminalService<FakeRunner> {
        service_with(runner, Config::default())
    }

    #[tokio::test]
    async fn list_sessions_returns_ids() {
        let svc = service(host_with_tabs());
        let resp = svc.list_sessions().await;
        assert_eq!(resp.sessions, vec!["75081_1", "74477_1"]);
    }

    #[tokio::test]
    async fn set_active_unknown_keeps_previous() {
        let svc = service(host_with_tabs());
        svc.list_sessions().await;

        let ok = svc.set_active_session("74477_1").await;
        assert!(ok.success);
        assert_eq!(ok.message, "Active session set to 74477_1");

        let bad = svc.set_active_session("1_9").await;
        assert!(!bad.success);
        assert_eq!(bad.message, "Session 1_9 not found");
        assert_eq!(svc.manager().active().as_deref(), Some("74477_1"));
    }

    #[tokio::test]
    async fn focus_picks_a_session_when_none_active() {
        let svc = service(host_with_tabs());
        let resp = svc.get_screen(ScreenMode::Focus, 1).await;
        assert_eq!(resp.session_id.as_deref(), Some("75081_1"));
        assert_eq!(resp.content, "error: permission denied");
        assert_eq!(svc.manager().active().as_deref(), Some("75081_1"));
    }

    #[tokio::test]
    async fn focus_without_sessions() {
        let svc = service(FakeRunner::silent());
        let resp = svc.get_screen(ScreenMode::Manual, 10).await;
        assert_eq!(resp.content, NO_ACTIVE_SESSION_AVAILABLE);
        assert_eq!(resp.session_id, None);
        assert_eq!(resp.mode, ScreenMode::Manual);
    }

    fn touch(dir: &std::path::Path, name: &str, age_secs: u64) {
        let f = File::create(dir.join(name)).unwrap();
        f.set_modified(SystemTime::now() - Duration::from_secs(age_secs))
            .unwrap();
    }

    #[tokio::test]
    async fn recent_output_without_match_leaves_active_alone() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "ttys009", 0);
        let config = Config {
            device_dir: dir.path().to_path_buf(),
            ..Config::default()
        };
        let svc = service_with(host_with_tabs(), config);
        svc.list_sessions().await;
        svc.set_active_session("74477_1").await;

        let resp = svc.get_screen(ScreenMode::RecentOutput, 10).await;
        assert_eq!(resp.content, NO_RECENT_OUTPUT);
        assert_eq!(resp.session_id, None);
        assert_eq!(svc.manager().active().as_deref(), Some("74477_1"));
    }

    #[tokio::test]
    async fn recent_output_selects_matching_session() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "ttys000", 60);
        touch(dir.path(), "ttys001", 0);
        let device = dir.path().join("ttys001").to_string_lossy().to_string();
        let runner = FakeRunner::new(move |script| {
            if script.contains("sessionList") {
                format!("1, 1, a, /dev/ttys000, false, 2, 1, b, {device}, true")
            } else if script.contains("get contents") {
                "hello".to_string()
            } else {
                String::new()
            }
        });
        let config = Config {
            device_dir: dir.path().to_path_buf(),
            ..Config::default()
        };
        let svc = service_with(runner, config);

        let resp = svc.get_screen(ScreenMode::RecentOutput, 10).await;
        assert_eq!(resp.session_id.as_deref(), Some("2_1"));
        assert_eq!(resp.content, "hello");
        assert_eq!(svc.manager().active().as_deref(), Some("2_1"));
    }

    #[tokio::test]
    async fn readonly_blocks_every_injection() {
        let config = Config {
            readonly: true,
            ..Config::default()
        };
        let svc = service_with(host_with_tabs(), config);
        svc.list_sessions().await;
        let before = svc.manager().runner().call_count();

        let responses = [
            svc.send_input(Some("75081_1"), "rm -rf /tmp/x", true).await,
            svc.send_keypress(Some("75081_1"), "return", &[]).await,
            svc.paste_text(Some("75081_1"), "text").await,
        ];
        for resp in responses {
            assert!(!resp.success);
            assert!(resp.message.contains("MCP_TERMINAL_READONLY"));
        }
        assert_eq!(svc.manager().runner().call_count(), before);
    }

    #[tokio::test]
    async fn injection_needs_a_target() {
        let svc = service(host_with_tabs());
        let resp = svc.send_input(None, "ls", true).await;
        assert!(!resp.success);
        assert_eq!(resp.message, NO_ACTIVE_SESSION);
    }

    #[tokio::test]
    async fn injection_reports_per_session() {
        let svc = service(host_with_tabs());
        svc.list_sessions().await;
        svc.set_active_session("75081_1").await;

        let sent = svc.send_input(None, "ls", true).await;
        assert!(sent.success);
        assert_eq!(sent.message, "Input sent to session 75081_1");

        let missing = svc.paste_text(Some("9_9"), "x").await;
        assert!(!missing.success);
        assert_eq!(missing.message, "Failed to paste text to session 9_9");
    }

    #[tokio::test]
    async fn scroll_back_reads_history() {
        let svc = service(host_with_tabs());
        assert_eq!(svc.scroll_back(None, 1).content, NO_ACTIVE_SESSION);

        svc.get_screen(ScreenMode::Focus, 10).await;
        svc.get_screen(ScreenMode::Focus, 10).await;
        let resp = svc.scroll_back(None, 1);
        assert_eq!(resp.session_id.as_deref(), Some("75081_1"));
        assert_eq!(
            resp.content,
            "$ make\nerror: permission denied\n$ make\nerror: permission denied"
        );
        assert_eq!(svc.history("75081_1").len(), 2);
    }

    #[tokio::test]
    async fn all_terminal_info_snapshot() {
        let svc = service(host_with_tabs());
        let info = svc.get_all_terminal_info(1).await;
        assert_eq!(info.total_sessions, 2);
        assert_eq!(info.session_ids, vec!["75081_1", "74477_1"]);
        assert_eq!(info.session_contents["74477_1"], "error: permission denied");
        assert_eq!(
            info.session_info["75081_1"].tty_device.as_deref(),
            Some("/dev/ttys000")
        );
        assert_eq!(info.default_session_id.as_deref(), Some("75081_1"));
        assert!(info.summary.starts_with("Found 2 terminal sessions"));
        // Collecting info never changes the active session.
        assert_eq!(svc.manager().active(), None);
    }

    #[tokio::test]
    async fn prompts_report_unknown_sessions() {
        let svc = service(FakeRunner::silent());
        assert_eq!(svc.read_session("1_1").await, "Session 1_1 not found");
        assert_eq!(svc.troubleshoot("1_1").await, "Session 1_1 not found");
        assert_eq!(svc.session_summary("1_1", true).await, "Session 1_1 not found");
        assert_eq!(svc.command_suggestion("1_1", "").await, "Session 1_1 not found");
    }

    #[tokio::test]
    async fn troubleshoot_flags_known_problems() {
        let svc = service(host_with_tabs());
        svc.list_sessions().await;
        let report = svc.troubleshoot("75081_1").await;
        assert!(report.contains("Errors detected"));
        assert!(report.contains("Permission issues"));
        assert!(!report.contains("Missing commands"));
        assert!(report.contains("TTY Device: /dev/ttys000"));
    }

    #[tokio::test]
    async fn summary_with_history() {
        let svc = service(host_with_tabs());
        svc.list_sessions().await;
        let summary = svc.session_summary("74477_1", true).await;
        assert!(summary.starts_with("Session: Terminal\n"));
        assert!(summary.contains("Window ID: 74477, Tab ID: 1"));
        assert!(summary.contains("Command History:\n$ make"));
    }

    #[test]
    fn workflow_guide_names_the_operations() {
        let svc = service(FakeRunner::silent());
        let guide = svc.workflow_guide();
        for op in ["get_all_terminal_info", "list_sessions", "set_active_session", "get_screen"] {
            assert!(guide.contains(op), "guide should mention {op}");
        }
        assert!(guide.contains("window_id_tab_id"));
    }

    #[test]
    fn screen_mode_parsing() {
        assert_eq!("recent-output".parse::<ScreenMode>().unwrap(), ScreenMode::RecentOutput);
        assert!("nope".parse::<ScreenMode>().is_err());
        assert_eq!(
            serde_json::to_string(&ScreenMode::RecentOutput).unwrap(),
            "\"recent-output\""
        );
    }
}
