//! Operation requests shared by one-shot subcommands and `batch` mode.

use anyhow::Result;
use serde::Deserialize;
use serde_json::{json, Value};
use termbridge_core::{ScreenMode, ScriptRunner, TerminalService};

fn default_lines() -> usize {
    100
}

fn default_pages() -> u32 {
    1
}

fn default_execute() -> bool {
    true
}

/// One operation against the session engine.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    ListSessions,
    SetActiveSession {
        session_id: String,
    },
    GetScreen {
        #[serde(default)]
        mode: ScreenMode,
        #[serde(default = "default_lines")]
        lines: usize,
    },
    SendInput {
        text: String,
        #[serde(default = "default_execute")]
        execute: bool,
        #[serde(default)]
        session_id: Option<String>,
    },
    SendKeypress {
        key: String,
        #[serde(default)]
        modifiers: Vec<String>,
        #[serde(default)]
        session_id: Option<String>,
    },
    PasteText {
        text: String,
        #[serde(default)]
        session_id: Option<String>,
    },
    ScrollBack {
        #[serde(default = "default_pages")]
        pages: u32,
        #[serde(default)]
        session_id: Option<String>,
    },
    GetAllTerminalInfo {
        #[serde(default = "default_lines")]
        lines: usize,
    },
    ReadSession {
        session_id: String,
    },
    SessionSummary {
        session_id: String,
        #[serde(default)]
        include_history: bool,
    },
    CommandSuggestion {
        session_id: String,
        #[serde(default)]
        context: String,
    },
    Troubleshoot {
        session_id: String,
    },
    WorkflowGuide,
    History {
        session_id: String,
    },
}

impl Request {
    /// Whether the operation looks sessions up without scanning itself.
    pub fn needs_registry(&self) -> bool {
        !matches!(
            self,
            Request::ListSessions
                | Request::GetScreen { .. }
                | Request::GetAllTerminalInfo { .. }
                | Request::WorkflowGuide
        )
    }
}

/// Run a request and render its result as JSON.
pub async fn execute<R: ScriptRunner>(service: &TerminalService<R>, request: Request) -> Result<Value> {
    let value = match request {
        Request::ListSessions => serde_json::to_value(service.list_sessions().await)?,
        Request::SetActiveSession { session_id } => {
            serde_json::to_value(service.set_active_session(&session_id).await)?
        }
        Request::GetScreen { mode, lines } => {
            serde_json::to_value(service.get_screen(mode, lines).await)?
        }
        Request::SendInput {
            text,
            execute,
            session_id,
        } => serde_json::to_value(
            service
                .send_input(session_id.as_deref(), &text, execute)
                .await,
        )?,
        Request::SendKeypress {
            key,
            modifiers,
            session_id,
        } => serde_json::to_value(
            service
                .send_keypress(session_id.as_deref(), &key, &modifiers)
                .await,
        )?,
        Request::PasteText { text, session_id } => {
            serde_json::to_value(service.paste_text(session_id.as_deref(), &text).await)?
        }
        Request::ScrollBack { pages, session_id } => {
            serde_json::to_value(service.scroll_back(session_id.as_deref(), pages))?
        }
        Request::GetAllTerminalInfo { lines } => {
            serde_json::to_value(service.get_all_terminal_info(lines).await)?
        }
        Request::ReadSession { session_id } => {
            json!({ "content": service.read_session(&session_id).await })
        }
        Request::SessionSummary {
            session_id,
            include_history,
        } => json!({ "content": service.session_summary(&session_id, include_history).await }),
        Request::CommandSuggestion {
            session_id,
            context,
        } => json!({ "content": service.command_suggestion(&session_id, &context).await }),
        Request::Troubleshoot { session_id } => {
            json!({ "content": service.troubleshoot(&session_id).await })
        }
        Request::WorkflowGuide => json!({ "content": service.workflow_guide() }),
        Request::History { session_id } => {
            json!({ "session_id": session_id, "snapshots": service.history(&session_id) })
        }
    };
    Ok(value)
}
