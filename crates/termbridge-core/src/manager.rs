//! The session engine: registry, buffers and the active-session pointer,
//! bound to one scripting bridge and host variant.

use crate::bridge::ScriptRunner;
use crate::buffer::{BufferSet, ContentSnapshot};
use crate::config::Config;
use crate::dispatch;
use crate::error::{TermError, TermResult};
use crate::host::HostVariant;
use crate::registry::{unix_now, SessionRecord, SessionRegistry};
use crate::script;
use std::sync::{PoisonError, RwLock};
use tracing::{debug, info, warn};

/// Content the host prints when a tab cannot be read; never buffered.
pub const UNABLE_TO_RETRIEVE: &str = "Unable to retrieve terminal content";

pub const NO_ACTIVE_SESSION: &str = "No active session set";

/// Owns all mutable session state. Share it behind an `Arc`.
pub struct TerminalManager<R> {
    runner: R,
    host: HostVariant,
    registry: SessionRegistry,
    buffers: BufferSet,
    active: RwLock<Option<String>>,
}

impl<R: ScriptRunner> TerminalManager<R> {
    pub fn new(runner: R, host: HostVariant, config: &Config) -> Self {
        Self {
            runner,
            host,
            registry: SessionRegistry::new(config.scan_interval),
            buffers: BufferSet::new(config.buffer_capacity),
            active: RwLock::new(None),
        }
    }

    pub fn host(&self) -> HostVariant {
        self.host
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn buffers(&self) -> &BufferSet {
        &self.buffers
    }

    /// Refresh (or reuse) the session list.
    pub async fn scan(&self) -> Vec<SessionRecord> {
        self.registry.scan(&self.runner, self.host).await
    }

    /// Read a session's screen, buffer it, and return its last `lines` lines.
    ///
    /// `lines == 0` returns the whole capture.
    pub async fn fetch_current(&self, session_id: &str, lines: usize) -> String {
        let Some(session) = self.registry.get(session_id).await else {
            return format!("Session {session_id} not found");
        };

        let script = self.content_script(&session).await;
        let content = self.runner.run(&script).await;

        if !content.is_empty() && content != UNABLE_TO_RETRIEVE {
            self.buffers
                .append(ContentSnapshot::new(session_id, content.as_str(), unix_now()));
        }

        last_lines(&content, lines)
    }

    async fn content_script(&self, session: &SessionRecord) -> String {
        match self.host {
            HostVariant::TerminalApp => {
                let found = self
                    .runner
                    .run(&script::terminal_window_index(&session.window_id))
                    .await;
                match found.trim().parse::<u32>() {
                    Ok(window_index) => {
                        let tab_index = session.tab_id.parse::<u32>().unwrap_or(1);
                        script::terminal_contents(window_index, tab_index)
                    }
                    Err(_) => {
                        debug!(window_id = %session.window_id, "window lookup failed, reading first window");
                        script::terminal_contents(1, 1)
                    }
                }
            }
            HostVariant::ITerm2 => script::iterm_contents(&session.window_id, &session.tab_id),
        }
    }

    /// Track `session_id` as current. Unknown ids leave the pointer alone.
    pub async fn set_active(&self, session_id: &str) -> bool {
        if !self.registry.contains(session_id).await {
            warn!(session_id, "session not found");
            return false;
        }
        *self.active.write().unwrap_or_else(PoisonError::into_inner) = Some(session_id.to_string());
        info!(session_id, "active session set");
        true
    }

    pub fn active(&self) -> Option<String> {
        self.active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub async fn active_content(&self, lines: usize) -> String {
        match self.active() {
            Some(id) => self.fetch_current(&id, lines).await,
            None => NO_ACTIVE_SESSION.to_string(),
        }
    }

    /// Explicit id if given, otherwise the active one.
    pub fn target_id(&self, session_id: Option<&str>) -> TermResult<String> {
        session_id
            .map(str::to_string)
            .or_else(|| self.active())
            .ok_or(TermError::NoActiveSession)
    }

    async fn resolve(&self, session_id: &str) -> TermResult<SessionRecord> {
        self.registry
            .get(session_id)
            .await
            .ok_or_else(|| TermError::SessionNotFound(session_id.to_string()))
    }

    pub async fn send_text(&self, session_id: &str, text: &str, execute: bool) -> TermResult<bool> {
        let session = self.resolve(session_id).await?;
        Ok(dispatch::send_text(&self.runner, self.host, &session, text, execute).await)
    }

    pub async fn send_keypress(
        &self,
        session_id: &str,
        key: &str,
        modifiers: &[String],
    ) -> TermResult<bool> {
        let session = self.resolve(session_id).await?;
        Ok(dispatch::send_keypress(&self.runner, self.host, &session, key, modifiers).await)
    }

    pub async fn paste_text(&self, session_id: &str, text: &str) -> TermResult<bool> {
        let session = self.resolve(session_id).await?;
        Ok(dispatch::paste_text(&self.runner, self.host, &session, text).await)
    }

    /// Buffered history for a session; never touches the host.
    pub fn scroll_back(&self, session_id: &str, pages: u32) -> String {
        self.buffers.scroll_back(session_id, pages)
    }
}

fn last_lines(content: &str, n: usize) -> String {
    let lines: Vec<&str> = content.split('\n').collect();
    let start = if n == 0 { 0 } else { lines.len().saturating_sub(n) };
    lines[start..].join("\n")
}
