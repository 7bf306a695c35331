//! Session registry: TTL-cached discovery of host windows and tabs.
//!
//! Entries are only ever added or refreshed. A tab that disappears from the
//! host keeps its last known record for the lifetime of the process.

use crate::bridge::ScriptRunner;
use crate::error::ParseError;
use crate::host::HostVariant;
use crate::parser::{parse_sessions, ParsedSession};
use crate::script;
use serde::Serialize;
use std::collections::HashMap;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Default time-to-live of a scan result.
pub const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_secs(2);

/// Name given to records synthesized by the fallback probes.
pub const PLACEHOLDER_NAME: &str = "Terminal Session";

/// Metadata for one window/tab pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionRecord {
    pub window_id: String,
    pub tab_id: String,
    pub name: String,
    pub tty_device: Option<String>,
    /// Seconds since the Unix epoch of the last scan that saw this tab.
    pub last_activity: f64,
    pub is_active: bool,
}

impl SessionRecord {
    /// Composite identity key, `<window>_<tab>`.
    pub fn id(&self) -> String {
        session_id(&self.window_id, &self.tab_id)
    }

    fn from_parsed(parsed: ParsedSession, now: f64) -> Self {
        Self {
            window_id: parsed.window_id,
            tab_id: parsed.tab_id,
            name: parsed.name,
            tty_device: parsed.tty_device,
            last_activity: now,
            is_active: parsed.busy.unwrap_or(true),
        }
    }

    fn placeholder(now: f64) -> Self {
        Self {
            window_id: "1".into(),
            tab_id: "1".into(),
            name: PLACEHOLDER_NAME.into(),
            tty_device: None,
            last_activity: now,
            is_active: true,
        }
    }
}

pub fn session_id(window_id: &str, tab_id: &str) -> String {
    format!("{window_id}_{tab_id}")
}

/// Current wall-clock time as fractional Unix seconds.
pub fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default()
}

/// Discovery strategies, tried in order until one finds a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanStrategy {
    /// Full enumeration script, decoded by the parser.
    Enumerate,
    /// Tab count; any positive count yields a placeholder.
    CountTabs,
    /// Bare existence probe; a positive answer yields a placeholder.
    Probe,
}

const STRATEGIES: [ScanStrategy; 3] = [
    ScanStrategy::Enumerate,
    ScanStrategy::CountTabs,
    ScanStrategy::Probe,
];

impl ScanStrategy {
    async fn attempt<R: ScriptRunner>(
        self,
        runner: &R,
        host: HostVariant,
        now: f64,
    ) -> Result<Vec<SessionRecord>, ParseError> {
        match self {
            ScanStrategy::Enumerate => {
                let raw = runner.run(script::enumerate(host)).await;
                Ok(parse_sessions(&raw, host)?
                    .into_iter()
                    .map(|p| SessionRecord::from_parsed(p, now))
                    .collect())
            }
            ScanStrategy::CountTabs => {
                let raw = runner.run(&script::count_tabs(host)).await;
                match raw.trim().parse::<u32>() {
                    Ok(n) if n > 0 => Ok(vec![SessionRecord::placeholder(now)]),
                    _ => Ok(Vec::new()),
                }
            }
            ScanStrategy::Probe => {
                let raw = runner.run(&script::probe(host)).await;
                if raw.contains('1') {
                    Ok(vec![SessionRecord::placeholder(now)])
                } else {
                    Ok(Vec::new())
                }
            }
        }
    }
}

#[derive(Debug, Default)]
struct RegistryState {
    /// Ids in order of first discovery.
    order: Vec<String>,
    sessions: HashMap<String, SessionRecord>,
    last_scan: Option<Instant>,
}

impl RegistryState {
    fn upsert(&mut self, record: SessionRecord) {
        let id = record.id();
        if !self.sessions.contains_key(&id) {
            self.order.push(id.clone());
        }
        self.sessions.insert(id, record);
    }

    fn values(&self) -> Vec<SessionRecord> {
        self.order
            .iter()
            .filter_map(|id| self.sessions.get(id).cloned())
            .collect()
    }

    fn is_fresh(&self, interval: Duration) -> bool {
        self.last_scan.is_some_and(|t| t.elapsed() < interval)
    }
}

/// Cached mapping of session id to [`SessionRecord`].
#[derive(Debug)]
pub struct SessionRegistry {
    state: Mutex<RegistryState>,
    scan_interval: Duration,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_SCAN_INTERVAL)
    }
}

impl SessionRegistry {
    pub fn new(scan_interval: Duration) -> Self {
        Self {
            state: Mutex::new(RegistryState::default()),
            scan_interval,
        }
    }

    /// Refresh from the host unless the last scan is still fresh.
    ///
    /// Returns every known record in discovery order, or an empty list if
    /// no strategy found a session. The lock is held for the whole scan so
    /// concurrent callers observe the cache window.
    pub async fn scan<R: ScriptRunner>(&self, runner: &R, host: HostVariant) -> Vec<SessionRecord> {
        let mut state = self.state.lock().await;
        if state.is_fresh(self.scan_interval) {
            debug!(count = state.sessions.len(), "using cached sessions");
            return state.values();
        }

        info!(%host, "scanning sessions");
        let now = unix_now();
        for strategy in STRATEGIES {
            let found = match strategy.attempt(runner, host, now).await {
                Ok(found) => found,
                Err(e) => {
                    warn!(?strategy, error = %e, "failed to parse sessions, trying fallback");
                    continue;
                }
            };
            if found.is_empty() {
                debug!(?strategy, "strategy found no sessions");
                continue;
            }

            info!(?strategy, count = found.len(), "scan completed");
            for record in found {
                state.upsert(record);
            }
            if strategy == ScanStrategy::Enumerate {
                state.last_scan = Some(Instant::now());
            }
            return state.values();
        }

        warn!(%host, "no sessions found");
        Vec::new()
    }

    pub async fn get(&self, session_id: &str) -> Option<SessionRecord> {
        self.state.lock().await.sessions.get(session_id).cloned()
    }

    pub async fn contains(&self, session_id: &str) -> bool {
        self.state.lock().await.sessions.contains_key(session_id)
    }

    /// Insert or refresh a record directly.
    pub async fn upsert(&self, record: SessionRecord) {
        self.state.lock().await.upsert(record);
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.state.lock().await.sessions.len()
    }
}

/// The record with the greatest `last_activity`; ties go to the earliest.
pub fn most_recent(records: &[SessionRecord]) -> Option<&SessionRecord> {
    records.iter().fold(None, |best, r| match best {
        Some(b) if b.last_activity >= r.last_activity => Some(b),
        _ => Some(r),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeRunner;

    const TWO_TABS: &str =
        "75081, 1, Terminal, /dev/ttys000, false, 74477, 1, Terminal, /dev/ttys001, false";

    fn enumerating(output: &'static str) -> FakeRunner {
        FakeRunner::new(move |script| {
            if script.contains("sessionList") {
                output.to_string()
            } else {
                String::new()
            }
        })
    }

    #[tokio::test]
    async fn second_scan_within_ttl_is_cached() {
        let runner = enumerating(TWO_TABS);
        let registry = SessionRegistry::default();

        let first = registry.scan(&runner, HostVariant::TerminalApp).await;
        let second = registry.scan(&runner, HostVariant::TerminalApp).await;

        assert_eq!(runner.call_count(), 1);
        assert_eq!(first, second);
        let ids: Vec<String> = first.iter().map(SessionRecord::id).collect();
        assert_eq!(ids, vec!["75081_1", "74477_1"]);
        assert!(first.iter().all(|r| !r.is_active));
    }

    #[tokio::test]
    async fn expired_ttl_rescans() {
        let runner = enumerating(TWO_TABS);
        let registry = SessionRegistry::new(Duration::ZERO);
        registry.scan(&runner, HostVariant::TerminalApp).await;
        registry.scan(&runner, HostVariant::TerminalApp).await;
        assert_eq!(runner.call_count(), 2);
    }

    #[tokio::test]
    async fn vanished_sessions_are_retained() {
        let registry = SessionRegistry::new(Duration::ZERO);
        registry
            .scan(&enumerating(TWO_TABS), HostVariant::TerminalApp)
            .await;
        let later = registry
            .scan(
                &enumerating("74477, 1, Terminal, /dev/ttys001, true"),
                HostVariant::TerminalApp,
            )
            .await;

        assert_eq!(later.len(), 2);
        assert!(registry.contains("75081_1").await);
        assert!(registry.get("74477_1").await.unwrap().is_active);
        assert_eq!(later[0].id(), "75081_1");
    }

    #[tokio::test]
    async fn iterm_records_default_to_active() {
        let runner = enumerating("5, 9, build");
        let registry = SessionRegistry::default();
        let records = registry.scan(&runner, HostVariant::ITerm2).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id(), "5_9");
        assert!(records[0].is_active);
        assert_eq!(records[0].tty_device, None);
    }

    #[tokio::test]
    async fn count_fallback_synthesizes_placeholder() {
        let runner = FakeRunner::new(|script| {
            if script.contains("sessionCount") {
                "3".to_string()
            } else {
                String::new()
            }
        });
        let registry = SessionRegistry::default();
        let records = registry.scan(&runner, HostVariant::TerminalApp).await;

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id(), "1_1");
        assert_eq!(records[0].name, PLACEHOLDER_NAME);
        assert!(records[0].is_active);
        // Enumerate, then count; the probe is never reached.
        assert_eq!(runner.call_count(), 2);
    }

    #[tokio::test]
    async fn parse_failure_falls_through_to_probe() {
        let runner = FakeRunner::new(|script| {
            if script.contains("sessionList") {
                ", 1, broken, /dev/ttys000, false".to_string()
            } else if script.contains("get name of windows") {
                "1".to_string()
            } else {
                "0".to_string()
            }
        });
        let registry = SessionRegistry::default();
        let records = registry.scan(&runner, HostVariant::TerminalApp).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id(), "1_1");
        assert_eq!(runner.call_count(), 3);
    }

    #[tokio::test]
    async fn fallback_does_not_start_cache_window() {
        let runner = FakeRunner::new(|script| {
            if script.contains("get name of windows") {
                "1".to_string()
            } else {
                String::new()
            }
        });
        let registry = SessionRegistry::default();
        registry.scan(&runner, HostVariant::TerminalApp).await;
        registry.scan(&runner, HostVariant::TerminalApp).await;
        assert_eq!(runner.count_matching("sessionList"), 2);
    }

    #[tokio::test]
    async fn total_failure_is_empty_and_keeps_state() {
        let registry = SessionRegistry::new(Duration::ZERO);
        registry
            .scan(&enumerating(TWO_TABS), HostVariant::TerminalApp)
            .await;

        let silent = FakeRunner::silent();
        let result = registry.scan(&silent, HostVariant::TerminalApp).await;
        assert!(result.is_empty());
        assert_eq!(silent.call_count(), 3);
        assert_eq!(registry.len().await, 2);
    }

    #[test]
    fn most_recent_prefers_first_on_tie() {
        let mut a = SessionRecord::placeholder(10.0);
        a.window_id = "a".into();
        let mut b = SessionRecord::placeholder(10.0);
        b.window_id = "b".into();
        let mut c = SessionRecord::placeholder(5.0);
        c.window_id = "c".into();
        let records = vec![c, a, b];
        assert_eq!(most_recent(&records).unwrap().window_id, "a");
        assert!(most_recent(&[]).is_none());
    }
}
