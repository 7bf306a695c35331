//! Bounded per-session history of captured screen contents.
//!
//! Every successful content fetch appends a [`ContentSnapshot`]; scroll-back
//! reads from here without touching the host. Each session's buffer has its
//! own lock so fetches for unrelated sessions never wait on each other.

use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};

/// Default number of snapshots kept per session.
pub const DEFAULT_BUFFER_CAPACITY: usize = 500;

/// Buffered snapshots that approximate one page of scroll-back.
pub const ENTRIES_PER_PAGE: usize = 5;

pub const NO_BUFFER: &str = "No buffer available for this session";
pub const BUFFER_EMPTY: &str = "Buffer is empty";
pub const NO_OLDER_CONTENT: &str = "No older content available";

/// One captured rendering of a session's visible text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentSnapshot {
    pub session_id: String,
    pub content: String,
    /// Seconds since the Unix epoch.
    pub timestamp: f64,
    pub line_count: usize,
}

impl ContentSnapshot {
    pub fn new(session_id: impl Into<String>, content: impl Into<String>, timestamp: f64) -> Self {
        let content = content.into();
        let line_count = content.split('\n').count();
        Self {
            session_id: session_id.into(),
            content,
            timestamp,
            line_count,
        }
    }
}

/// A fixed-capacity FIFO of snapshots. The oldest entry is evicted first.
#[derive(Debug)]
pub struct SnapshotBuffer {
    entries: VecDeque<ContentSnapshot>,
    capacity: usize,
}

impl SnapshotBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(DEFAULT_BUFFER_CAPACITY)),
            capacity,
        }
    }

    pub fn push(&mut self, snapshot: ContentSnapshot) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(snapshot);
    }

    /// The newest `n` snapshots, oldest first.
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &ContentSnapshot> {
        let skip = self.entries.len().saturating_sub(n);
        self.entries.iter().skip(skip)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ContentSnapshot> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

}

type SharedBuffer = Arc<Mutex<SnapshotBuffer>>;

/// All session buffers, created lazily on first append.
#[derive(Debug)]
pub struct BufferSet {
    buffers: Mutex<HashMap<String, SharedBuffer>>,
    capacity: usize,
}

impl Default for BufferSet {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_CAPACITY)
    }
}

impl BufferSet {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffers: Mutex::new(HashMap::new()),
            capacity,
        }
    }

    /// The session's buffer, if one was ever created.
    pub fn get(&self, session_id: &str) -> Option<SharedBuffer> {
        self.buffers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(session_id)
            .cloned()
    }

    /// The session's buffer, created empty if absent.
    pub fn get_or_create(&self, session_id: &str) -> SharedBuffer {
        self.buffers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(SnapshotBuffer::new(self.capacity))))
            .clone()
    }

    pub fn append(&self, snapshot: ContentSnapshot) {
        let buffer = self.get_or_create(&snapshot.session_id);
        buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(snapshot);
    }

    /// Join the newest `pages * 5` snapshots, oldest first.
    ///
    /// Missing, empty and exhausted buffers each answer with their own
    /// sentinel text.
    pub fn scroll_back(&self, session_id: &str, pages: u32) -> String {
        let Some(buffer) = self.get(session_id) else {
            return NO_BUFFER.to_string();
        };
        let buffer = buffer.lock().unwrap_or_else(PoisonError::into_inner);
        if buffer.is_empty() {
            return BUFFER_EMPTY.to_string();
        }

        let k = (pages as usize)
            .saturating_mul(ENTRIES_PER_PAGE)
            .min(buffer.len());
        if k == 0 {
            return NO_OLDER_CONTENT.to_string();
        }

        buffer
            .recent(k)
            .map(|s| s.content.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Copy of a session's snapshots, oldest first.
    pub fn snapshots(&self, session_id: &str) -> Vec<ContentSnapshot> {
        self.get(session_id)
            .as_deref()
            .map(|b| {
                b.lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .iter()
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn len(&self, session_id: &str) -> Option<usize> {
        self.get(session_id)
            .as_deref()
            .map(|b| b.lock().unwrap_or_else(PoisonError::into_inner).len())
    }
}
