//! Scriptable stand-in for the AppleScript bridge.

use crate::bridge::ScriptRunner;
use std::sync::Mutex;

type Responder = Box<dyn Fn(&str) -> String + Send + Sync>;

/// Answers scripts through a routing closure and records every call.
pub struct FakeRunner {
    respond: Responder,
    calls: Mutex<Vec<String>>,
}

impl FakeRunner {
    pub fn new(respond: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        Self {
            respond: Box::new(respond),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// A runner whose every call fails.
    pub fn silent() -> Self {
        Self::new(|_| String::new())
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Number of recorded scripts containing `needle`.
    pub fn count_matching(&self, needle: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.contains(needle))
            .count()
    }
}

impl ScriptRunner for FakeRunner {
    async fn run(&self, script: &str) -> String {
        self.calls.lock().unwrap().push(script.to_string());
        (self.respond)(script)
    }
}
