//! termbridge-core: session engine for driving macOS terminal applications.
//!
//! Discovers Terminal.app and iTerm2 windows/tabs through AppleScript,
//! decodes the loosely formatted automation output into session records,
//! keeps a bounded screen history per session and injects input.

pub mod bridge;
pub mod buffer;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod health;
pub mod host;
pub mod manager;
pub mod parser;
pub mod registry;
pub mod script;
pub mod service;
pub mod tty;

#[cfg(test)]
mod testing;

// Re-export commonly used items at crate root.
pub use bridge::{Osascript, ScriptRunner};
pub use buffer::{BufferSet, ContentSnapshot, SnapshotBuffer};
pub use config::Config;
pub use error::{BridgeError, ParseError, TermError, TermResult};
pub use host::{HostChoice, HostVariant};
pub use manager::TerminalManager;
pub use registry::{SessionRecord, SessionRegistry};
pub use service::{ScreenMode, TerminalService};

/// Build a service from config: an `osascript` runner, the resolved host
/// variant, and fresh session state.
pub async fn connect(config: &Config) -> TerminalService<Osascript> {
    let runner = Osascript::new(config.program.clone(), config.timeout_secs);
    let host = config.host.resolve(&runner).await;
    let manager = TerminalManager::new(runner, host, config);
    TerminalService::new(manager, config)
}
