use thiserror::Error;

/// Failure classes of a single scripting-bridge invocation.
///
/// These never escape [`crate::bridge::ScriptRunner::run`]; they are logged
/// and collapsed to an empty result there.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("script timed out after {0}s")]
    Timeout(u64),

    #[error("script exited with status {code}: {stderr}")]
    NonZeroExit { code: i32, stderr: String },

    #[error("failed to launch interpreter: {0}")]
    Launch(#[from] std::io::Error),
}

impl BridgeError {
    /// Short label used as a structured log field.
    pub fn class(&self) -> &'static str {
        match self {
            BridgeError::Timeout(_) => "timeout",
            BridgeError::NonZeroExit { .. } => "non_zero_exit",
            BridgeError::Launch(_) => "launch_failure",
        }
    }
}

/// Errors raised while decoding enumeration output.
///
/// Consumed by the registry, which answers them with its fallback chain.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("record {index} has an empty window or tab id")]
    MissingIdentity { index: usize },
}

/// Errors produced inside the session engine.
#[derive(Debug, Error)]
pub enum TermError {
    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("no active session set")]
    NoActiveSession,

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type TermResult<T> = Result<T, TermError>;
