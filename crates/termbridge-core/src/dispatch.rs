//! Input injection: typed text, key presses and clipboard pastes.
//!
//! Raw keystrokes go through System Events, which only delivers them to the
//! frontmost process. The host is raised first, but another window can
//! still steal focus between the two steps.

use crate::bridge::ScriptRunner;
use crate::host::HostVariant;
use crate::registry::SessionRecord;
use crate::script::{self, quote};
use tracing::debug;

/// Named keys and their macOS virtual key codes.
const KEY_CODES: &[(&str, u16)] = &[
    ("tab", 48),
    ("escape", 53),
    ("return", 36),
    ("enter", 76),
    ("space", 49),
    ("delete", 51),
    ("backspace", 51),
    ("up", 126),
    ("down", 125),
    ("left", 123),
    ("right", 124),
    ("home", 115),
    ("end", 119),
    ("pageup", 116),
    ("pagedown", 121),
];

/// Modifier synonyms and the System Events clause they produce.
const MODIFIERS: &[(&str, &str)] = &[
    ("command", "command down"),
    ("cmd", "command down"),
    ("shift", "shift down"),
    ("option", "option down"),
    ("alt", "option down"),
    ("control", "control down"),
    ("ctrl", "control down"),
];

/// Key code for a named key, case-insensitive.
pub fn key_code(key: &str) -> Option<u16> {
    let key = key.to_ascii_lowercase();
    KEY_CODES
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, code)| *code)
}

/// Build the System Events action for a key and its modifiers.
///
/// Unknown keys are typed literally; unknown modifiers are dropped.
pub fn keystroke_action(key: &str, modifiers: &[String]) -> String {
    let mut action = match key_code(key) {
        Some(code) => format!("key code {code}"),
        None => format!(r#"keystroke "{}""#, quote(key)),
    };

    let clauses: Vec<&str> = modifiers
        .iter()
        .filter_map(|m| {
            let m = m.to_ascii_lowercase();
            MODIFIERS
                .iter()
                .find(|(name, _)| *name == m)
                .map(|(_, clause)| *clause)
        })
        .collect();

    if !clauses.is_empty() {
        action.push_str(&format!(" using {{{}}}", clauses.join(", ")));
    }
    action
}

/// Interpret a bridge result as success.
///
/// True when the script printed nothing or printed anything containing
/// "true" in any case. A failed bridge call also prints nothing, so a
/// silent failure reads as success.
// TODO: have the injection scripts return an explicit status token and
// match on it instead of this heuristic.
pub fn looks_successful(result: &str) -> bool {
    result.is_empty() || result.to_lowercase().contains("true")
}

/// Type `text` into a session, optionally running it as a command.
pub async fn send_text<R: ScriptRunner>(
    runner: &R,
    host: HostVariant,
    session: &SessionRecord,
    text: &str,
    execute: bool,
) -> bool {
    let script = if execute {
        script::execute_command(host, &session.window_id, &session.tab_id, text)
    } else {
        script::system_events(host, &format!(r#"keystroke "{}""#, quote(text)))
    };
    debug!(session_id = %session.id(), execute, "sending text");
    looks_successful(&runner.run(&script).await)
}

/// Press a key, with optional modifiers, in the host application.
pub async fn send_keypress<R: ScriptRunner>(
    runner: &R,
    host: HostVariant,
    session: &SessionRecord,
    key: &str,
    modifiers: &[String],
) -> bool {
    let action = keystroke_action(key, modifiers);
    debug!(session_id = %session.id(), %action, "sending keypress");
    looks_successful(&runner.run(&script::system_events(host, &action)).await)
}

/// Put `text` on the clipboard and paste it with Cmd+V.
pub async fn paste_text<R: ScriptRunner>(
    runner: &R,
    host: HostVariant,
    session: &SessionRecord,
    text: &str,
) -> bool {
    runner.run(&script::set_clipboard(text)).await;
    debug!(session_id = %session.id(), "pasting clipboard");
    let paste = script::system_events(host, r#"keystroke "v" using command down"#);
    looks_successful(&runner.run(&paste).await)
}
