//! Decoder for enumeration output.
//!
//! AppleScript renders a list of lists either as one comma-joined line or
//! as one record per line, depending on the host and on how `osascript`
//! decided to format it. The decoder picks a [`Layout`] and a stride (from
//! the [`HostVariant`]) up front, then walks the tokens.

use crate::error::ParseError;
use crate::host::HostVariant;

/// Token separator used by `osascript` when printing lists.
const SEPARATOR: &str = ", ";

/// AppleScript's rendering of an undefined value.
const MISSING_VALUE: &str = "missing value";

/// Textual shape of the enumeration output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// Every field of every record on one line.
    SingleLine,
    /// One record per line.
    MultiLine,
}

impl Layout {
    pub fn detect(raw: &str) -> Self {
        if raw.contains(',') && !raw.contains('\n') {
            Layout::SingleLine
        } else {
            Layout::MultiLine
        }
    }
}

/// One decoded window/tab tuple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSession {
    pub window_id: String,
    pub tab_id: String,
    pub name: String,
    pub tty_device: Option<String>,
    /// Only reported by Terminal.app.
    pub busy: Option<bool>,
}

/// Decode raw enumeration output for `host`.
///
/// Trailing tokens that do not fill a whole record are dropped.
pub fn parse_sessions(raw: &str, host: HostVariant) -> Result<Vec<ParsedSession>, ParseError> {
    let stride = host.stride();
    let mut out = Vec::new();

    match Layout::detect(raw) {
        Layout::SingleLine => {
            let tokens: Vec<&str> = raw.split(SEPARATOR).collect();
            decode_tokens(&tokens, host, &mut out)?;
        }
        Layout::MultiLine => {
            for line in raw.lines() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('"') || line.starts_with('{') {
                    continue;
                }
                let tokens: Vec<&str> = line.split(SEPARATOR).collect();
                if tokens.len() < stride {
                    continue;
                }
                decode_tokens(&tokens, host, &mut out)?;
            }
        }
    }

    Ok(out)
}

fn decode_tokens(
    tokens: &[&str],
    host: HostVariant,
    out: &mut Vec<ParsedSession>,
) -> Result<(), ParseError> {
    for chunk in tokens.chunks_exact(host.stride()) {
        let window_id = chunk[0].trim();
        let tab_id = chunk[1].trim();
        if window_id.is_empty() || tab_id.is_empty() {
            return Err(ParseError::MissingIdentity { index: out.len() });
        }

        let name = unquote(chunk[2]).to_string();
        let (tty_device, busy) = match host {
            HostVariant::TerminalApp => {
                let tty = unquote(chunk[3]);
                let tty = (tty != MISSING_VALUE).then(|| tty.to_string());
                (tty, Some(chunk[4].trim() == "true"))
            }
            HostVariant::ITerm2 => (None, None),
        };

        out.push(ParsedSession {
            window_id: window_id.to_string(),
            tab_id: tab_id.to_string(),
            name,
            tty_device,
            busy,
        });
    }
    Ok(())
}

fn unquote(field: &str) -> &str {
    field.trim().trim_matches('"')
}
