//! AppleScript sources for each host variant.
//!
//! Builders only compose text; nothing here talks to the host.

use crate::host::HostVariant;

/// Escape text for use inside an AppleScript string literal.
pub fn quote(text: &str) -> String {
    text.replace('\\', r"\\").replace('"', r#"\""#)
}

/// Enumerate every window/tab as a flat list of records.
pub fn enumerate(host: HostVariant) -> &'static str {
    match host {
        HostVariant::TerminalApp => TERMINAL_ENUMERATE,
        HostVariant::ITerm2 => ITERM_ENUMERATE,
    }
}

/// Count every tab across all windows.
pub fn count_tabs(host: HostVariant) -> String {
    format!(
        r#"
tell application "{app}"
    set sessionCount to 0
    repeat with w in windows
        repeat with t in tabs of w
            set sessionCount to sessionCount + 1
        end repeat
    end repeat
    return sessionCount
end tell
"#,
        app = host.app_name()
    )
}

/// Answer "1" if the application has any windows to talk about.
pub fn probe(host: HostVariant) -> String {
    format!(
        r#"
tell application "{app}"
    try
        get name of windows
        return "1"
    on error
        return "0"
    end try
end tell
"#,
        app = host.app_name()
    )
}

/// Resolve a Terminal.app window id to its 1-based index.
pub fn terminal_window_index(window_id: &str) -> String {
    format!(
        r#"
tell application "Terminal"
    set windowCount to count of windows
    repeat with i from 1 to windowCount
        set w to item i of windows
        if (id of w as string) is "{id}" then
            return i as string
        end if
    end repeat
end tell
"#,
        id = quote(window_id)
    )
}

/// Terminal.app contents of a tab, addressed by window index and tab index.
pub fn terminal_contents(window_index: u32, tab_index: u32) -> String {
    format!(
        r#"tell application "Terminal" to get contents of item {tab_index} of tabs of item {window_index} of windows"#
    )
}

/// iTerm2 contents of a tab, addressed by window and tab ids.
pub fn iterm_contents(window_id: &str, tab_id: &str) -> String {
    format!(
        r#"
tell application "iTerm2"
    repeat with w in windows
        if (id of w as string) is "{window}" then
            repeat with t in tabs of w
                if (id of t as string) is "{tab}" then
                    return contents of t
                end if
            end repeat
        end if
    end repeat
end tell
"#,
        window = quote(window_id),
        tab = quote(tab_id)
    )
}

/// Run `text` as a command inside the addressed tab.
pub fn execute_command(host: HostVariant, window_id: &str, tab_id: &str, text: &str) -> String {
    let window = quote(window_id);
    let tab = quote(tab_id);
    let text = quote(text);
    match host {
        HostVariant::TerminalApp => format!(
            r#"
tell application "Terminal"
    set windowCount to count of windows
    repeat with i from 1 to windowCount
        set w to item i of windows
        if (id of w as string) is "{window}" then
            set tabCount to count of tabs of w
            repeat with j from 1 to tabCount
                set t to item j of tabs of w
                if j as string is "{tab}" then
                    do script "{text}" in t
                    return true
                end if
            end repeat
        end if
    end repeat
end tell
"#
        ),
        HostVariant::ITerm2 => format!(
            r#"
tell application "iTerm2"
    repeat with w in windows
        if (id of w as string) is "{window}" then
            repeat with t in tabs of w
                if (id of t as string) is "{tab}" then
                    write text "{text}" in t
                    return true
                end if
            end repeat
        end if
    end repeat
end tell
"#
        ),
    }
}

/// Bring the host to the front and run a System Events key action in it.
///
/// `action` is a fragment such as `keystroke "a"` or `key code 36`.
pub fn system_events(host: HostVariant, action: &str) -> String {
    format!(
        r#"
tell application "System Events"
    tell process "{app}"
        set frontmost to true
        {action}
    end tell
end tell
"#,
        app = host.app_name()
    )
}

/// Replace the clipboard contents.
pub fn set_clipboard(text: &str) -> String {
    format!(r#"set the clipboard to "{}""#, quote(text))
}

const TERMINAL_ENUMERATE: &str = r#"
tell application "Terminal"
    set sessionList to {}
    set windowCount to count of windows
    repeat with i from 1 to windowCount
        set w to item i of windows
        set windowId to (id of w) as string
        set tabCount to count of tabs of w
        repeat with j from 1 to tabCount
            set t to item j of tabs of w
            set tabId to j as string
            set tabName to custom title of t
            if tabName is "" then
                set tabName to name of t
            end if
            if tabName is "" then
                set tabName to "Terminal Session"
            end if
            set tabTty to tty of t
            set tabBusy to busy of t
            set sessionInfo to {windowId, tabId, tabName, tabTty, tabBusy}
            copy sessionInfo to end of sessionList
        end repeat
    end repeat
    return sessionList
end tell
"#;

const ITERM_ENUMERATE: &str = r#"
tell application "iTerm2"
    set sessionList to {}
    repeat with w in windows
        set windowId to id of w as string
        repeat with t in tabs of w
            set tabId to id of t as string
            set tabName to name of t
            set sessionInfo to {windowId, tabId, tabName}
            copy sessionInfo to end of sessionList
        end repeat
    end repeat
    return sessionList
end tell
"#;
