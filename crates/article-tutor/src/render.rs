//! Helpers for showing untrusted model output in a terminal.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

// CSI sequences (colors, cursor movement) and OSC sequences (titles,
// hyperlinks), terminated by BEL or ST.
static ESCAPE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x1b\[[0-?]*[ -/]*[@-~]|\x1b\][^\x07\x1b]*(?:\x07|\x1b\\)?")
        .expect("valid regex")
});

/// Removes escape sequences and control characters from `text`, so that
/// it cannot restyle or take over the terminal.
///
/// Line breaks and tabs are kept. Carriage returns are dropped.
pub fn sanitize(text: &str) -> Cow<'_, str> {
    let needs_cleanup = text
        .chars()
        .any(|c| c.is_control() && c != '\n' && c != '\t');
    if !needs_cleanup {
        return Cow::Borrowed(text);
    }

    let without_escapes = ESCAPE_RE.replace_all(text, "");
    Cow::Owned(
        without_escapes
            .chars()
            .filter(|&c| !c.is_control() || c == '\n' || c == '\t')
            .collect(),
    )
}
