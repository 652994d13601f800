//! Text normalization shared by everything that crosses a process or
//! network boundary. All text inside the agent is UTF-8; malformed input is
//! repaired with U+FFFD instead of being rejected.

/// Prefix carried by every execution result that describes a failure.
pub const ERROR_TAG: &str = "[ERROR]";

/// Decodes bytes as UTF-8, replacing invalid sequences.
pub fn normalize_bytes(bytes: &[u8]) -> String {
    canonicalize(&String::from_utf8_lossy(bytes))
}

/// Canonical form: no byte-order mark, `\n` line endings, no NUL characters.
pub fn canonicalize(text: &str) -> String {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    text.replace("\r\n", "\n").replace('\0', "\u{fffd}")
}

/// Renders a failure as an execution result: the error tag, then the message.
pub fn tagged_error(message: &str) -> String {
    format!("{ERROR_TAG} {}", canonicalize(message.trim_end()))
}
