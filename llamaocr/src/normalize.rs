//! Cleanup applied to recognized text before it is printed.

/// Trim every line, drop the blank ones and rejoin the rest with `\n`.
///
/// Accepts `\n`, `\r\n` and lone `\r` line breaks. Whitespace inside a line is
/// left alone, so `"a   b"` stays `"a   b"`.
pub fn normalize(raw: &str) -> String {
    raw.split(['\r', '\n'])
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Outcome of one recognition call, before it reaches the terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrResult {
    pub raw_text: Option<String>,
    pub normalized_text: String,
    pub succeeded: bool,
}

impl OcrResult {
    pub fn from_raw(raw_text: Option<String>) -> Self {
        let normalized_text = raw_text.as_deref().map(normalize).unwrap_or_default();
        let succeeded = !normalized_text.is_empty();

        Self {
            raw_text,
            normalized_text,
            succeeded,
        }
    }
}
