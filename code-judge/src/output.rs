//! Bounding and canonicalizing captured program output

/// Appended to text cut by [`clamp`]
pub const TRUNCATION_MARKER: &str = "\n[output truncated]";

/// Keeps the first `max_chars` characters of `text`, followed by
/// [`TRUNCATION_MARKER`] when anything was cut.
pub fn clamp(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => {
            let mut clamped = String::with_capacity(cut + TRUNCATION_MARKER.len());
            clamped.push_str(&text[..cut]);
            clamped.push_str(TRUNCATION_MARKER);
            clamped
        }
        None => text.to_string(),
    }
}

/// Canonical form used for output comparison: CRLF becomes LF and trailing
/// whitespace is dropped. Leading and interior whitespace is kept.
pub fn normalize(text: Option<&str>) -> String {
    text.unwrap_or_default()
        .replace("\r\n", "\n")
        .trim_end()
        .to_string()
}

/// Smallest byte ceiling that can never change the result of
/// `clamp(_, max_chars)`: a char is at most four bytes, with room for one
/// split character at the cut.
pub fn capture_limit_for(max_chars: usize) -> usize {
    max_chars.saturating_mul(4).saturating_add(8)
}
