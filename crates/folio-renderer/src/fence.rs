//! Fence detection for code blocks and directives.
//!
//! Fences use backticks, tildes or colons (three or more). The closing fence
//! must use the same character and be at least as long as the opening fence.

/// Detect an opening fence on a line with leading whitespace trimmed.
///
/// Returns the fence character and its length.
pub(crate) fn detect_fence(trimmed: &str) -> Option<(char, usize)> {
    let first = trimmed.chars().next()?;
    if first != '`' && first != '~' && first != ':' {
        return None;
    }

    let count = trimmed.chars().take_while(|&c| c == first).count();
    if count < 3 {
        return None;
    }
    // Backtick fences cannot carry backticks in their info string.
    if first == '`' && trimmed[count..].contains('`') {
        return None;
    }
    Some((first, count))
}

/// Check if a line closes a fence opened with `expected_char` x `min_len`.
///
/// Only fence characters followed by optional whitespace are allowed.
pub(crate) fn is_closing_fence(trimmed: &str, expected_char: char, min_len: usize) -> bool {
    if !trimmed.starts_with(expected_char) {
        return false;
    }

    let count = trimmed.chars().take_while(|&c| c == expected_char).count();
    if count < min_len {
        return false;
    }

    trimmed[count * expected_char.len_utf8()..]
        .chars()
        .all(char::is_whitespace)
}
