// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Character-based token estimation.
//!
//! A fixed four characters per token, counted in Unicode scalar values.
//! This is a budgeting heuristic, not a tokenizer.

/// Characters assumed per token.
pub const CHARS_PER_TOKEN: usize = 4;

const ELLIPSIS: &str = "...";

/// Estimated token count: `ceil(chars / 4)`.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(CHARS_PER_TOKEN)
}

/// Cut `text` to fit `max_tokens`, marking the cut with `...`.
///
/// Text that already fits is returned unchanged. Otherwise the result is the
/// first `max_tokens * 4 - 3` characters followed by the ellipsis.
pub fn truncate_to_tokens(text: &str, max_tokens: usize) -> String {
    let max_chars = max_tokens.saturating_mul(CHARS_PER_TOKEN);
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let keep = max_chars.saturating_sub(ELLIPSIS.len());
    let mut out: String = text.chars().take(keep).collect();
    out.push_str(ELLIPSIS);
    out
}
