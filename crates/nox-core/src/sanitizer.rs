//! Answer normalization, length capping and spam heuristics.
//!
//! All lengths here are counted in `char`s, never bytes, and slicing only
//! happens on char boundaries so emoji-heavy answers cannot split a code point.

use std::collections::HashMap;

/// Longest answer stored verbatim; longer answers need explicit truncation.
pub const MAX_ANSWER_LENGTH: usize = 800;

/// Minimum body kept when the long truncation marker would not fit.
const MIN_BODY_LENGTH: usize = 50;

const SHORT_TRUNCATION_MARKER: &str = "... [Truncated]";

/// Answers shorter than this are never considered spam.
const SPAM_MIN_LENGTH: usize = 10;

/// Outcome of validating a single free-text answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerVerdict {
    /// Normalized text, ready to be stored.
    Accepted(String),
    /// Normalized text that exceeds [`MAX_ANSWER_LENGTH`].
    TooLong(String),
    /// Degenerate input such as sticker or repeated-character floods.
    Spam,
    /// Nothing left after whitespace normalization.
    Empty,
}

/// Collapses every whitespace run (newlines and tabs included) into a single
/// space and trims both ends.
pub fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn truncation_marker(original_length: usize) -> String {
    format!(
        "... [Answer truncated due to length - {} characters total]",
        original_length
    )
}

/// Caps an answer at [`MAX_ANSWER_LENGTH`] characters including the marker.
///
/// Answers that fit after normalization come back normalized and otherwise
/// untouched. Longer answers keep as much body as the marker leaves room for,
/// preferring to cut at the last space when that loses at most 20% of the body.
pub fn truncate(text: &str) -> String {
    let content = normalize(text);
    let length = char_len(&content);
    if length <= MAX_ANSWER_LENGTH {
        return content;
    }

    let mut marker = truncation_marker(length);
    let mut budget = MAX_ANSWER_LENGTH.saturating_sub(char_len(&marker));
    if budget < MIN_BODY_LENGTH {
        budget = MIN_BODY_LENGTH;
        marker = SHORT_TRUNCATION_MARKER.to_string();
    }

    let head: String = content.chars().take(budget).collect();
    let mut body = head.trim_end();

    if let Some(byte_idx) = body.rfind(' ') {
        let space_at = char_len(&body[..byte_idx]);
        // Cut on the word boundary only when it sits past 80% of the budget.
        if space_at * 5 > budget * 4 {
            body = &body[..byte_idx];
        }
    }

    format!("{}{}", body, marker)
}

/// Repetition heuristic for sticker/emoji and repeated-character flooding.
///
/// Short legitimate answers that happen to repeat ("no no no no no") may be
/// flagged; that tradeoff is accepted.
pub fn is_spam(text: &str) -> bool {
    let length = char_len(text);
    if length < SPAM_MIN_LENGTH {
        return false;
    }

    let mut counts: HashMap<char, usize> = HashMap::new();
    for c in text.chars() {
        *counts.entry(c).or_insert(0) += 1;
    }
    let most_common = counts.values().copied().max().unwrap_or(0);
    if most_common * 5 > length * 4 {
        return true;
    }

    for pattern_length in [2usize, 3, 4] {
        if length < pattern_length * 10 {
            continue;
        }
        let pattern: String = text.chars().take(pattern_length).collect();
        // `matches` counts non-overlapping occurrences.
        let occurrences = text.matches(pattern.as_str()).count();
        if occurrences * pattern_length * 2 > length {
            return true;
        }
    }

    false
}

/// Normalizes `text` and classifies it for storage.
pub fn validate(text: &str) -> AnswerVerdict {
    let normalized = normalize(text);
    if normalized.is_empty() {
        AnswerVerdict::Empty
    } else if char_len(&normalized) > MAX_ANSWER_LENGTH {
        AnswerVerdict::TooLong(normalized)
    } else if is_spam(&normalized) {
        AnswerVerdict::Spam
    } else {
        AnswerVerdict::Accepted(normalized)
    }
}
