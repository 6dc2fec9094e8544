//! Verdict extraction from oracle response text.
//!
//! The prompt asks for a "Verdict:" marker followed by A, B, or C. Responses
//! that bury the letter in formatting or skip the marker entirely still
//! parse via a standalone-letter fallback; anything else is unparseable and
//! the pair is recorded as undecided.

use fundrank_core::Outcome;

fn letter_outcome(c: char) -> Option<Outcome> {
    match c.to_ascii_uppercase() {
        'A' => Some(Outcome::FirstWins),
        'B' => Some(Outcome::SecondWins),
        'C' => Some(Outcome::Tie),
        _ => None,
    }
}

/// Parse a judge response into an outcome, or None if unparseable.
pub fn parse_verdict(text: &str) -> Option<Outcome> {
    // Primary: the first verdict letter after the last "Verdict" marker.
    // ASCII lowercasing keeps byte offsets aligned with the original text.
    let lower = text.to_ascii_lowercase();
    if let Some(pos) = lower.rfind("verdict") {
        let tail = &text[pos + "verdict".len()..];
        if let Some(first_alpha) = tail.chars().find(|c| c.is_ascii_alphabetic()) {
            if let Some(outcome) = letter_outcome(first_alpha) {
                return Some(outcome);
            }
        }
    }

    // Fallback: the last line that is a bare letter, ignoring punctuation.
    for line in text.lines().rev() {
        let stripped: String =
            line.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
        if stripped.len() == 1 {
            if let Some(outcome) = letter_outcome(stripped.chars().next().unwrap()) {
                return Some(outcome);
            }
        }
    }

    None
}
