use once_cell::sync::Lazy;
use regex::Regex;
use rethink_protocol::Subject;

// Math symbols, or a `digit op digit` expression.
static MATH_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[=+\-*/^√∫Σπ]|\d+\s*[+\-*/]\s*\d+").expect("math pattern is valid")
});
// Two consecutive words of at least four letters.
static WRITING_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[a-zA-Z]{4,}\s+[a-zA-Z]{4,}").expect("writing pattern is valid"));

/// Guess the subject of a content unit when the user has not picked one.
#[must_use]
pub fn detect_subject(unit: &str) -> Subject {
    if MATH_PATTERN.is_match(unit) {
        Subject::Math
    } else if WRITING_PATTERN.is_match(unit) {
        Subject::Writing
    } else {
        Subject::Other
    }
}
