// Structural check that a translation kept every caption index
use regex::Regex;
use std::sync::OnceLock;

fn index_regex() -> &'static Regex {
    static INDEX: OnceLock<Regex> = OnceLock::new();
    INDEX.get_or_init(|| Regex::new(r"^\d+$").expect("Invalid regex"))
}

/// Lines that look like caption indices (only digits after trimming), in order.
pub fn index_lines(text: &str) -> Vec<&str> {
    text.split('\n')
        .map(str::trim)
        .filter(|line| index_regex().is_match(line))
        .collect()
}

/// A translation is valid when its index lines match the original's exactly:
/// same values, same order, same count. Timecodes and text are not checked.
pub fn is_valid(original: &str, translated: &str) -> bool {
    index_lines(original) == index_lines(translated)
}
