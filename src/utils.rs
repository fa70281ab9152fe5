//! Small string and time helpers shared by the scraper, summarizer and outputs.

use chrono::{NaiveTime, Timelike};

/// Classify a time of day into the edition it belongs to.
///
/// - **Morning**: 00:00 - 08:00
/// - **Afternoon**: 08:00 - 16:00
/// - **Evening**: 16:00 - 24:00
pub fn edition_for(tod: NaiveTime) -> &'static str {
    match tod.hour() {
        0..=7 => "morning",
        8..=15 => "afternoon",
        _ => "evening",
    }
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut to at most `max` bytes (backing off to a char
/// boundary) with `"…(+N bytes)"` appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// Keep at most `max` characters of `s`.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Collapse runs of whitespace (including newlines) into single spaces and trim.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Capitalize the first character of a string.
pub fn upcase(s: &str) -> String {
    let mut c = s.chars();
    match c.next() {
        None => String::new(),
        Some(f) => f.to_uppercase().collect::<String>() + c.as_str(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_for_log_short_string() {
        let s = "Hello, world!";
        assert_eq!(truncate_for_log(s, 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[test]
    fn test_truncate_for_log_respects_char_boundaries() {
        // "₹" is three bytes; cutting at byte 2 must not panic.
        let result = truncate_for_log("₹₹₹", 2);
        assert_eq!(result, "…(+9 bytes)");
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("abcdef", 3), "abc");
        assert_eq!(truncate_chars("ab", 3), "ab");
        assert_eq!(truncate_chars("₹100 crore", 4), "₹100");
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(
            collapse_whitespace("  Sensex \n\t jumps   500 pts "),
            "Sensex jumps 500 pts"
        );
        assert_eq!(collapse_whitespace(" \n "), "");
    }

    #[test]
    fn test_upcase() {
        assert_eq!(upcase("morning"), "Morning");
        assert_eq!(upcase(""), "");
    }

    #[test]
    fn test_edition_for() {
        assert_eq!(edition_for(NaiveTime::from_hms_opt(6, 30, 0).unwrap()), "morning");
        assert_eq!(edition_for(NaiveTime::from_hms_opt(8, 0, 0).unwrap()), "afternoon");
        assert_eq!(edition_for(NaiveTime::from_hms_opt(15, 59, 59).unwrap()), "afternoon");
        assert_eq!(edition_for(NaiveTime::from_hms_opt(20, 0, 0).unwrap()), "evening");
    }
}
