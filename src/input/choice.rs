//! Numeric selection parsing for typed and spoken answers.

use once_cell::sync::Lazy;
use regex::Regex;

static DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]+").expect("digit pattern is valid"));

/// Spelled-out numbers, in the order they are tried.
const NUMBER_WORDS: [(&str, u32); 21] = [
    ("zero", 0),
    ("one", 1),
    ("two", 2),
    ("three", 3),
    ("four", 4),
    ("five", 5),
    ("six", 6),
    ("seven", 7),
    ("eight", 8),
    ("nine", 9),
    ("ten", 10),
    ("eleven", 11),
    ("twelve", 12),
    ("thirteen", 13),
    ("fourteen", 14),
    ("fifteen", 15),
    ("sixteen", 16),
    ("seventeen", 17),
    ("eighteen", 18),
    ("nineteen", 19),
    ("twenty", 20),
];

/// Extract a numeric selection from free text.
///
/// The first run of ASCII digits anywhere in the text wins, as long as it
/// fits a `u32`. Failing that, the words "zero" through "twenty" are tried
/// in ascending order and the first one present is returned, regardless of
/// where it sits in the text. Matching is case-insensitive.
///
/// Number words must stand alone. A plain substring scan would read
/// "seventeen" as 7 and "none" as 1, so "seventeen" yields 17 here and
/// "none" yields nothing.
pub fn parse_choice(text: &str) -> Option<u32> {
    if let Some(value) = DIGITS.find(text).and_then(|found| found.as_str().parse().ok()) {
        return Some(value);
    }

    let lowered = text.to_lowercase();
    let words: Vec<&str> =
        lowered.split(|c: char| !c.is_alphabetic()).filter(|w| !w.is_empty()).collect();

    NUMBER_WORDS.iter().find(|(word, _)| words.contains(word)).map(|&(_, value)| value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digits_anywhere() {
        assert_eq!(parse_choice("option 7 please"), Some(7));
        assert_eq!(parse_choice("12"), Some(12));
        assert_eq!(parse_choice("step3"), Some(3));
    }

    #[test]
    fn test_first_digit_run_wins() {
        assert_eq!(parse_choice("2 or 3"), Some(2));
    }

    #[test]
    fn test_digits_beat_words() {
        assert_eq!(parse_choice("three, no wait, 4"), Some(4));
    }

    #[test]
    fn test_number_words() {
        assert_eq!(parse_choice("please pick three"), Some(3));
        assert_eq!(parse_choice("twenty"), Some(20));
        assert_eq!(parse_choice("Zero."), Some(0));
        assert_eq!(parse_choice("SEVENTEEN"), Some(17));
    }

    #[test]
    fn test_vocabulary_order_not_text_order() {
        // "two" comes before "five" in the vocabulary.
        assert_eq!(parse_choice("five or two"), Some(2));
    }

    #[test]
    fn test_words_inside_other_words_are_ignored() {
        assert_eq!(parse_choice("none of them"), None);
        assert_eq!(parse_choice("often"), None);
    }

    #[test]
    fn test_no_selection() {
        assert_eq!(parse_choice("blah"), None);
        assert_eq!(parse_choice(""), None);
    }

    #[test]
    fn test_overflowing_digits_are_no_selection() {
        assert_eq!(parse_choice("99999999999999999999"), None);
    }

    #[test]
    fn test_overflowing_digits_fall_back_to_words() {
        assert_eq!(parse_choice("99999999999999999999 three"), Some(3));
    }

    #[test]
    fn test_non_ascii_digits_are_not_numbers() {
        assert_eq!(parse_choice("\u{663}"), None);
        assert_eq!(parse_choice("\u{663} or four"), Some(4));
    }
}
