//! Fiscal period labels and period-ending dates.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

static YEAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d{4}").unwrap());
static QUARTER_AFTER_Q: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"Q(\d)").unwrap());
static ANY_DIGIT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d").unwrap());
static MONTH_DAY_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Z][a-z]{2} \d{1,2}, \d{4}").unwrap());

/// Formats tried, in order, when parsing a cleaned date string.
const DATE_FORMATS: &[&str] = &[
    "%b %d, %Y",
    "%B %d, %Y",
    "%Y-%m-%d",
    "%m/%d/%Y",
    "%Y/%m/%d",
    "%d %b %Y",
    "%b %d %Y",
];

/// Splits a fiscal period label such as `"Q4 2023"` into year and quarter.
///
/// The year is the first four consecutive digits, 0 when there are none. The
/// quarter is the digit after a `Q`, else the first digit anywhere, rendered
/// as `Q<digit>`; `"Q0"` when the label has no digits.
#[must_use]
pub fn decompose_fiscal_period(label: &str) -> (i32, String) {
    let year = YEAR
        .find(label)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0);

    let digit = QUARTER_AFTER_Q
        .captures(label)
        .and_then(|caps| caps.get(1))
        .or_else(|| ANY_DIGIT.find(label))
        .map_or("0", |m| m.as_str());

    (year, format!("Q{digit}"))
}

/// Reduces a raw `Period Ending` cell to the text that should be parsed.
///
/// With an apostrophe, only the text after the last one is kept (`FY'24`
/// becomes `24`). Otherwise, when `strict_pattern` is set and the value
/// contains a `Mon D, YYYY` date, only that match is kept.
#[must_use]
pub fn clean_period_ending(value: &str, strict_pattern: bool) -> &str {
    if let Some((_, tail)) = value.rsplit_once('\'') {
        return tail.trim();
    }
    if strict_pattern {
        if let Some(m) = MONTH_DAY_YEAR.find(value) {
            return m.as_str();
        }
    }
    value.trim()
}

/// Parses a cleaned date string, `None` when no known format matches.
#[must_use]
pub fn parse_period_ending(value: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decompose_year_first_and_quarter_first() {
        assert_eq!(decompose_fiscal_period("2023 Q3"), (2023, "Q3".to_string()));
        assert_eq!(decompose_fiscal_period("Q2 2024"), (2024, "Q2".to_string()));
        assert_eq!(decompose_fiscal_period("Q4 2023"), (2023, "Q4".to_string()));
    }

    #[test]
    fn test_decompose_without_digits() {
        assert_eq!(decompose_fiscal_period("Current"), (0, "Q0".to_string()));
        assert_eq!(decompose_fiscal_period(""), (0, "Q0".to_string()));
    }

    #[test]
    fn test_decompose_partial_labels() {
        assert_eq!(decompose_fiscal_period("FY 2024"), (2024, "Q2".to_string()));
        assert_eq!(decompose_fiscal_period("Q1"), (0, "Q1".to_string()));
    }

    #[test]
    fn test_apostrophe_keeps_tail() {
        assert_eq!(clean_period_ending("FY'24", true), "24");
        assert_eq!(clean_period_ending("Q1 '23 'Mar 31, 2023", false), "Mar 31, 2023");
        assert_eq!(parse_period_ending(clean_period_ending("FY'24", true)), None);
    }

    #[test]
    fn test_strict_pattern_isolates_date() {
        let cleaned = clean_period_ending("Reported Mar 31, 2024 (Q1)", true);
        assert_eq!(cleaned, "Mar 31, 2024");
        assert_eq!(
            parse_period_ending(cleaned),
            NaiveDate::from_ymd_opt(2024, 3, 31)
        );
        assert_eq!(
            parse_period_ending(cleaned).map(|d| d.format("%Y-%m-%d").to_string()),
            Some("2024-03-31".to_string())
        );
    }

    #[test]
    fn test_loose_mode_parses_whole_value() {
        assert_eq!(
            clean_period_ending("Reported Mar 31, 2024 (Q1)", false),
            "Reported Mar 31, 2024 (Q1)"
        );
        assert_eq!(
            parse_period_ending(clean_period_ending(" Sep 30, 2023 ", false)),
            NaiveDate::from_ymd_opt(2023, 9, 30)
        );
    }

    #[test]
    fn test_parse_known_formats() {
        let expected = NaiveDate::from_ymd_opt(2023, 12, 31);
        assert_eq!(parse_period_ending("Dec 31, 2023"), expected);
        assert_eq!(parse_period_ending("December 31, 2023"), expected);
        assert_eq!(parse_period_ending("2023-12-31"), expected);
        assert_eq!(parse_period_ending("12/31/2023"), expected);
        assert_eq!(
            parse_period_ending("Jan 1, 2024"),
            NaiveDate::from_ymd_opt(2024, 1, 1)
        );
        assert_eq!(parse_period_ending("Upcoming"), None);
        assert_eq!(parse_period_ending(""), None);
    }
}
