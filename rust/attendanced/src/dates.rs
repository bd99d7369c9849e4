//! Date text normalization.
//!
//! Attendance history carries dates in two shapes: the long form written by the
//! dashboard (`"January 06, 2024"`) and ISO-like text from the backend
//! (`"2024-01-15"`). Both are reduced to a calendar day here. Text that fits
//! neither shape becomes [`ParsedDate::Invalid`], which orders before every
//! valid day so a most-recent-first sort puts it last.

use crate::error::{EngineError, EngineResult};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::cmp::Ordering;

pub const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Canonical long form used for stored record dates.
pub const DATE_KEY_FORMAT: &str = "%B %d, %Y";
pub const TIME_FORMAT: &str = "%I:%M %p";
pub const MONTH_LABEL_FORMAT: &str = "%B %Y";

const FALLBACK_DATE_FORMATS: [&str; 8] = [
    "%Y-%m-%d",
    "%B %d, %Y",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d %B %Y",
    "%B %d %Y",
    "%b %d, %Y",
    "%d-%m-%Y",
];

const FALLBACK_DATETIME_FORMATS: [&str; 3] =
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsedDate {
    /// Matched `<MonthName> <Day>, <Year>` exactly.
    Exact(NaiveDate),
    /// Accepted by the generic calendar-date parser.
    Fallback(NaiveDate),
    Invalid,
}

impl ParsedDate {
    pub fn day(&self) -> Option<NaiveDate> {
        match self {
            ParsedDate::Exact(d) | ParsedDate::Fallback(d) => Some(*d),
            ParsedDate::Invalid => None,
        }
    }

    pub fn is_valid(&self) -> bool {
        !matches!(self, ParsedDate::Invalid)
    }

    /// Total order on instants: invalid < any valid day; invalid == invalid.
    pub fn cmp_instant(&self, other: &ParsedDate) -> Ordering {
        self.day().cmp(&other.day())
    }
}

pub fn parse_date_text(text: &str) -> ParsedDate {
    if let Some(d) = parse_long_form(text) {
        return ParsedDate::Exact(d);
    }
    match parse_generic(text) {
        Some(d) => ParsedDate::Fallback(d),
        None => ParsedDate::Invalid,
    }
}

/// Finds `<MonthName> <D|DD>, <YYYY>` anywhere in `text`. Month names are
/// matched case-sensitively against full English names.
fn parse_long_form(text: &str) -> Option<NaiveDate> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    for w in tokens.windows(3) {
        let Some(month_idx) = MONTH_NAMES.iter().position(|m| *m == w[0]) else {
            continue;
        };
        let Some(day_text) = w[1].strip_suffix(',') else {
            continue;
        };
        if day_text.is_empty()
            || day_text.len() > 2
            || !day_text.chars().all(|c| c.is_ascii_digit())
        {
            continue;
        }
        let year_text: String = w[2].chars().take_while(|c| c.is_ascii_digit()).collect();
        if year_text.len() != 4 {
            continue;
        }
        let (Ok(day), Ok(year)) = (day_text.parse::<u32>(), year_text.parse::<i32>()) else {
            continue;
        };
        if let Some(d) = NaiveDate::from_ymd_opt(year, month_idx as u32 + 1, day) {
            return Some(d);
        }
    }
    None
}

fn parse_generic(text: &str) -> Option<NaiveDate> {
    let t = text.trim();
    if t.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(t) {
        return Some(dt.date_naive());
    }
    for fmt in FALLBACK_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(t, fmt) {
            return Some(dt.date());
        }
    }
    FALLBACK_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(t, fmt).ok())
}

pub fn format_date_key(d: NaiveDate) -> String {
    d.format(DATE_KEY_FORMAT).to_string()
}

pub fn format_month_label(d: NaiveDate) -> String {
    d.format(MONTH_LABEL_FORMAT).to_string()
}

/// Strict `YYYY-MM-DD` parse for request parameters.
pub fn parse_iso_date(text: &str) -> EngineResult<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
        .map_err(|_| EngineError::Invalid(format!("invalid date '{text}', use YYYY-MM-DD")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn long_form_is_exact() {
        assert_eq!(
            parse_date_text("January 06, 2024"),
            ParsedDate::Exact(ymd(2024, 1, 6))
        );
        assert_eq!(
            parse_date_text("December 9, 2023"),
            ParsedDate::Exact(ymd(2023, 12, 9))
        );
        // Embedded in surrounding text, as the dashboard's pattern allows.
        assert_eq!(
            parse_date_text("Saturday, March 02, 2024 (late)"),
            ParsedDate::Exact(ymd(2024, 3, 2))
        );
    }

    #[test]
    fn month_names_are_case_sensitive() {
        // Lowercase month does not match the long form; the generic parser takes it.
        assert_eq!(
            parse_date_text("january 06, 2024"),
            ParsedDate::Fallback(ymd(2024, 1, 6))
        );
        assert_eq!(
            parse_date_text("JANUARY 06, 2024"),
            ParsedDate::Fallback(ymd(2024, 1, 6))
        );
    }

    #[test]
    fn iso_text_falls_back() {
        assert_eq!(
            parse_date_text("2024-01-15"),
            ParsedDate::Fallback(ymd(2024, 1, 15))
        );
        assert_eq!(
            parse_date_text("2024-01-15T08:30:00Z"),
            ParsedDate::Fallback(ymd(2024, 1, 15))
        );
        assert_eq!(
            parse_date_text("06 January 2024"),
            ParsedDate::Fallback(ymd(2024, 1, 6))
        );
    }

    #[test]
    fn garbage_is_invalid() {
        assert_eq!(parse_date_text(""), ParsedDate::Invalid);
        assert_eq!(parse_date_text("yesterday"), ParsedDate::Invalid);
        assert_eq!(parse_date_text("February 30, 2024"), ParsedDate::Invalid);
    }

    #[test]
    fn invalid_orders_below_every_valid_day() {
        let invalid = ParsedDate::Invalid;
        let early = ParsedDate::Fallback(ymd(1900, 1, 1));
        assert_eq!(invalid.cmp_instant(&early), Ordering::Less);
        assert_eq!(early.cmp_instant(&invalid), Ordering::Greater);
        assert_eq!(invalid.cmp_instant(&ParsedDate::Invalid), Ordering::Equal);
        assert_eq!(
            ParsedDate::Exact(ymd(2024, 1, 6)).cmp_instant(&ParsedDate::Fallback(ymd(2024, 1, 6))),
            Ordering::Equal
        );
    }

    #[test]
    fn formats_round_trip_through_long_form() {
        let d = ymd(2024, 1, 6);
        let key = format_date_key(d);
        assert_eq!(key, "January 06, 2024");
        assert_eq!(parse_date_text(&key), ParsedDate::Exact(d));
        assert_eq!(format_month_label(d), "January 2024");
    }

    #[test]
    fn iso_params_are_strict() {
        assert_eq!(parse_iso_date("2024-01-06").expect("iso"), ymd(2024, 1, 6));
        assert!(matches!(
            parse_iso_date("January 06, 2024"),
            Err(EngineError::Invalid(_))
        ));
    }
}
