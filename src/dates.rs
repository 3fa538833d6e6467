//! Publication date normalization.
//!
//! Listing cards carry dates in two shapes: a full calendar stamp for older
//! items (`Feb 03, 2025, 10:00 ET`) and a bare time of day for items
//! published today (`09:24 ET`). Both are mapped onto a comparable
//! [`NaiveDateTime`]; anything else maps onto an "unknown" sentinel that
//! sorts after every real date.
//!
//! # Known limitation
//!
//! A bare time is always combined with the reference date passed in, which
//! is the day the export runs. An article published at 23:50 yesterday and
//! exported after midnight is therefore dated today.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

/// Display format for re-rendered dates (24-hour clock).
pub const DISPLAY_FORMAT: &str = "%b %d, %Y, %H:%M";

/// Timezone token appended to every re-rendered date.
pub const DISPLAY_ZONE: &str = "ET";

const DATETIME_FORMATS: [&str; 2] = ["%b %d, %Y, %H:%M", "%b %d, %Y, %I:%M %p"];
const TIME_FORMATS: [&str; 2] = ["%H:%M", "%I:%M %p"];

/// Outcome of [`normalize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct NormalizedDate {
    pub instant: NaiveDateTime,
    pub known: bool,
}

impl NormalizedDate {
    /// Placeholder for dates that could not be parsed.
    pub const UNKNOWN: NormalizedDate = NormalizedDate {
        instant: NaiveDateTime::MIN,
        known: false,
    };

    fn known(instant: NaiveDateTime) -> Self {
        NormalizedDate {
            instant,
            known: true,
        }
    }
}

/// Parse a raw listing date. Never fails: unparsable input yields
/// [`NormalizedDate::UNKNOWN`].
pub fn normalize(raw: &str, reference: NaiveDate) -> NormalizedDate {
    let trimmed = strip_zone(raw.trim());
    if trimmed.is_empty() {
        return NormalizedDate::UNKNOWN;
    }

    if trimmed.contains(',') {
        return DATETIME_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
            .map(NormalizedDate::known)
            .unwrap_or(NormalizedDate::UNKNOWN);
    }

    TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(trimmed, fmt).ok())
        .map(|time| NormalizedDate::known(reference.and_time(time)))
        .unwrap_or(NormalizedDate::UNKNOWN)
}

pub fn format_instant(instant: NaiveDateTime) -> String {
    format!("{} {}", instant.format(DISPLAY_FORMAT), DISPLAY_ZONE)
}

/// Drop a trailing timezone abbreviation such as `ET` or `EST`, whether it
/// follows a space (`09:24 ET`) or is glued to the time (`09:24ET`).
///
/// Meridiem markers look like zone tokens and are left alone.
fn strip_zone(s: &str) -> &str {
    let mut head = s.trim_end_matches(|c: char| c.is_ascii_uppercase());
    let mut zone = &s[head.len()..];
    if zone.len() > 2 && (zone.starts_with("AM") || zone.starts_with("PM")) {
        head = &s[..head.len() + 2];
        zone = &zone[2..];
    }
    let is_zone = (2..=4).contains(&zone.len()) && zone != "AM" && zone != "PM";
    let detached = head.ends_with(char::is_whitespace)
        || head.ends_with(|c: char| c.is_ascii_digit())
        || head.ends_with("AM")
        || head.ends_with("PM");
    if is_zone && detached { head.trim_end() } else { s }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        day(y, m, d).and_hms_opt(h, min, 0).unwrap()
    }

    #[test]
    fn test_full_date_24_hour() {
        let n = normalize("Feb 03, 2025, 10:00 ET", day(2025, 6, 1));
        assert!(n.known);
        assert_eq!(n.instant, at(2025, 2, 3, 10, 0));
    }

    #[test]
    fn test_full_date_12_hour() {
        let n = normalize("Feb 03, 2025, 04:15 PM ET", day(2025, 6, 1));
        assert!(n.known);
        assert_eq!(n.instant, at(2025, 2, 3, 16, 15));
    }

    #[test]
    fn test_both_clock_styles_agree() {
        let reference = day(2025, 6, 1);
        assert_eq!(
            normalize("Mar 01, 2025, 13:05", reference),
            normalize("Mar 01, 2025, 01:05 PM", reference)
        );
    }

    #[test]
    fn test_bare_time_uses_reference_date() {
        let reference = day(2025, 7, 14);
        let n = normalize("09:24 ET", reference);
        assert!(n.known);
        assert_eq!(n.instant, at(2025, 7, 14, 9, 24));

        let n = normalize("9:24 PM", reference);
        assert_eq!(n.instant, at(2025, 7, 14, 21, 24));
    }

    #[test]
    fn test_unparsable_is_unknown() {
        let reference = day(2025, 7, 14);
        for raw in ["", "   ", "yesterday", "Feb 31, 2025, 10:00", "25:99", "ET"] {
            let n = normalize(raw, reference);
            assert_eq!(n, NormalizedDate::UNKNOWN, "input {raw:?}");
            assert!(!n.known);
        }
    }

    #[test]
    fn test_unknown_sorts_below_everything() {
        let n = normalize("Jan 01, 1970, 00:00", day(2025, 1, 1));
        assert!(n > NormalizedDate::UNKNOWN);
    }

    #[test]
    fn test_strip_zone_keeps_meridiem() {
        assert_eq!(strip_zone("10:30 AM"), "10:30 AM");
        assert_eq!(strip_zone("10:30 AM ET"), "10:30 AM");
        assert_eq!(strip_zone("Feb 03, 2025, 10:00 EST"), "Feb 03, 2025, 10:00");
        assert_eq!(strip_zone("10:30"), "10:30");
        assert_eq!(strip_zone("10:30PM"), "10:30PM");
    }

    #[test]
    fn test_strip_zone_glued_to_time() {
        assert_eq!(strip_zone("09:24ET"), "09:24");
        assert_eq!(strip_zone("Feb 03, 2025, 10:00ET"), "Feb 03, 2025, 10:00");
        assert_eq!(strip_zone("4:15 PMET"), "4:15 PM");
        assert_eq!(strip_zone("UPDATE"), "UPDATE");

        let reference = day(2025, 7, 14);
        assert_eq!(normalize("09:24ET", reference), normalize("09:24 ET", reference));
        assert!(normalize("09:24ET", reference).known);
    }

    #[test]
    fn test_rendered_dates_parse_back() {
        let reference = day(2025, 7, 14);
        let first = normalize("Feb 3, 2025, 4:15 PM ET", reference);
        let once = format_instant(first.instant);
        assert_eq!(once, "Feb 03, 2025, 16:15 ET");
        assert_eq!(normalize(&once, reference), first);
    }
}
