//! Compound duration tokens such as `15d38m`
//!
//! A token is searched for `<integer><unit>` pairs. Units are `m` (minutes),
//! `h` (hours), `d` (days), `w` (weeks), `mo` (months) and `y` (years). Text that
//! does not form such a pair is ignored. Months count as exactly 30 days and
//! years as exactly 365 days; both are folded into the day component.

use std::fmt;
use std::sync::LazyLock;

use chrono::{DateTime, TimeDelta, Utc};
use regex::Regex;

use super::{ModerationError, ModerationResult};

const MINUTES_PER_HOUR: i64 = 60;
const MINUTES_PER_DAY: i64 = 24 * MINUTES_PER_HOUR;
const MINUTES_PER_WEEK: i64 = 7 * MINUTES_PER_DAY;
const DAYS_PER_MONTH: i64 = 30;
const DAYS_PER_YEAR: i64 = 365;

/// `mo` is listed before `m` so months are never read as minutes
static DURATION_PAIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([0-9]+)(mo|h|d|w|m|y)").expect("duration pattern is a valid regex")
});

/// A parsed duration, kept in the components it was written in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedDuration {
    pub minutes: i64,
    pub hours: i64,
    /// Includes months and years after normalization
    pub days: i64,
    pub weeks: i64,
    total: TimeDelta,
}

impl ParsedDuration {
    /// The duration as a single time delta
    #[must_use]
    pub fn to_chrono(&self) -> TimeDelta {
        self.total
    }

    /// Absolute instant `now + self`
    ///
    /// # Errors
    /// Returns `InvalidDuration` if the instant is out of range
    pub fn expiry_from(&self, now: DateTime<Utc>) -> ModerationResult<DateTime<Utc>> {
        now.checked_add_signed(self.total)
            .ok_or_else(|| ModerationError::InvalidDuration("duration too long".to_string()))
    }
}

impl fmt::Display for ParsedDuration {
    /// Renders as `"15 days, 0:38:00"`, or `"2:05:00"` under a day
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total_minutes = self.total.num_minutes();
        let days = total_minutes / MINUTES_PER_DAY;
        let rest = total_minutes % MINUTES_PER_DAY;
        let hours = rest / MINUTES_PER_HOUR;
        let minutes = rest % MINUTES_PER_HOUR;

        if days == 1 {
            write!(f, "1 day, ")?;
        } else if days != 0 {
            write!(f, "{days} days, ")?;
        }
        write!(f, "{hours}:{minutes:02}:00")
    }
}

/// Parse a compound duration token
///
/// # Errors
/// Returns `InvalidDuration` if the token is empty, holds no recognised
/// `<integer><unit>` pair, or describes a span too large to represent
pub fn parse_duration(token: &str) -> ModerationResult<ParsedDuration> {
    let (mut minutes, mut hours, mut days, mut weeks, mut months, mut years) =
        (0i64, 0i64, 0i64, 0i64, 0i64, 0i64);
    let mut matched = false;

    for pair in DURATION_PAIR.captures_iter(token) {
        let value = pair[1].parse::<i64>().map_err(|_| too_long())?;
        let slot = match &pair[2] {
            "mo" => &mut months,
            "h" => &mut hours,
            "d" => &mut days,
            "w" => &mut weeks,
            "m" => &mut minutes,
            _ => &mut years,
        };
        *slot = slot.checked_add(value).ok_or_else(too_long)?;
        matched = true;
    }

    if !matched {
        return Err(ModerationError::InvalidDuration(
            "no duration given".to_string(),
        ));
    }

    let days = months
        .checked_mul(DAYS_PER_MONTH)
        .and_then(|m| years.checked_mul(DAYS_PER_YEAR).and_then(|y| m.checked_add(y)))
        .and_then(|extra| days.checked_add(extra))
        .ok_or_else(too_long)?;

    let total_minutes = [
        Some(minutes),
        hours.checked_mul(MINUTES_PER_HOUR),
        days.checked_mul(MINUTES_PER_DAY),
        weeks.checked_mul(MINUTES_PER_WEEK),
    ]
    .into_iter()
    .try_fold(0i64, |acc, part| part.and_then(|p| acc.checked_add(p)))
    .ok_or_else(too_long)?;

    let total = TimeDelta::try_minutes(total_minutes).ok_or_else(too_long)?;

    Ok(ParsedDuration {
        minutes,
        hours,
        days,
        weeks,
        total,
    })
}

fn too_long() -> ModerationError {
    ModerationError::InvalidDuration("duration too long".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compound_token() {
        let parsed = parse_duration("15d38m").unwrap();
        assert_eq!(parsed.minutes, 38);
        assert_eq!(parsed.days, 15);
        assert_eq!(parsed.hours, 0);
        assert_eq!(parsed.weeks, 0);
        assert_eq!(
            parsed.to_chrono(),
            TimeDelta::days(15) + TimeDelta::minutes(38)
        );
    }

    #[test]
    fn test_months_and_years_fold_into_days() {
        let month = parse_duration("1mo").unwrap();
        assert_eq!(month.days, 30);
        assert_eq!(month.minutes, 0);
        assert_eq!(month.to_chrono(), TimeDelta::days(30));

        let year = parse_duration("1y").unwrap();
        assert_eq!(year.days, 365);
        assert_eq!(year.to_chrono(), TimeDelta::days(365));

        let mixed = parse_duration("1y2mo3d").unwrap();
        assert_eq!(mixed.days, 365 + 60 + 3);
    }

    #[test]
    fn test_empty_and_garbage_are_rejected() {
        assert!(matches!(
            parse_duration(""),
            Err(ModerationError::InvalidDuration(msg)) if msg == "no duration given"
        ));
        assert!(matches!(
            parse_duration("soon"),
            Err(ModerationError::InvalidDuration(_))
        ));
        assert!(matches!(
            parse_duration("12"),
            Err(ModerationError::InvalidDuration(_))
        ));
    }

    #[test]
    fn test_unmatched_text_is_ignored() {
        let parsed = parse_duration("2hx5zq1w").unwrap();
        assert_eq!(parsed.hours, 2);
        assert_eq!(parsed.weeks, 1);
        assert_eq!(parsed.to_chrono(), TimeDelta::hours(2) + TimeDelta::weeks(1));
    }

    #[test]
    fn test_month_is_not_read_as_minutes() {
        let parsed = parse_duration("2mo5m").unwrap();
        assert_eq!(parsed.days, 60);
        assert_eq!(parsed.minutes, 5);

        // A stray `o` after minutes still leaves the minutes in place
        let parsed = parse_duration("5m o").unwrap();
        assert_eq!(parsed.minutes, 5);
    }

    #[test]
    fn test_repeated_units_accumulate() {
        let parsed = parse_duration("10m5m").unwrap();
        assert_eq!(parsed.minutes, 15);
    }

    #[test]
    fn test_overflow_is_invalid() {
        assert!(parse_duration("99999999999999999999y").is_err());
        assert!(parse_duration("9223372036854775807w").is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(parse_duration("15d38m").unwrap().to_string(), "15 days, 0:38:00");
        assert_eq!(parse_duration("1d").unwrap().to_string(), "1 day, 0:00:00");
        assert_eq!(parse_duration("2h5m").unwrap().to_string(), "2:05:00");
        assert_eq!(parse_duration("1w").unwrap().to_string(), "7 days, 0:00:00");
    }

    #[test]
    fn test_expiry_from() {
        let now = Utc::now();
        let parsed = parse_duration("1h").unwrap();
        assert_eq!(parsed.expiry_from(now).unwrap(), now + TimeDelta::hours(1));
    }
}
