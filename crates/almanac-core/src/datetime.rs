use anyhow::{Context, anyhow};
use chrono::{DateTime, Datelike, Days, Months, NaiveDate, Utc, Weekday};
use chrono_tz::Tz;
use regex::Regex;

const DEFAULT_TIMEZONE: Tz = chrono_tz::UTC;

const MONTH_NAMES: [&str; 12] = [
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

// Sunday-first, matching chrono's `number_from_sunday` ordinals.
const WEEKDAY_NAMES: [&str; 7] = ["Su", "Mo", "Tu", "We", "Th", "Fr", "Sa"];

/// The host calendar: which timezone "today" lives in, which weekday opens
/// a week, and the name tables used for rendering. Threaded explicitly into
/// the manager at construction; there is no process-wide default.
#[derive(Debug, Clone)]
pub struct CalendarSystem {
    pub timezone: Tz,
    pub first_weekday: Weekday,
    month_names: Vec<String>,
    weekday_names: Vec<String>,
    today_override: Option<NaiveDate>,
}

impl Default for CalendarSystem {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEZONE, Weekday::Sun)
    }
}

impl CalendarSystem {
    pub fn new(timezone: Tz, first_weekday: Weekday) -> Self {
        Self {
            timezone,
            first_weekday,
            month_names: MONTH_NAMES.iter().map(|name| (*name).to_string()).collect(),
            weekday_names: WEEKDAY_NAMES.iter().map(|name| (*name).to_string()).collect(),
            today_override: None,
        }
    }

    /// Pins "today" to a fixed day instead of the wall clock. Used by the
    /// CLI's `--today` override and by tests that need a stable reference
    /// day.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today_override = Some(today);
        self
    }

    /// Replaces the month name table (January first, 12 entries).
    pub fn with_month_names(mut self, names: Vec<String>) -> Self {
        if names.len() == 12 {
            self.month_names = names;
        } else {
            tracing::warn!(count = names.len(), "ignoring month name table, expected 12");
        }
        self
    }

    /// Replaces the weekday name table (Sunday first, 7 entries).
    pub fn with_weekday_names(mut self, names: Vec<String>) -> Self {
        if names.len() == 7 {
            self.weekday_names = names;
        } else {
            tracing::warn!(count = names.len(), "ignoring weekday name table, expected 7");
        }
        self
    }

    /// The current day in the configured timezone, unless pinned.
    pub fn today(&self) -> NaiveDate {
        self.today_override
            .unwrap_or_else(|| self.day_of(Utc::now()))
    }

    /// Normalizes an instant to the calendar day it falls on in the
    /// configured timezone.
    pub fn day_of(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.timezone).date_naive()
    }

    pub fn month_name(&self, month: u32) -> &str {
        self.month_names
            .get(month.saturating_sub(1) as usize)
            .map(String::as_str)
            .unwrap_or("?")
    }

    pub fn weekday_name(&self, weekday: Weekday) -> &str {
        self.weekday_names
            .get((weekday.number_from_sunday() - 1) as usize)
            .map(String::as_str)
            .unwrap_or("?")
    }

    /// Weekday header labels in display order, starting at `first_weekday`.
    pub fn weekday_header(&self) -> Vec<&str> {
        (0..7)
            .map(|offset| {
                let native = (self.first_weekday.num_days_from_sunday() + offset) % 7;
                self.weekday_names
                    .get(native as usize)
                    .map(String::as_str)
                    .unwrap_or("?")
            })
            .collect()
    }
}

pub fn parse_timezone(raw: &str) -> anyhow::Result<Tz> {
    raw.trim()
        .parse::<Tz>()
        .map_err(|err| anyhow!("invalid timezone id {raw:?}: {err}"))
}

/// First day of the month containing `date`.
pub fn start_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// First day of the month after the month containing `date`.
pub fn start_of_next_month(date: NaiveDate) -> NaiveDate {
    let start = start_of_month(date);
    start.checked_add_months(Months::new(1)).unwrap_or(start)
}

/// First day of the month before the month containing `date`.
pub fn start_of_previous_month(date: NaiveDate) -> NaiveDate {
    let start = start_of_month(date);
    start.checked_sub_months(Months::new(1)).unwrap_or(start)
}

pub fn days_in_month(date: NaiveDate) -> u32 {
    let span = start_of_next_month(date) - start_of_month(date);
    span.num_days().max(0) as u32
}

/// Weekday index of `date` normalized to 0..=6 where 0 is `first_weekday`
/// and 6 is the day right before it.
pub fn normalized_weekday_index(date: NaiveDate, first_weekday: Weekday) -> u32 {
    let native = date.weekday().number_from_sunday();
    let first = first_weekday.number_from_sunday();
    (native + 7 - first) % 7
}

/// Day-granularity exclusive-both-ends comparison.
pub fn is_strictly_between(date: NaiveDate, start: NaiveDate, end: NaiveDate) -> bool {
    start < date && date < end
}

/// Parses the date expressions the CLI accepts. Day granularity only.
#[tracing::instrument]
pub fn parse_date_expr(input: &str, today: NaiveDate) -> anyhow::Result<NaiveDate> {
    let token = input.trim();
    let lower = token.to_ascii_lowercase();

    match lower.as_str() {
        "now" | "today" => return Ok(today),
        "tomorrow" => {
            return today
                .checked_add_days(Days::new(1))
                .ok_or_else(|| anyhow!("tomorrow is out of calendar range"));
        }
        "yesterday" => {
            return today
                .checked_sub_days(Days::new(1))
                .ok_or_else(|| anyhow!("yesterday is out of calendar range"));
        }
        _ => {}
    }

    if token.len() == 4 && token.chars().all(|c| c.is_ascii_digit()) {
        let year: i32 = token.parse().context("invalid 4-digit year")?;
        return NaiveDate::from_ymd_opt(year, 1, 1)
            .ok_or_else(|| anyhow!("invalid year value: {year}"));
    }

    if let Some(target) = parse_weekday_name(&lower) {
        return Ok(next_weekday_date(today, target));
    }

    if let Some(target_month) = parse_month_name(&lower) {
        let mut year = today.year();
        let candidate = NaiveDate::from_ymd_opt(year, target_month, 1)
            .ok_or_else(|| anyhow!("invalid month value: {target_month}"))?;
        if candidate <= today {
            year = year.saturating_add(1);
        }
        return NaiveDate::from_ymd_opt(year, target_month, 1)
            .ok_or_else(|| anyhow!("invalid month/year candidate"));
    }

    let rel_re = Regex::new(r"^(?P<sign>[+-])(?P<num>\d+)(?P<unit>[dwm])$")
        .map_err(|e| anyhow!("internal regex compile failure: {e}"))?;

    if let Some(caps) = rel_re.captures(token) {
        let sign = caps
            .name("sign")
            .map(|m| m.as_str())
            .ok_or_else(|| anyhow!("missing relative sign"))?;
        let num: u64 = caps
            .name("num")
            .map(|m| m.as_str())
            .ok_or_else(|| anyhow!("missing relative amount"))?
            .parse()
            .context("invalid relative number")?;
        let unit = caps
            .name("unit")
            .map(|m| m.as_str())
            .ok_or_else(|| anyhow!("missing relative unit"))?;

        let shifted = match (sign, unit) {
            ("+", "d") => today.checked_add_days(Days::new(num)),
            ("-", "d") => today.checked_sub_days(Days::new(num)),
            ("+", "w") => today.checked_add_days(Days::new(num.saturating_mul(7))),
            ("-", "w") => today.checked_sub_days(Days::new(num.saturating_mul(7))),
            ("+", "m") => today.checked_add_months(Months::new(num.min(u32::MAX as u64) as u32)),
            ("-", "m") => today.checked_sub_months(Months::new(num.min(u32::MAX as u64) as u32)),
            _ => return Err(anyhow!("unknown relative unit: {unit}")),
        };

        return shifted.ok_or_else(|| anyhow!("relative date out of calendar range: {token}"));
    }

    if let Ok(date) = NaiveDate::parse_from_str(token, "%Y-%m-%d") {
        return Ok(date);
    }

    if let Some((y, m)) = token.split_once('-')
        && let (Ok(year), Ok(month)) = (y.parse::<i32>(), m.parse::<u32>())
        && (1..=12).contains(&month)
    {
        return NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or_else(|| anyhow!("invalid year-month: {token}"));
    }

    Err(anyhow!("unrecognized date expression: {input}")).with_context(|| {
        "supported formats: today/tomorrow/yesterday, 4-digit year, weekday \
         names (e.g. monday), month names (e.g. march), +Nd/+Nw/+Nm, \
         YYYY-MM-DD, YYYY-MM"
    })
}

pub fn parse_weekday_name(token: &str) -> Option<Weekday> {
    match token.trim() {
        "monday" | "mon" => Some(Weekday::Mon),
        "tuesday" | "tue" | "tues" => Some(Weekday::Tue),
        "wednesday" | "wed" => Some(Weekday::Wed),
        "thursday" | "thu" | "thur" | "thurs" => Some(Weekday::Thu),
        "friday" | "fri" => Some(Weekday::Fri),
        "saturday" | "sat" => Some(Weekday::Sat),
        "sunday" | "sun" => Some(Weekday::Sun),
        _ => None,
    }
}

fn next_weekday_date(from: NaiveDate, target: Weekday) -> NaiveDate {
    let from_idx = from.weekday().num_days_from_monday() as u64;
    let target_idx = target.num_days_from_monday() as u64;
    let mut delta = (7 + target_idx - from_idx) % 7;
    if delta == 0 {
        delta = 7;
    }
    from.checked_add_days(Days::new(delta)).unwrap_or(from)
}

fn parse_month_name(token: &str) -> Option<u32> {
    match token.trim() {
        "january" | "jan" => Some(1),
        "february" | "feb" => Some(2),
        "march" | "mar" => Some(3),
        "april" | "apr" => Some(4),
        "may" => Some(5),
        "june" | "jun" => Some(6),
        "july" | "jul" => Some(7),
        "august" | "aug" => Some(8),
        "september" | "sep" | "sept" => Some(9),
        "october" | "oct" => Some(10),
        "november" | "nov" => Some(11),
        "december" | "dec" => Some(12),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Weekday};

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid test date")
    }

    #[test]
    fn month_boundaries_across_year_edges() {
        assert_eq!(start_of_month(date(2026, 1, 17)), date(2026, 1, 1));
        assert_eq!(start_of_next_month(date(2026, 12, 31)), date(2027, 1, 1));
        assert_eq!(start_of_previous_month(date(2026, 1, 1)), date(2025, 12, 1));
    }

    #[test]
    fn day_counts_handle_leap_years() {
        assert_eq!(days_in_month(date(2024, 2, 10)), 29);
        assert_eq!(days_in_month(date(2026, 2, 10)), 28);
        assert_eq!(days_in_month(date(2026, 9, 1)), 30);
        assert_eq!(days_in_month(date(2026, 12, 25)), 31);
    }

    #[test]
    fn normalized_index_respects_first_weekday() {
        // 2026-09-01 is a Tuesday.
        assert_eq!(normalized_weekday_index(date(2026, 9, 1), Weekday::Sun), 2);
        assert_eq!(normalized_weekday_index(date(2026, 9, 1), Weekday::Mon), 1);
        assert_eq!(normalized_weekday_index(date(2026, 9, 1), Weekday::Tue), 0);
        assert_eq!(normalized_weekday_index(date(2026, 9, 1), Weekday::Wed), 6);
    }

    #[test]
    fn strictly_between_excludes_both_ends() {
        let start = date(2026, 3, 10);
        let end = date(2026, 3, 12);
        assert!(is_strictly_between(date(2026, 3, 11), start, end));
        assert!(!is_strictly_between(start, start, end));
        assert!(!is_strictly_between(end, start, end));
    }

    #[test]
    fn parses_relative_and_literal_expressions() {
        let today = date(2026, 2, 17);
        assert_eq!(parse_date_expr("today", today).expect("today"), today);
        assert_eq!(
            parse_date_expr("tomorrow", today).expect("tomorrow"),
            date(2026, 2, 18)
        );
        assert_eq!(parse_date_expr("+2w", today).expect("+2w"), date(2026, 3, 3));
        assert_eq!(parse_date_expr("-1m", today).expect("-1m"), date(2026, 1, 17));
        assert_eq!(
            parse_date_expr("2026-09-14", today).expect("literal"),
            date(2026, 9, 14)
        );
        assert_eq!(
            parse_date_expr("2026-09", today).expect("year-month"),
            date(2026, 9, 1)
        );
        assert!(parse_date_expr("someday", today).is_err());
    }

    #[test]
    fn parses_weekday_and_month_names() {
        // 2026-02-17 is a Tuesday.
        let today = date(2026, 2, 17);
        assert_eq!(
            parse_date_expr("wednesday", today).expect("weekday"),
            date(2026, 2, 18)
        );
        // Same weekday resolves to next week, not today.
        assert_eq!(
            parse_date_expr("tuesday", today).expect("same weekday"),
            date(2026, 2, 24)
        );
        assert_eq!(
            parse_date_expr("march", today).expect("month"),
            date(2026, 3, 1)
        );
        // A month already begun resolves to next year.
        assert_eq!(
            parse_date_expr("february", today).expect("past month"),
            date(2027, 2, 1)
        );
    }

    #[test]
    fn weekday_header_rotates_to_first_weekday() {
        let cal = CalendarSystem::new(chrono_tz::UTC, Weekday::Mon);
        assert_eq!(
            cal.weekday_header(),
            vec!["Mo", "Tu", "We", "Th", "Fr", "Sa", "Su"]
        );
    }
}
