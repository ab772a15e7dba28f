use std::fmt;

use anyhow::anyhow;
use chrono::{Datelike, NaiveDate};
use serde::Serialize;

/// Visual state of a single day cell. `Hidden` marks filler days that pad
/// a week out to 7 cells; a hidden cell never becomes anything else.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DayStyle {
    Unselected,
    Selected,
    Disabled,
    Period,
    Hidden,
}

impl DayStyle {
    pub fn can_select(self) -> bool {
        !matches!(self, DayStyle::Disabled | DayStyle::Hidden)
    }

    pub fn is_selected(self) -> bool {
        self == DayStyle::Selected
    }

    pub fn is_period(self) -> bool {
        self == DayStyle::Period
    }

    pub fn is_hidden(self) -> bool {
        self == DayStyle::Hidden
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
pub struct DayCell {
    pub date: NaiveDate,
    pub style: DayStyle,
    pub count: Option<u32>,
}

impl DayCell {
    pub fn day(date: NaiveDate) -> Self {
        Self {
            date,
            style: DayStyle::Unselected,
            count: None,
        }
    }

    pub fn filler(date: NaiveDate) -> Self {
        Self {
            date,
            style: DayStyle::Hidden,
            count: None,
        }
    }
}

/// Always exactly seven cells; the builder never emits a partial week.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Week {
    pub days: [DayCell; 7],
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MonthGrid {
    pub weeks: Vec<Week>,
}

impl MonthGrid {
    pub fn cells(&self) -> impl Iterator<Item = &DayCell> {
        self.weeks.iter().flat_map(|week| week.days.iter())
    }

    pub fn cells_mut(&mut self) -> impl Iterator<Item = &mut DayCell> {
        self.weeks.iter_mut().flat_map(|week| week.days.iter_mut())
    }
}

/// Identifies a bundle by the calendar month it covers. Two bundles built
/// for any two dates in the same month compare equal, which is what window
/// growth dedup keys on.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BundleId {
    pub year: i32,
    pub month: u32,
}

impl fmt::Display for BundleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MonthBundle {
    pub month_start: NaiveDate,
    pub grid: MonthGrid,
}

impl MonthBundle {
    pub fn id(&self) -> BundleId {
        BundleId {
            year: self.month_start.year(),
            month: self.month_start.month(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, serde::Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    Single,
    Range,
}

impl std::str::FromStr for SelectionMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "single" => Ok(Self::Single),
            "range" => Ok(Self::Range),
            other => Err(anyhow!("invalid selection mode: {other} (expected single|range)")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, serde::Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NavigationMode {
    Paged,
    Scroll,
}

impl std::str::FromStr for NavigationMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "paged" => Ok(Self::Paged),
            "scroll" => Ok(Self::Scroll),
            other => Err(anyhow!("invalid navigation mode: {other} (expected paged|scroll)")),
        }
    }
}

/// Coarse selectability restriction, applied only when no explicit
/// allow-set is configured.
#[derive(Debug, Clone, Copy, Serialize, serde::Deserialize, PartialEq, Eq)]
pub enum DateRestriction {
    #[serde(rename = "past")]
    PastOnly,
    #[serde(rename = "future")]
    FutureOnly,
    #[serde(rename = "all")]
    AllAvailable,
}

impl DateRestriction {
    pub fn is_future_available(self) -> bool {
        matches!(self, Self::AllAvailable | Self::FutureOnly)
    }

    pub fn is_past_available(self) -> bool {
        matches!(self, Self::AllAvailable | Self::PastOnly)
    }
}

impl std::str::FromStr for DateRestriction {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "past" | "past-only" => Ok(Self::PastOnly),
            "future" | "future-only" => Ok(Self::FutureOnly),
            "all" | "none" => Ok(Self::AllAvailable),
            other => Err(anyhow!(
                "invalid date restriction: {other} (expected past|future|all)"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid test date")
    }

    #[test]
    fn hidden_and_disabled_are_not_selectable() {
        assert!(DayStyle::Unselected.can_select());
        assert!(DayStyle::Selected.can_select());
        assert!(DayStyle::Period.can_select());
        assert!(!DayStyle::Disabled.can_select());
        assert!(!DayStyle::Hidden.can_select());
    }

    #[test]
    fn bundle_ids_compare_by_calendar_month() {
        let a = BundleId { year: 2026, month: 9 };
        let b = BundleId { year: 2026, month: 9 };
        let c = BundleId { year: 2027, month: 9 };
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.to_string(), "2026-09");
    }

    #[test]
    fn restriction_direction_helpers() {
        assert!(DateRestriction::AllAvailable.is_future_available());
        assert!(DateRestriction::AllAvailable.is_past_available());
        assert!(DateRestriction::FutureOnly.is_future_available());
        assert!(!DateRestriction::FutureOnly.is_past_available());
        assert!(DateRestriction::PastOnly.is_past_available());
        assert!(!DateRestriction::PastOnly.is_future_available());
    }

    #[test]
    fn modes_parse_from_config_strings() {
        assert_eq!(
            "range".parse::<SelectionMode>().expect("parse"),
            SelectionMode::Range
        );
        assert_eq!(
            "Paged".parse::<NavigationMode>().expect("parse"),
            NavigationMode::Paged
        );
        assert_eq!(
            "past-only".parse::<DateRestriction>().expect("parse"),
            DateRestriction::PastOnly
        );
        assert!("weekly".parse::<SelectionMode>().is_err());
    }

    #[test]
    fn filler_cells_start_hidden_and_countless() {
        let cell = DayCell::filler(date(2026, 8, 31));
        assert!(cell.style.is_hidden());
        assert_eq!(cell.count, None);
    }
}
