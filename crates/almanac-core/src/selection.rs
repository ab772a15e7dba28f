use chrono::{Days, NaiveDate};
use serde::Serialize;

use crate::datetime::is_strictly_between;
use crate::model::SelectionMode;

/// Current selection. The variants make the illegal shapes impossible: an
/// end date can never exist without a start, and a closed range always has
/// `start <= end` because closing is the only way to produce one.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    Empty,
    Single(NaiveDate),
    RangeOpen(NaiveDate),
    RangeClosed(NaiveDate, NaiveDate),
}

impl Selection {
    pub fn start(&self) -> Option<NaiveDate> {
        match *self {
            Selection::Empty => None,
            Selection::Single(start)
            | Selection::RangeOpen(start)
            | Selection::RangeClosed(start, _) => Some(start),
        }
    }

    pub fn end(&self) -> Option<NaiveDate> {
        match *self {
            Selection::RangeClosed(_, end) => Some(end),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Selection::Empty
    }

    /// The single mutating entry point. In single mode every call replaces
    /// the selection. In range mode: a closed range is immutable until
    /// reset; selecting the open anchor again deselects it; selecting an
    /// earlier day replaces the anchor rather than closing backwards;
    /// anything later closes the range.
    pub fn select(&mut self, mode: SelectionMode, date: NaiveDate) {
        *self = match mode {
            SelectionMode::Single => Selection::Single(date),
            SelectionMode::Range => match *self {
                Selection::RangeClosed(start, end) => Selection::RangeClosed(start, end),
                Selection::Empty | Selection::Single(_) => Selection::RangeOpen(date),
                Selection::RangeOpen(start) => {
                    if date == start {
                        Selection::Empty
                    } else if date < start {
                        Selection::RangeOpen(date)
                    } else {
                        Selection::RangeClosed(start, date)
                    }
                }
            },
        };
    }

    pub fn reset(&mut self) {
        *self = Selection::Empty;
    }

    /// Whether `date` falls inside the selection under the active shape:
    /// a lone start matches only itself; a closed range matches both bounds
    /// and everything strictly between.
    pub fn includes(&self, date: NaiveDate) -> bool {
        match *self {
            Selection::Empty => false,
            Selection::Single(start) | Selection::RangeOpen(start) => date == start,
            Selection::RangeClosed(start, end) => {
                date == start || date == end || is_strictly_between(date, start, end)
            }
        }
    }

    /// True when start and end are consecutive calendar days.
    pub fn are_selected_dates_adjacent(&self) -> bool {
        match *self {
            Selection::RangeClosed(start, end) => {
                start.checked_add_days(Days::new(1)) == Some(end)
            }
            _ => false,
        }
    }
}
