use std::collections::BTreeSet;

use chrono::{Days, NaiveDate};

use crate::datetime::{days_in_month, start_of_month, start_of_previous_month};
use crate::model::DateRestriction;

/// Decides which days are selectable and which navigation directions stay
/// open. An explicit allow-set, when present, overrides the coarse
/// restriction for both questions.
///
/// Every query takes `today` explicitly so callers (and tests) control the
/// reference day.
#[derive(Debug, Clone)]
pub struct AvailabilityPolicy {
    allow: Option<BTreeSet<NaiveDate>>,
    restriction: DateRestriction,
}

impl AvailabilityPolicy {
    pub fn new(allow: Option<BTreeSet<NaiveDate>>, restriction: DateRestriction) -> Self {
        Self { allow, restriction }
    }

    pub fn unrestricted() -> Self {
        Self::new(None, DateRestriction::AllAvailable)
    }

    pub fn restriction(&self) -> DateRestriction {
        self.restriction
    }

    pub fn has_allow_set(&self) -> bool {
        self.allow.is_some()
    }

    pub fn is_selectable(&self, date: NaiveDate, today: NaiveDate) -> bool {
        if let Some(allow) = &self.allow {
            return allow.contains(&date);
        }

        match self.restriction {
            DateRestriction::PastOnly => date <= today,
            DateRestriction::FutureOnly => date >= today,
            DateRestriction::AllAvailable => true,
        }
    }

    /// Scans every day of the month; an allow-set can have gaps spanning
    /// whole months, so this is never assumed.
    pub fn month_has_selectable_date(&self, month_start: NaiveDate, today: NaiveDate) -> bool {
        let start = start_of_month(month_start);
        (0..days_in_month(start)).any(|offset| {
            start
                .checked_add_days(Days::new(u64::from(offset)))
                .is_some_and(|date| self.is_selectable(date, today))
        })
    }

    /// Whether "go to the previous month" should be offered while
    /// `displayed_month_start` is on screen.
    pub fn can_navigate_previous(&self, displayed_month_start: NaiveDate, today: NaiveDate) -> bool {
        if self.allow.is_some() {
            let prev = start_of_previous_month(displayed_month_start);
            return self.month_has_selectable_date(prev, today);
        }

        match self.restriction {
            DateRestriction::FutureOnly => displayed_month_start > today,
            _ => true,
        }
    }

    /// Whether navigating into the month starting at `next_month_start`
    /// should be offered.
    pub fn can_navigate_next(&self, next_month_start: NaiveDate, today: NaiveDate) -> bool {
        if self.allow.is_some() {
            return self.month_has_selectable_date(next_month_start, today);
        }

        match self.restriction {
            DateRestriction::PastOnly => start_of_month(next_month_start) <= start_of_month(today),
            _ => true,
        }
    }
}
