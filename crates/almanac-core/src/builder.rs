use chrono::{Days, Months, NaiveDate, Weekday};

use crate::datetime::{
    CalendarSystem, days_in_month, normalized_weekday_index, start_of_month, start_of_next_month,
    start_of_previous_month,
};
use crate::model::{DayCell, MonthBundle, MonthGrid, Week};

/// Materializes month grids: every week has exactly 7 cells, padded with
/// hidden filler days from the neighboring months.
#[derive(Debug, Clone)]
pub struct MonthBuilder {
    first_weekday: Weekday,
}

impl MonthBuilder {
    pub fn new(calendar: &CalendarSystem) -> Self {
        Self {
            first_weekday: calendar.first_weekday,
        }
    }

    pub fn build_month(&self, date: NaiveDate) -> MonthGrid {
        let month_start = start_of_month(date);
        let total_days = days_in_month(month_start);
        let leading = normalized_weekday_index(month_start, self.first_weekday);

        let mut cells: Vec<DayCell> = Vec::with_capacity(42); // up to 6 weeks

        // Leading filler from the tail of the previous month, oldest first.
        if leading > 0 {
            let prev_start = start_of_previous_month(month_start);
            let prev_days = days_in_month(prev_start);
            for day in (prev_days - leading + 1)..=prev_days {
                if let Some(date) = prev_start.checked_add_days(Days::new(u64::from(day - 1))) {
                    cells.push(DayCell::filler(date));
                }
            }
        }

        for day in 0..total_days {
            if let Some(date) = month_start.checked_add_days(Days::new(u64::from(day))) {
                cells.push(DayCell::day(date));
            }
        }

        // Trailing filler from the head of the next month to complete the
        // last week.
        let remainder = cells.len() % 7;
        if remainder != 0 {
            let next_start = start_of_next_month(month_start);
            for day in 0..(7 - remainder) {
                if let Some(date) = next_start.checked_add_days(Days::new(day as u64)) {
                    cells.push(DayCell::filler(date));
                }
            }
        }

        let weeks = cells
            .chunks_exact(7)
            .filter_map(|chunk| <[DayCell; 7]>::try_from(chunk).ok())
            .map(|days| Week { days })
            .collect();

        MonthGrid { weeks }
    }

    pub fn bundle_for(&self, date: NaiveDate) -> MonthBundle {
        let month_start = start_of_month(date);
        MonthBundle {
            month_start,
            grid: self.build_month(month_start),
        }
    }

    /// Previous, current, and next month around `date`, in order.
    pub fn months_around(&self, date: NaiveDate) -> Vec<MonthBundle> {
        let current = start_of_month(date);
        vec![
            self.bundle_for(start_of_previous_month(current)),
            self.bundle_for(current),
            self.bundle_for(start_of_next_month(current)),
        ]
    }

    /// The `count` months following `after`, earliest first.
    pub fn append_next(&self, after: &MonthBundle, count: u32) -> Vec<MonthBundle> {
        (1..=count)
            .filter_map(|offset| {
                after
                    .month_start
                    .checked_add_months(Months::new(offset))
                    .map(|start| self.bundle_for(start))
            })
            .collect()
    }

    /// The `count` months preceding `before`, earliest first so callers can
    /// splice the result straight onto the front of a buffer.
    pub fn prepend_previous(&self, before: &MonthBundle, count: u32) -> Vec<MonthBundle> {
        (1..=count)
            .rev()
            .filter_map(|offset| {
                before
                    .month_start
                    .checked_sub_months(Months::new(offset))
                    .map(|start| self.bundle_for(start))
            })
            .collect()
    }
}
