use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Days, NaiveDate, Utc, Weekday};
use tracing::{debug, info, instrument, warn};

use crate::availability::AvailabilityPolicy;
use crate::builder::MonthBuilder;
use crate::counts::{self, CountsProvider};
use crate::datetime::{CalendarSystem, days_in_month, is_strictly_between, normalized_weekday_index};
use crate::model::{DayCell, DayStyle, MonthBundle, NavigationMode, SelectionMode};
use crate::selection::Selection;
use crate::window::Window;

/// The single owner of all calendar state: window, selection, availability,
/// action label. Every mutation happens through it, and it repaints the
/// loaded bundles after each one.
pub struct CalendarManager {
    selection_mode: SelectionMode,
    calendar: CalendarSystem,
    builder: MonthBuilder,
    policy: AvailabilityPolicy,
    window: Window,
    selection: Selection,
    action_label: Option<String>,
    provider: Option<Arc<dyn CountsProvider>>,
}

impl CalendarManager {
    pub fn new(
        selection_mode: SelectionMode,
        calendar: CalendarSystem,
        navigation_mode: NavigationMode,
        policy: AvailabilityPolicy,
    ) -> Self {
        let builder = MonthBuilder::new(&calendar);
        Self {
            selection_mode,
            calendar,
            builder,
            policy,
            window: Window::new(navigation_mode),
            selection: Selection::Empty,
            action_label: None,
            provider: None,
        }
    }

    /// Attaches the counts collaborator. The manager only holds a shared
    /// handle; lifetime stays the host's business, and no provider simply
    /// means no counts and no labels.
    pub fn with_provider(mut self, provider: Arc<dyn CountsProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn calendar(&self) -> &CalendarSystem {
        &self.calendar
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn selection_mode(&self) -> SelectionMode {
        self.selection_mode
    }

    pub fn action_label(&self) -> Option<&str> {
        self.action_label.as_deref()
    }

    /// All loaded bundles, chronological.
    pub fn bundles(&self) -> Vec<&MonthBundle> {
        self.window.bundles()
    }

    /// The bundle under the paged cursor; `None` in scroll mode.
    pub fn current_bundle(&self) -> Option<&MonthBundle> {
        match &self.window {
            Window::Paged(paged) => paged.current(),
            Window::Scroll(_) => None,
        }
    }

    /// Seeds the window for the configured navigation mode, paints it, and
    /// requests counts for everything just materialized.
    #[instrument(skip(self))]
    pub fn setup(&mut self) {
        let today = self.calendar.today();
        let added = match &mut self.window {
            Window::Paged(paged) => paged.jump_to(&self.builder, today),
            Window::Scroll(scroll) => {
                let include_past = self.policy.restriction().is_past_available();
                scroll.seed(&self.builder, today, include_past)
            }
        };
        info!(months = added.len(), "calendar window seeded");
        self.repaint();
        self.fetch_and_apply(added);
    }

    /// The single selection entry point. Updates the action label the way
    /// the mode demands and repaints afterwards.
    #[instrument(skip(self))]
    pub fn select(&mut self, date: NaiveDate) {
        self.selection.select(self.selection_mode, date);
        debug!(selection = ?self.selection, "selection updated");

        match self.selection_mode {
            SelectionMode::Single => self.refresh_single_action_label(),
            SelectionMode::Range => {
                let count = self.total_selected_count();
                self.action_label = self
                    .provider
                    .as_ref()
                    .and_then(|provider| provider.action_label(SelectionMode::Range, count));
            }
        }

        self.repaint();
    }

    #[instrument(skip(self))]
    pub fn reset(&mut self) {
        self.selection.reset();
        self.action_label = None;
        self.repaint();
    }

    pub fn is_reset_enabled(&self) -> bool {
        self.selection.start().is_some()
    }

    /// Range mode only: the action button shows once a range has begun and
    /// the selected days carry at least one count.
    pub fn is_action_visible(&self) -> bool {
        self.selection_mode == SelectionMode::Range
            && self.selection.start().is_some()
            && self.total_selected_count() > 0
    }

    /// Notifies the provider of an explicit user commit.
    pub fn commit_action(&self) {
        let Some(provider) = &self.provider else {
            return;
        };
        match self.selection_mode {
            SelectionMode::Range => {
                info!(start = ?self.selection.start(), end = ?self.selection.end(), "range committed");
                provider.on_commit_range(self.selection.start(), self.selection.end());
            }
            SelectionMode::Single => {
                info!(selected = ?self.selection.start(), "selection committed");
                provider.on_commit_single(self.selection.start());
            }
        }
    }

    // --- paged navigation -------------------------------------------------

    #[instrument(skip(self))]
    pub fn navigate_to_previous_month(&mut self) {
        let added = match &mut self.window {
            Window::Paged(paged) => paged.go_to_previous(&self.builder),
            Window::Scroll(_) => {
                warn!("previous-month navigation is a paged-mode operation");
                None
            }
        };
        self.repaint();
        if let Some(start) = added {
            self.fetch_and_apply(vec![start]);
        }
    }

    #[instrument(skip(self))]
    pub fn navigate_to_next_month(&mut self) {
        let added = match &mut self.window {
            Window::Paged(paged) => paged.go_to_next(&self.builder),
            Window::Scroll(_) => {
                warn!("next-month navigation is a paged-mode operation");
                None
            }
        };
        self.repaint();
        if let Some(start) = added {
            self.fetch_and_apply(vec![start]);
        }
    }

    /// Replaces the paged window with the three months around `date`.
    #[instrument(skip(self))]
    pub fn jump_to(&mut self, date: NaiveDate) {
        let added = match &mut self.window {
            Window::Paged(paged) => paged.jump_to(&self.builder, date),
            Window::Scroll(_) => {
                warn!("jump is a paged-mode operation");
                Vec::new()
            }
        };
        self.repaint();
        self.fetch_and_apply(added);
    }

    pub fn can_navigate_previous(&self) -> bool {
        let today = self.calendar.today();
        match &self.window {
            Window::Paged(paged) => paged
                .current()
                .is_some_and(|bundle| self.policy.can_navigate_previous(bundle.month_start, today)),
            Window::Scroll(_) => self.policy.restriction().is_past_available(),
        }
    }

    pub fn can_navigate_next(&self) -> bool {
        let today = self.calendar.today();
        match &self.window {
            Window::Paged(paged) => paged
                .next_month_start()
                .is_some_and(|start| self.policy.can_navigate_next(start, today)),
            Window::Scroll(_) => self.policy.restriction().is_future_available(),
        }
    }

    // --- scroll growth ----------------------------------------------------

    /// Appends `count` future months, if the restriction leaves the future
    /// open. Safe to call repeatedly from a scroll-edge trigger.
    #[instrument(skip(self))]
    pub fn extend_future(&mut self, count: u32) {
        if !self.policy.restriction().is_future_available() {
            debug!("future growth blocked by date restriction");
            return;
        }
        let added = match &mut self.window {
            Window::Scroll(scroll) => scroll.grow_forward(&self.builder, count),
            Window::Paged(_) => {
                warn!("future growth is a scroll-mode operation");
                Vec::new()
            }
        };
        if added.is_empty() {
            return;
        }
        self.repaint();
        self.fetch_and_apply(added);
    }

    /// Prepends `count` past months, if the restriction leaves the past
    /// open.
    #[instrument(skip(self))]
    pub fn extend_past(&mut self, count: u32) {
        if !self.policy.restriction().is_past_available() {
            debug!("past growth blocked by date restriction");
            return;
        }
        let added = match &mut self.window {
            Window::Scroll(scroll) => scroll.grow_backward(&self.builder, count),
            Window::Paged(_) => {
                warn!("past growth is a scroll-mode operation");
                Vec::new()
            }
        };
        if added.is_empty() {
            return;
        }
        self.repaint();
        self.fetch_and_apply(added);
    }

    // --- counts -----------------------------------------------------------

    /// Merges instant-keyed counts into every loaded bundle. Late results
    /// are welcome here: days belonging to bundles that have been evicted
    /// simply find no cell and vanish.
    pub fn apply_counts(&mut self, raw: &HashMap<DateTime<Utc>, u32>) {
        let day_counts = counts::normalize_counts(raw, &self.calendar);
        counts::apply_counts(self.window.bundles_mut(), &day_counts);
    }

    /// Sum of counts over all loaded cells the selection includes.
    pub fn total_selected_count(&self) -> u32 {
        if self.selection.is_empty() {
            return 0;
        }
        self.window
            .bundles()
            .iter()
            .flat_map(|bundle| bundle.grid.cells())
            .filter(|cell| self.selection.includes(cell.date))
            .map(|cell| cell.count.unwrap_or(0))
            .sum()
    }

    pub fn are_selected_dates_adjacent(&self) -> bool {
        self.selection.are_selected_dates_adjacent()
    }

    // --- per-cell queries for hosts ---------------------------------------

    /// A period-styled day sitting on the first column of the week.
    pub fn is_left_edge_of_range(&self, day: &DayCell) -> bool {
        day.style.is_period()
            && normalized_weekday_index(day.date, self.calendar.first_weekday) == 0
    }

    /// A period-styled day sitting on the last column of the week.
    pub fn is_right_edge_of_range(&self, day: &DayCell) -> bool {
        day.style.is_period()
            && normalized_weekday_index(day.date, self.calendar.first_weekday) == 6
    }

    /// A period-styled day whose previous day is the range start.
    pub fn is_range_start_boundary(&self, day: &DayCell) -> bool {
        if !day.style.is_period() {
            return false;
        }
        match (day.date.checked_sub_days(Days::new(1)), self.selection.start()) {
            (Some(prev), Some(start)) => prev == start,
            _ => false,
        }
    }

    /// A period-styled day whose next day is the range end.
    pub fn is_range_end_boundary(&self, day: &DayCell) -> bool {
        if !day.style.is_period() {
            return false;
        }
        match (day.date.checked_add_days(Days::new(1)), self.selection.end()) {
            (Some(next), Some(end)) => next == end,
            _ => false,
        }
    }

    pub fn is_weekend(&self, day: &DayCell) -> bool {
        matches!(day.date.weekday(), Weekday::Sat | Weekday::Sun)
    }

    pub fn is_today(&self, day: &DayCell) -> bool {
        day.date == self.calendar.today()
    }

    pub fn is_first_month_day(&self, day: &DayCell) -> bool {
        day.date.day() == 1
    }

    pub fn is_last_month_day(&self, day: &DayCell) -> bool {
        day.date.day() == days_in_month(day.date)
    }

    // --- painting ---------------------------------------------------------

    /// Recomputes every cell's style from the current selection and
    /// availability. Hidden filler never changes.
    pub fn repaint(&mut self) {
        let today = self.calendar.today();
        let selection = self.selection;
        let policy = &self.policy;
        for bundle in self.window.bundles_mut() {
            for cell in bundle.grid.cells_mut() {
                cell.style = styled(cell.date, cell.style, selection, policy, today);
            }
        }
    }

    fn refresh_single_action_label(&mut self) {
        let count = self.total_selected_count();
        let selected = self.selection.start();
        self.action_label = match &self.provider {
            Some(provider) => {
                match provider.load_action_label(SelectionMode::Single, selected, count) {
                    Ok(label) => label,
                    Err(err) => {
                        warn!(error = %err, "action label load failed");
                        None
                    }
                }
            }
            None => None,
        };
    }

    fn fetch_and_apply(&mut self, added: Vec<NaiveDate>) {
        if added.is_empty() {
            return;
        }
        let Some(provider) = self.provider.clone() else {
            return;
        };

        let raw = {
            let bundles: Vec<&MonthBundle> = self
                .window
                .bundles()
                .into_iter()
                .filter(|bundle| added.contains(&bundle.month_start))
                .collect();
            match provider.fetch_counts(&bundles) {
                Ok(raw) => raw,
                Err(err) => {
                    warn!(error = %err, "counts fetch failed, treating as empty");
                    HashMap::new()
                }
            }
        };

        if raw.is_empty() {
            return;
        }
        self.apply_counts(&raw);
    }
}

fn styled(
    date: NaiveDate,
    original: DayStyle,
    selection: Selection,
    policy: &AvailabilityPolicy,
    today: NaiveDate,
) -> DayStyle {
    if original == DayStyle::Hidden {
        return DayStyle::Hidden;
    }

    if !policy.is_selectable(date, today) {
        return DayStyle::Disabled;
    }

    match selection {
        Selection::RangeClosed(start, end) => {
            if date == start || date == end {
                DayStyle::Selected
            } else if is_strictly_between(date, start, end) {
                DayStyle::Period
            } else {
                DayStyle::Unselected
            }
        }
        Selection::Single(start) | Selection::RangeOpen(start) => {
            if date == start {
                DayStyle::Selected
            } else {
                DayStyle::Unselected
            }
        }
        Selection::Empty => DayStyle::Unselected,
    }
}
