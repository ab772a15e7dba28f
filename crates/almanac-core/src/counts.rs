use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use tracing::{debug, trace};

use crate::datetime::CalendarSystem;
use crate::model::{BundleId, MonthBundle, SelectionMode};

/// The external counts collaborator. Every method has an empty default so
/// hosts implement only what they need; a missing or failing provider is
/// always treated as "no data" by the coordinator, never as an error.
pub trait CountsProvider {
    /// Per-day counts for the given bundles. Keys are instants; the
    /// coordinator normalizes them to calendar days before merging.
    fn fetch_counts(&self, bundles: &[&MonthBundle]) -> anyhow::Result<HashMap<DateTime<Utc>, u32>> {
        let _ = bundles;
        Ok(HashMap::new())
    }

    /// Synchronous action-button label, used in range mode right after a
    /// selection change.
    fn action_label(&self, mode: SelectionMode, count: u32) -> Option<String> {
        let _ = (mode, count);
        None
    }

    /// Potentially slow label lookup, used in single mode.
    fn load_action_label(
        &self,
        mode: SelectionMode,
        selected: Option<NaiveDate>,
        count: u32,
    ) -> anyhow::Result<Option<String>> {
        let _ = (mode, selected, count);
        Ok(None)
    }

    /// Fire-and-forget commit notifications.
    fn on_commit_range(&self, start: Option<NaiveDate>, end: Option<NaiveDate>) {
        let _ = (start, end);
    }

    fn on_commit_single(&self, selected: Option<NaiveDate>) {
        let _ = selected;
    }
}

/// Collapses instant-keyed counts to day granularity in the calendar's
/// timezone. Same-day duplicates resolve last-write-wins; callers are
/// expected to supply day-unique keys anyway.
pub fn normalize_counts(
    raw: &HashMap<DateTime<Utc>, u32>,
    calendar: &CalendarSystem,
) -> HashMap<NaiveDate, u32> {
    let mut normalized = HashMap::with_capacity(raw.len());
    for (instant, count) in raw {
        normalized.insert(calendar.day_of(*instant), *count);
    }
    normalized
}

/// Overwrites `count` on every non-hidden cell whose date has an entry in
/// `day_counts`. Cells without a matching key keep whatever count they had;
/// styles are never touched; hidden filler never receives a count.
pub fn apply_counts<'a>(
    bundles: impl IntoIterator<Item = &'a mut MonthBundle>,
    day_counts: &HashMap<NaiveDate, u32>,
) {
    if day_counts.is_empty() {
        return;
    }

    for bundle in bundles {
        for cell in bundle.grid.cells_mut() {
            if cell.style.is_hidden() {
                continue;
            }
            if let Some(count) = day_counts.get(&cell.date) {
                trace!(date = %cell.date, count, "applying day count");
                cell.count = Some(*count);
            }
        }
    }
}

/// CLI counts provider backed by a JSON file of `"YYYY-MM-DD": count`
/// entries, filtered to the months of the requested bundles.
#[derive(Debug, Clone)]
pub struct FileCounts {
    path: PathBuf,
    timezone: Tz,
}

impl FileCounts {
    pub fn new(path: PathBuf, timezone: Tz) -> Self {
        Self { path, timezone }
    }
}

impl CountsProvider for FileCounts {
    fn fetch_counts(&self, bundles: &[&MonthBundle]) -> anyhow::Result<HashMap<DateTime<Utc>, u32>> {
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read counts file {}", self.path.display()))?;
        let parsed: HashMap<String, u32> = serde_json::from_str(&raw)
            .with_context(|| format!("invalid counts json in {}", self.path.display()))?;

        let months: BTreeSet<BundleId> = bundles.iter().map(|bundle| bundle.id()).collect();

        let mut out = HashMap::new();
        for (key, count) in parsed {
            let date = NaiveDate::parse_from_str(&key, "%Y-%m-%d")
                .with_context(|| format!("invalid date key {key:?} in counts file"))?;
            let id = BundleId {
                year: date.year(),
                month: date.month(),
            };
            if !months.contains(&id) {
                debug!(%date, "count outside requested months, skipping");
                continue;
            }
            out.insert(local_noon(date, self.timezone), count);
        }

        debug!(count = out.len(), file = %self.path.display(), "loaded day counts");
        Ok(out)
    }

    fn action_label(&self, mode: SelectionMode, count: u32) -> Option<String> {
        match mode {
            SelectionMode::Range => Some(format!("Book {count} slots")),
            SelectionMode::Single => None,
        }
    }

    fn load_action_label(
        &self,
        mode: SelectionMode,
        selected: Option<NaiveDate>,
        count: u32,
    ) -> anyhow::Result<Option<String>> {
        match (mode, selected) {
            (SelectionMode::Single, Some(date)) => Ok(Some(format!("Book {date} ({count})"))),
            _ => Ok(None),
        }
    }
}

// Noon keeps the instant inside the intended day for every real offset,
// unlike midnight which DST shifts can swallow.
fn local_noon(date: NaiveDate, timezone: Tz) -> DateTime<Utc> {
    let noon = NaiveTime::from_hms_opt(12, 0, 0).unwrap_or(NaiveTime::MIN);
    timezone
        .from_local_datetime(&date.and_time(noon))
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| date.and_time(noon).and_utc())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use chrono::{TimeZone, Weekday};

    use super::*;
    use crate::builder::MonthBuilder;
    use crate::model::DayStyle;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid test date")
    }

    fn calendar() -> CalendarSystem {
        CalendarSystem::new(chrono_tz::UTC, Weekday::Mon)
    }

    #[test]
    fn normalization_discards_time_of_day() {
        let cal = calendar();
        let mut raw = HashMap::new();
        let morning = Utc.with_ymd_and_hms(2026, 9, 14, 8, 30, 0).single().expect("instant");
        raw.insert(morning, 7);
        let normalized = normalize_counts(&raw, &cal);
        assert_eq!(normalized.get(&date(2026, 9, 14)), Some(&7));
    }

    #[test]
    fn merge_fills_matches_and_preserves_the_rest() {
        let builder = MonthBuilder::new(&calendar());
        let mut bundle = builder.bundle_for(date(2026, 9, 1));

        // Pre-existing count on a day the new mapping does not mention.
        for cell in bundle.grid.cells_mut() {
            if cell.date == date(2026, 9, 2) {
                cell.count = Some(9);
            }
        }

        let day_counts: HashMap<NaiveDate, u32> =
            [(date(2026, 9, 14), 5), (date(2026, 9, 15), 0)].into_iter().collect();
        apply_counts([&mut bundle], &day_counts);

        let count_of = |d: NaiveDate| {
            bundle
                .grid
                .cells()
                .find(|cell| cell.date == d && !cell.style.is_hidden())
                .and_then(|cell| cell.count)
        };
        assert_eq!(count_of(date(2026, 9, 14)), Some(5));
        assert_eq!(count_of(date(2026, 9, 15)), Some(0));
        assert_eq!(count_of(date(2026, 9, 2)), Some(9));
        assert_eq!(count_of(date(2026, 9, 3)), None);
    }

    #[test]
    fn hidden_cells_never_receive_counts() {
        let builder = MonthBuilder::new(&calendar());
        // September 2026 pads with 2026-08-31 and 2026-10-01..04.
        let mut bundle = builder.bundle_for(date(2026, 9, 1));
        let day_counts: HashMap<NaiveDate, u32> =
            [(date(2026, 8, 31), 3), (date(2026, 10, 1), 4)].into_iter().collect();
        apply_counts([&mut bundle], &day_counts);

        for cell in bundle.grid.cells() {
            if cell.style == DayStyle::Hidden {
                assert_eq!(cell.count, None, "filler {} got a count", cell.date);
            }
        }
    }

    #[test]
    fn file_counts_filters_to_requested_months() {
        let mut file = tempfile::NamedTempFile::new().expect("temp counts file");
        write!(
            file,
            r#"{{"2026-09-14": 5, "2026-09-20": 2, "2027-01-01": 9}}"#
        )
        .expect("write counts");

        let builder = MonthBuilder::new(&calendar());
        let bundle = builder.bundle_for(date(2026, 9, 1));
        let provider = FileCounts::new(file.path().to_path_buf(), chrono_tz::UTC);

        let raw = provider.fetch_counts(&[&bundle]).expect("fetch");
        let normalized = normalize_counts(&raw, &calendar());
        assert_eq!(normalized.len(), 2);
        assert_eq!(normalized.get(&date(2026, 9, 14)), Some(&5));
        assert!(!normalized.contains_key(&date(2027, 1, 1)));
    }

    #[test]
    fn missing_file_is_an_error_for_the_caller_to_degrade() {
        let provider = FileCounts::new(PathBuf::from("/nonexistent/counts.json"), chrono_tz::UTC);
        let builder = MonthBuilder::new(&calendar());
        let bundle = builder.bundle_for(date(2026, 9, 1));
        assert!(provider.fetch_counts(&[&bundle]).is_err());
    }
}
