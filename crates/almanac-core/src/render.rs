use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use chrono::{Datelike, NaiveDate};
use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::datetime::CalendarSystem;
use crate::manager::CalendarManager;
use crate::model::{DayStyle, MonthBundle};

// Two digits, one count marker, one separator.
const CELL_WIDTH: usize = 4;
const GRID_WIDTH: usize = 7 * CELL_WIDTH - 1;

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color_cfg = cfg.color.clone().unwrap_or_else(|| "on".to_string());
        let color = match color_cfg.to_ascii_lowercase().as_str() {
            "on" | "yes" | "true" | "1" => true,
            "off" | "no" | "false" | "0" => false,
            other => return Err(anyhow!("invalid color setting: {other}")),
        };

        Ok(Self { color })
    }

    /// Prints every loaded month followed by the selection footer.
    #[tracing::instrument(skip(self, manager))]
    pub fn print_calendar(&mut self, manager: &CalendarManager) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        let today = manager.calendar().today();

        let bundles = manager.bundles();
        for (idx, bundle) in bundles.iter().enumerate() {
            if idx > 0 {
                writeln!(out)?;
            }
            self.write_month(&mut out, manager.calendar(), bundle, today)?;
        }

        self.write_footer(&mut out, manager)?;
        Ok(())
    }

    /// Prints only the month under the paged cursor, with the footer.
    #[tracing::instrument(skip(self, manager))]
    pub fn print_current_month(&mut self, manager: &CalendarManager) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        let today = manager.calendar().today();

        if let Some(bundle) = manager.current_bundle() {
            self.write_month(&mut out, manager.calendar(), bundle, today)?;
        }

        self.write_footer(&mut out, manager)?;
        Ok(())
    }

    fn write_month<W: Write>(
        &self,
        writer: &mut W,
        calendar: &CalendarSystem,
        bundle: &MonthBundle,
        today: NaiveDate,
    ) -> anyhow::Result<()> {
        let title = format!(
            "{} {}",
            calendar.month_name(bundle.month_start.month()),
            bundle.month_start.year()
        );
        let pad = GRID_WIDTH.saturating_sub(UnicodeWidthStr::width(title.as_str())) / 2;
        writeln!(writer, "{}{}", " ".repeat(pad), title)?;

        for label in calendar.weekday_header() {
            write!(writer, "{label:>3} ")?;
        }
        writeln!(writer)?;

        for week in &bundle.grid.weeks {
            for cell in &week.days {
                if cell.style.is_hidden() {
                    write!(writer, "{}", " ".repeat(CELL_WIDTH))?;
                    continue;
                }

                let marker = if cell.count.unwrap_or(0) > 0 { "*" } else { " " };
                let text = format!("{:>2}{marker}", cell.date.day());
                let painted = match cell.style {
                    DayStyle::Selected => self.paint(&text, "7"),
                    DayStyle::Period => self.paint(&text, "36"),
                    DayStyle::Disabled => self.paint(&text, "90"),
                    DayStyle::Unselected if cell.date == today => self.paint(&text, "33"),
                    _ => text,
                };
                write!(writer, "{painted} ")?;
            }
            writeln!(writer)?;
        }

        Ok(())
    }

    fn write_footer<W: Write>(
        &self,
        writer: &mut W,
        manager: &CalendarManager,
    ) -> anyhow::Result<()> {
        let selection = manager.selection();
        match (selection.start(), selection.end()) {
            (Some(start), Some(end)) => {
                writeln!(
                    writer,
                    "selected  {start} .. {end} (count {})",
                    manager.total_selected_count()
                )?;
            }
            (Some(start), None) => {
                writeln!(
                    writer,
                    "selected  {start} (count {})",
                    manager.total_selected_count()
                )?;
            }
            _ => {}
        }

        if let Some(label) = manager.action_label() {
            writeln!(writer, "action    {label}")?;
        }

        writeln!(
            writer,
            "navigate  prev {} / next {}",
            if manager.can_navigate_previous() { "ok" } else { "--" },
            if manager.can_navigate_next() { "ok" } else { "--" },
        )?;

        Ok(())
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color || !io::stdout().is_terminal() {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

#[cfg(test)]
mod tests {
    use chrono::Weekday;

    use super::*;
    use crate::builder::MonthBuilder;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid test date")
    }

    fn renderer() -> Renderer {
        Renderer { color: false }
    }

    #[test]
    fn color_setting_validates() {
        let mut cfg = Config::default();
        assert!(Renderer::new(&cfg).expect("default").color);

        cfg.color = Some("off".to_string());
        assert!(!Renderer::new(&cfg).expect("off").color);

        cfg.color = Some("maybe".to_string());
        assert!(Renderer::new(&cfg).is_err());
    }

    #[test]
    fn month_grid_lines_up_seven_columns() {
        let calendar = CalendarSystem::new(chrono_tz::UTC, Weekday::Mon);
        let builder = MonthBuilder::new(&calendar);
        let bundle = builder.bundle_for(date(2026, 9, 1));

        let mut out = Vec::new();
        renderer()
            .write_month(&mut out, &calendar, &bundle, date(2026, 9, 15))
            .expect("render month");
        let text = String::from_utf8(out).expect("utf8");
        let lines: Vec<&str> = text.lines().collect();

        assert!(lines[0].contains("September 2026"));
        assert_eq!(lines[1].trim(), "Mo  Tu  We  Th  Fr  Sa  Su");
        // Header plus five weeks.
        assert_eq!(lines.len(), 7);
        // 2026-09-01 is a Tuesday, so the first body line starts blank.
        assert!(lines[2].starts_with("    "));
        assert!(lines[2].contains(" 1"));
        assert!(lines[6].contains("30"));
        // Trailing October filler stays invisible.
        assert!(!text.contains("filler"));
    }

    #[test]
    fn counted_days_carry_a_marker() {
        let calendar = CalendarSystem::new(chrono_tz::UTC, Weekday::Mon);
        let builder = MonthBuilder::new(&calendar);
        let mut bundle = builder.bundle_for(date(2026, 9, 1));
        for cell in bundle.grid.cells_mut() {
            if cell.date == date(2026, 9, 14) {
                cell.count = Some(3);
            }
        }

        let mut out = Vec::new();
        renderer()
            .write_month(&mut out, &calendar, &bundle, date(2026, 9, 15))
            .expect("render month");
        let text = String::from_utf8(out).expect("utf8");
        assert!(text.contains("14*"));
        assert!(text.contains("13 "));
    }
}
