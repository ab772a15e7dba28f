pub mod availability;
pub mod builder;
pub mod cli;
pub mod config;
pub mod counts;
pub mod datetime;
pub mod manager;
pub mod model;
pub mod render;
pub mod selection;
pub mod window;

use std::ffi::OsString;
use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{Context, anyhow};
use clap::Parser;
use serde::Serialize;
use tracing::{info, warn};

use crate::cli::{Command, GlobalCli};
use crate::manager::CalendarManager;
use crate::model::{MonthBundle, NavigationMode};
use crate::render::Renderer;
use crate::selection::Selection;

#[tracing::instrument(skip_all)]
pub fn run(raw_args: Vec<OsString>) -> anyhow::Result<()> {
    let cli = GlobalCli::parse_from(raw_args);

    cli::init_tracing(cli.verbose, cli.quiet)?;
    info!(verbose = cli.verbose, quiet = cli.quiet, "starting almanac CLI");

    let cfg = config::Config::load(cli.config.as_deref())?;

    let timezone = match &cli.timezone {
        Some(raw) => datetime::parse_timezone(raw)?,
        None => cfg.timezone()?,
    };
    let first_weekday = match &cli.first_weekday {
        Some(raw) => datetime::parse_weekday_name(&raw.to_ascii_lowercase())
            .ok_or_else(|| anyhow!("invalid --first-weekday: {raw:?}"))?,
        None => cfg.first_weekday()?,
    };

    let mut calendar = datetime::CalendarSystem::new(timezone, first_weekday);
    if let Some(names) = cfg.month_names.clone() {
        calendar = calendar.with_month_names(names);
    }
    if let Some(names) = cfg.weekday_names.clone() {
        calendar = calendar.with_weekday_names(names);
    }
    if let Some(today) = cli.today {
        calendar = calendar.with_today(today);
    }

    let selection_mode = cli.mode.unwrap_or_else(|| cfg.selection_mode());
    let restriction = cli.restrict.unwrap_or_else(|| cfg.restriction());
    let allow = if cli.allow.is_empty() {
        cfg.allow_set()
    } else {
        Some(cli.allow.iter().copied().collect())
    };
    let policy = availability::AvailabilityPolicy::new(allow, restriction);

    let command = cli.command.unwrap_or(Command::Show {
        back: 0,
        ahead: 0,
        select: vec![],
        json: false,
    });

    let mut navigation = cli.nav.or(cfg.navigation).unwrap_or(match command {
        Command::Show { .. } => NavigationMode::Scroll,
        Command::Page { .. } => NavigationMode::Paged,
    });
    if matches!(command, Command::Page { .. }) && navigation == NavigationMode::Scroll {
        warn!("page requires the paged window, overriding navigation mode");
        navigation = NavigationMode::Paged;
    }

    let mut manager = CalendarManager::new(selection_mode, calendar, navigation, policy);
    if let Some(path) = cli.counts.clone().or_else(|| cfg.counts_file.clone()) {
        manager = manager.with_provider(Arc::new(counts::FileCounts::new(path, timezone)));
    }

    let mut renderer = Renderer::new(&cfg)?;

    match command {
        Command::Show {
            back,
            ahead,
            select,
            json,
        } => run_show(&mut manager, &mut renderer, back, ahead, &select, json)?,
        Command::Page {
            jump,
            next,
            prev,
            select,
            json,
        } => run_page(
            &mut manager,
            &mut renderer,
            jump.as_deref(),
            next,
            prev,
            &select,
            json,
        )?,
    }

    info!("done");
    Ok(())
}

fn run_show(
    manager: &mut CalendarManager,
    renderer: &mut Renderer,
    back: u32,
    ahead: u32,
    select: &[String],
    json: bool,
) -> anyhow::Result<()> {
    manager.setup();
    if back > 0 {
        manager.extend_past(back);
    }
    if ahead > 0 {
        manager.extend_future(ahead);
    }
    apply_selections(manager, select)?;

    if json {
        print_json(manager, manager.bundles())
    } else {
        renderer.print_calendar(manager)
    }
}

fn run_page(
    manager: &mut CalendarManager,
    renderer: &mut Renderer,
    jump: Option<&str>,
    next: u32,
    prev: u32,
    select: &[String],
    json: bool,
) -> anyhow::Result<()> {
    match jump {
        Some(expr) => {
            let today = manager.calendar().today();
            let date = datetime::parse_date_expr(expr, today)
                .with_context(|| format!("invalid --jump expression: {expr}"))?;
            manager.jump_to(date);
        }
        None => manager.setup(),
    }

    for _ in 0..prev {
        if !manager.can_navigate_previous() {
            warn!("previous month is unavailable, stopping");
            break;
        }
        manager.navigate_to_previous_month();
    }
    for _ in 0..next {
        if !manager.can_navigate_next() {
            warn!("next month is unavailable, stopping");
            break;
        }
        manager.navigate_to_next_month();
    }

    apply_selections(manager, select)?;

    if json {
        let months: Vec<&MonthBundle> = manager.current_bundle().into_iter().collect();
        print_json(manager, months)
    } else {
        renderer.print_current_month(manager)
    }
}

fn apply_selections(manager: &mut CalendarManager, exprs: &[String]) -> anyhow::Result<()> {
    let today = manager.calendar().today();
    for expr in exprs {
        let date = datetime::parse_date_expr(expr, today)
            .with_context(|| format!("invalid --select expression: {expr}"))?;
        manager.select(date);
    }
    Ok(())
}

#[derive(Serialize)]
struct ExportView<'a> {
    months: Vec<&'a MonthBundle>,
    selection: Selection,
    total_selected_count: u32,
    action_label: Option<&'a str>,
}

fn print_json(manager: &CalendarManager, months: Vec<&MonthBundle>) -> anyhow::Result<()> {
    let view = ExportView {
        months,
        selection: manager.selection(),
        total_selected_count: manager.total_selected_count(),
        action_label: manager.action_label(),
    };

    let mut out = io::stdout().lock();
    serde_json::to_writer_pretty(&mut out, &view).context("failed to serialize calendar")?;
    writeln!(out)?;
    Ok(())
}
