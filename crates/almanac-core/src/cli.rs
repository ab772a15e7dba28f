use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use chrono::NaiveDate;
use clap::{ArgAction, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::model::{DateRestriction, NavigationMode, SelectionMode};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "almanac",
    version,
    about = "Terminal month-grid calendar with windowed navigation and selection",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count)]
    pub quiet: u8,

    /// Config file path; defaults to ALMANAC_CONFIG, ./almanac.toml, then
    /// the user config directory.
    #[arg(long = "config")]
    pub config: Option<PathBuf>,

    /// IANA timezone id, e.g. Europe/Berlin.
    #[arg(long = "timezone")]
    pub timezone: Option<String>,

    /// Weekday that opens the week, e.g. monday.
    #[arg(long = "first-weekday")]
    pub first_weekday: Option<String>,

    /// Selection mode: single or range.
    #[arg(
        long = "mode",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<SelectionMode>())
    )]
    pub mode: Option<SelectionMode>,

    /// Navigation mode: paged or scroll.
    #[arg(
        long = "nav",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<NavigationMode>())
    )]
    pub nav: Option<NavigationMode>,

    /// Date restriction: past, future, or all.
    #[arg(
        long = "restrict",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<DateRestriction>())
    )]
    pub restrict: Option<DateRestriction>,

    /// Explicitly selectable date (repeatable); overrides --restrict.
    #[arg(long = "allow", action = ArgAction::Append)]
    pub allow: Vec<NaiveDate>,

    /// JSON counts file, {"YYYY-MM-DD": n, ...}.
    #[arg(long = "counts")]
    pub counts: Option<PathBuf>,

    /// Pin "today" for reproducible output.
    #[arg(long = "today")]
    pub today: Option<NaiveDate>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print the month window around today.
    Show {
        /// Grow the window this many months into the past.
        #[arg(long = "back", default_value_t = 0)]
        back: u32,

        /// Grow the window this many months into the future.
        #[arg(long = "ahead", default_value_t = 0)]
        ahead: u32,

        /// Date expression to select (repeatable, applied in order).
        #[arg(long = "select", action = ArgAction::Append)]
        select: Vec<String>,

        /// Emit the window as JSON instead of a grid.
        #[arg(long = "json")]
        json: bool,
    },

    /// Walk the paged window month by month.
    Page {
        /// Jump the window to this date expression first.
        #[arg(long = "jump")]
        jump: Option<String>,

        /// Steps forward after the jump.
        #[arg(long = "next", default_value_t = 0)]
        next: u32,

        /// Steps backward after the jump.
        #[arg(long = "prev", default_value_t = 0)]
        prev: u32,

        /// Date expression to select (repeatable, applied in order).
        #[arg(long = "select", action = ArgAction::Append)]
        select: Vec<String>,

        /// Emit the current bundle as JSON instead of a grid.
        #[arg(long = "json")]
        json: bool,
    },
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_level(true)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}
