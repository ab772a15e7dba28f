use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use chrono::{NaiveDate, Weekday};
use chrono_tz::Tz;
use serde::Deserialize;
use tracing::{info, warn};

use crate::datetime::{parse_timezone, parse_weekday_name};
use crate::model::{DateRestriction, NavigationMode, SelectionMode};

const LOCAL_CONFIG: &str = "almanac.toml";

/// On-disk configuration, all fields optional. Resolution order for the
/// file itself: explicit override, `ALMANAC_CONFIG`, `./almanac.toml`,
/// then `<config dir>/almanac/config.toml`; no file at all means pure
/// defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub timezone: Option<String>,
    pub first_weekday: Option<String>,
    pub selection: Option<SelectionMode>,
    pub navigation: Option<NavigationMode>,
    pub restriction: Option<DateRestriction>,
    pub available: Option<Vec<NaiveDate>>,
    pub counts_file: Option<PathBuf>,
    pub color: Option<String>,
    pub month_names: Option<Vec<String>>,
    pub weekday_names: Option<Vec<String>>,
}

impl Config {
    #[tracing::instrument(skip(config_override))]
    pub fn load(config_override: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = resolve_config_path(config_override)? else {
            warn!("no config file found; using defaults");
            return Ok(Self::default());
        };

        info!(config = %path.display(), "loading config");
        Self::load_file(&path)
    }

    pub fn load_file(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("invalid config in {}", path.display()))
    }

    pub fn timezone(&self) -> anyhow::Result<Tz> {
        match &self.timezone {
            Some(raw) => parse_timezone(raw),
            None => Ok(chrono_tz::UTC),
        }
    }

    pub fn first_weekday(&self) -> anyhow::Result<Weekday> {
        match &self.first_weekday {
            Some(raw) => parse_weekday_name(&raw.to_ascii_lowercase())
                .ok_or_else(|| anyhow!("invalid first_weekday: {raw:?}")),
            None => Ok(Weekday::Sun),
        }
    }

    pub fn selection_mode(&self) -> SelectionMode {
        self.selection.unwrap_or(SelectionMode::Single)
    }

    pub fn restriction(&self) -> DateRestriction {
        self.restriction.unwrap_or(DateRestriction::AllAvailable)
    }

    pub fn allow_set(&self) -> Option<BTreeSet<NaiveDate>> {
        self.available
            .as_ref()
            .filter(|dates| !dates.is_empty())
            .map(|dates| dates.iter().copied().collect())
    }
}

fn resolve_config_path(config_override: Option<&Path>) -> anyhow::Result<Option<PathBuf>> {
    if let Some(path) = config_override {
        if !path.exists() {
            return Err(anyhow!("config file does not exist: {}", path.display()));
        }
        return Ok(Some(path.to_path_buf()));
    }

    if let Ok(env_path) = std::env::var("ALMANAC_CONFIG") {
        if env_path == "/dev/null" {
            return Ok(None);
        }
        return Ok(Some(PathBuf::from(env_path)));
    }

    let local = PathBuf::from(LOCAL_CONFIG);
    if local.exists() {
        return Ok(Some(local));
    }

    if let Some(config_dir) = dirs::config_dir() {
        let candidate = config_dir.join("almanac").join("config.toml");
        if candidate.exists() {
            return Ok(Some(candidate));
        }
    }

    Ok(None)
}
