use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::query::SortCycle;
use crate::recent_searches::DEFAULT_CAPACITY;

pub const ENV_DATA_DIR: &str = "DASHBOARD_DATA_DIR";
pub const ENV_RECENT_SEARCHES: &str = "DASHBOARD_RECENT_SEARCHES";
pub const ENV_SORT_CYCLE: &str = "DASHBOARD_SORT_CYCLE";
pub const ENV_LOG: &str = "DASHBOARD_LOG";

/// Runtime configuration for the dashboard state stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Storage root; the desktop shell falls back to the app data directory.
    pub data_dir: Option<PathBuf>,
    pub recent_search_capacity: usize,
    pub sort_cycle: SortCycle,
    pub log_filter: String,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            recent_search_capacity: DEFAULT_CAPACITY,
            sort_cycle: SortCycle::Alternate,
            log_filter: "info".to_string(),
        }
    }
}

impl DashboardConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds a config from any variable source; unparsable values keep their
    /// defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(dir) = lookup(ENV_DATA_DIR).filter(|value| !value.trim().is_empty()) {
            config.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(raw) = lookup(ENV_RECENT_SEARCHES) {
            match raw.trim().parse::<usize>() {
                Ok(capacity) if capacity > 0 => config.recent_search_capacity = capacity,
                _ => warn!(var = ENV_RECENT_SEARCHES, value = %raw, "ignoring invalid capacity"),
            }
        }
        if let Some(raw) = lookup(ENV_SORT_CYCLE) {
            match raw.trim().to_ascii_lowercase().as_str() {
                "alternate" => config.sort_cycle = SortCycle::Alternate,
                "three-state" | "three_state" => config.sort_cycle = SortCycle::ThreeState,
                _ => warn!(var = ENV_SORT_CYCLE, value = %raw, "ignoring unknown sort cycle"),
            }
        }
        if let Some(filter) = lookup(ENV_LOG).filter(|value| !value.trim().is_empty()) {
            config.log_filter = filter;
        }
        config
    }
}
