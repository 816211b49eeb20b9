use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::config::DashboardConfig;
use crate::error::{StoreError, StoreResult};
use crate::fixtures::{self, ChartSeries, StatCard};
use crate::notifications::{NotificationDraft, NotificationStore};
use crate::profile::{ProfileStore, UserProfile};
use crate::recent_searches::RecentSearchLog;
use crate::reports::{self, Report, ReportFilter};
use crate::search::{SearchCatalog, SearchEntry};
use crate::settings::{Settings, SettingsExport, SettingsStore};
use crate::storage::PersistentStore;
use crate::table::DataTable;

/// Whether a mutation reached durable storage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WriteStatus {
    pub persisted: bool,
    pub warning: Option<String>,
}

impl WriteStatus {
    pub(crate) fn from_errors(errors: impl IntoIterator<Item = Option<StoreError>>) -> Self {
        let warnings: Vec<String> = errors
            .into_iter()
            .flatten()
            .map(|err| err.to_string())
            .collect();
        if warnings.is_empty() {
            Self {
                persisted: true,
                warning: None,
            }
        } else {
            Self {
                persisted: false,
                warning: Some(warnings.join("; ")),
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub stats: Vec<StatCard>,
    pub charts: Vec<ChartSeries>,
    pub unread_notifications: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchOutcome {
    pub results: Vec<SearchEntry>,
    pub recent_searches: Vec<String>,
    pub status: WriteStatus,
}

/// Every store of the dashboard, built once at startup over one shared
/// [`PersistentStore`] and handed to whoever needs it.
pub struct Dashboard {
    store: Arc<PersistentStore>,
    config: DashboardConfig,
    settings: Mutex<SettingsStore>,
    notifications: Mutex<NotificationStore>,
    recent_searches: Mutex<RecentSearchLog>,
    profile: Mutex<ProfileStore>,
    table: Mutex<DataTable>,
    catalog: SearchCatalog,
    reports: Vec<Report>,
}

impl Dashboard {
    pub fn open(store: Arc<PersistentStore>, config: DashboardConfig) -> Self {
        Self::open_at(store, config, Utc::now())
    }

    pub fn open_at(store: Arc<PersistentStore>, config: DashboardConfig, now: DateTime<Utc>) -> Self {
        let settings = SettingsStore::open(store.clone());
        let mut notifications = NotificationStore::open(store.clone());
        if notifications.seed_if_empty(fixtures::initial_notifications(now)) {
            info!(count = notifications.list().len(), "seeded first-run notifications");
        }
        let recent_searches = RecentSearchLog::open(store.clone(), config.recent_search_capacity);
        let profile = ProfileStore::open(store.clone());
        let table = DataTable::new(
            fixtures::table_columns(),
            fixtures::table_rows(),
            config.sort_cycle,
        );
        Self {
            store,
            config,
            settings: Mutex::new(settings),
            notifications: Mutex::new(notifications),
            recent_searches: Mutex::new(recent_searches),
            profile: Mutex::new(profile),
            table: Mutex::new(table),
            catalog: SearchCatalog::new(fixtures::search_entries()),
            reports: fixtures::reports(),
        }
    }

    pub fn store(&self) -> &Arc<PersistentStore> {
        &self.store
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn settings(&self) -> MutexGuard<'_, SettingsStore> {
        lock(&self.settings)
    }

    pub fn notifications(&self) -> MutexGuard<'_, NotificationStore> {
        lock(&self.notifications)
    }

    pub fn recent_searches(&self) -> MutexGuard<'_, RecentSearchLog> {
        lock(&self.recent_searches)
    }

    pub fn profile(&self) -> MutexGuard<'_, ProfileStore> {
        lock(&self.profile)
    }

    pub fn table(&self) -> MutexGuard<'_, DataTable> {
        lock(&self.table)
    }

    pub fn catalog(&self) -> &SearchCatalog {
        &self.catalog
    }

    pub fn overview(&self) -> Overview {
        Overview {
            stats: fixtures::stat_cards(),
            charts: fixtures::chart_series(),
            unread_notifications: self.notifications().unread_count(),
        }
    }

    pub fn update_settings(&self, patch: &Value) -> StoreResult<(Settings, WriteStatus)> {
        let mut settings = self.settings();
        let next = settings.update(patch)?.clone();
        Ok((next, WriteStatus::from_errors([settings.take_write_error()])))
    }

    /// Export document for the settings page, with its pretty-printed JSON.
    pub fn export_settings(&self, now: DateTime<Utc>) -> StoreResult<(SettingsExport, String)> {
        let export = self.settings().export(now);
        let text = export.to_pretty_json()?;
        Ok((export, text))
    }

    pub fn notify(&self, draft: NotificationDraft) -> (String, WriteStatus) {
        let mut notifications = self.notifications();
        let id = notifications.add(draft);
        (id, WriteStatus::from_errors([notifications.take_write_error()]))
    }

    pub fn search(&self, text: &str) -> SearchOutcome {
        let results: Vec<SearchEntry> = self.catalog.search(text).into_iter().cloned().collect();
        let mut recent = self.recent_searches();
        recent.record(text);
        SearchOutcome {
            results,
            recent_searches: recent.entries().to_vec(),
            status: WriteStatus::from_errors([recent.take_write_error()]),
        }
    }

    pub fn save_profile(&self, profile: UserProfile) -> (UserProfile, WriteStatus) {
        let (saved, profile_error) = {
            let mut store = self.profile();
            let saved = store.save(profile).clone();
            (saved, store.take_write_error())
        };
        let (_, notify_status) = self.notify(NotificationDraft::success(
            "Profile Updated",
            "Your profile information has been saved successfully.",
        ));
        let mut status = WriteStatus::from_errors([profile_error]);
        if !notify_status.persisted {
            status.persisted = false;
            status.warning = status.warning.or(notify_status.warning);
        }
        (saved, status)
    }

    pub fn reports(&self, filter: &ReportFilter) -> Vec<Report> {
        reports::filter_reports(self.reports.as_slice(), filter)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn report_categories(&self) -> Vec<String> {
        reports::categories(self.reports.as_slice())
    }

    /// Wipes every persisted key, then resets each store. The stores are reset
    /// even when the wipe fails part way; the failure shows up in the status.
    pub fn clear_all_data(&self) -> WriteStatus {
        let clear_error = match self.store.clear() {
            Ok(()) => {
                info!("all persisted dashboard data cleared");
                None
            }
            Err(err) => {
                warn!(error = %err, "clearing persisted data failed, resetting stores anyway");
                Some(err)
            }
        };

        let settings_error = {
            let mut settings = self.settings();
            settings.reset();
            settings.take_write_error()
        };
        let recent_error = {
            let mut recent = self.recent_searches();
            recent.clear();
            recent.take_write_error()
        };
        self.profile().reload();
        self.notifications().reload();
        let (_, notify_status) = self.notify(NotificationDraft::success(
            "Data cleared",
            "All data cleared successfully",
        ));
        let mut status = WriteStatus::from_errors([clear_error, settings_error, recent_error]);
        if !notify_status.persisted {
            status.persisted = false;
            status.warning = status.warning.or(notify_status.warning);
        }
        status
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
