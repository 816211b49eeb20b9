use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::error::{StoreError, StoreResult};
use crate::storage::PersistentStore;

pub const SETTINGS_KEY: &str = "appSettings";
pub const LEGACY_SETTINGS_KEY: &str = "userSettings";
pub const EXPORT_VERSION: &str = "1.0";
pub const EXPORT_FILENAME: &str = "dashboard-settings.json";

const MIN_REFRESH_INTERVAL: u32 = 5;
const MAX_REFRESH_INTERVAL: u32 = 3600;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
    Auto,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NotificationPrefs {
    pub email: bool,
    pub push: bool,
    pub desktop: bool,
    pub marketing: bool,
}

impl Default for NotificationPrefs {
    fn default() -> Self {
        Self {
            email: true,
            push: true,
            desktop: false,
            marketing: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PrivacyPrefs {
    pub analytics: bool,
    pub cookies: bool,
    pub data_sharing: bool,
    pub profile_visible: bool,
    pub data_collection: bool,
}

impl Default for PrivacyPrefs {
    fn default() -> Self {
        Self {
            analytics: true,
            cookies: true,
            data_sharing: false,
            profile_visible: true,
            data_collection: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardPrefs {
    pub auto_refresh: bool,
    /// Seconds between refreshes.
    pub refresh_interval: u32,
    pub default_view: String,
}

impl Default for DashboardPrefs {
    fn default() -> Self {
        Self {
            auto_refresh: true,
            refresh_interval: 30,
            default_view: "overview".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub theme: Theme,
    pub notifications: NotificationPrefs,
    pub privacy: PrivacyPrefs,
    pub dashboard: DashboardPrefs,
    pub language: String,
    pub timezone: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: Theme::Dark,
            notifications: NotificationPrefs::default(),
            privacy: PrivacyPrefs::default(),
            dashboard: DashboardPrefs::default(),
            language: "en".to_string(),
            timezone: "UTC".to_string(),
        }
    }
}

impl Settings {
    /// Merges a partial update one level deep: nested groups are merged
    /// key-by-key, every other top-level value is replaced.
    ///
    /// Unknown keys and values that do not fit the schema are rejected and
    /// leave `self` untouched.
    pub fn patched(&self, patch: &Value) -> StoreResult<Settings> {
        let Some(patch) = patch.as_object() else {
            return Err(StoreError::InvalidSettings(
                "settings update must be an object".to_string(),
            ));
        };
        let mut merged = serde_json::to_value(self).map_err(|source| StoreError::Serialize {
            key: SETTINGS_KEY.to_string(),
            source,
        })?;
        let target = merged
            .as_object_mut()
            .ok_or_else(|| StoreError::InvalidSettings("settings are not an object".to_string()))?;

        for (key, value) in patch {
            let Some(existing) = target.get_mut(key) else {
                return Err(StoreError::InvalidSettings(format!("unknown setting '{key}'")));
            };
            match (existing, value.as_object()) {
                (Value::Object(group), Some(updates)) => {
                    for (leaf, leaf_value) in updates {
                        if !group.contains_key(leaf) {
                            return Err(StoreError::InvalidSettings(format!(
                                "unknown setting '{key}.{leaf}'"
                            )));
                        }
                        group.insert(leaf.clone(), leaf_value.clone());
                    }
                }
                (existing, _) => *existing = value.clone(),
            }
        }

        let next: Settings = serde_json::from_value(merged)
            .map_err(|err| StoreError::InvalidSettings(err.to_string()))?;
        next.validate()?;
        Ok(next)
    }

    /// Pulls stored values back inside the accepted ranges. Returns true when
    /// anything changed.
    pub fn normalize(&mut self) -> bool {
        let interval = self.dashboard.refresh_interval;
        let clamped = interval.clamp(MIN_REFRESH_INTERVAL, MAX_REFRESH_INTERVAL);
        self.dashboard.refresh_interval = clamped;
        clamped != interval
    }

    pub fn validate(&self) -> StoreResult<()> {
        let interval = self.dashboard.refresh_interval;
        if !(MIN_REFRESH_INTERVAL..=MAX_REFRESH_INTERVAL).contains(&interval) {
            return Err(StoreError::InvalidSettings(format!(
                "dashboard.refreshInterval must be between {MIN_REFRESH_INTERVAL} and {MAX_REFRESH_INTERVAL} seconds, got {interval}"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsExport {
    pub settings: Settings,
    pub export_date: DateTime<Utc>,
    pub version: String,
}

impl SettingsExport {
    pub fn to_pretty_json(&self) -> StoreResult<String> {
        serde_json::to_string_pretty(self).map_err(|source| StoreError::Serialize {
            key: EXPORT_FILENAME.to_string(),
            source,
        })
    }
}

/// The settings shape written by the older settings page.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct LegacySettings {
    theme: Option<Theme>,
    notifications: Option<LegacyNotifications>,
    privacy: Option<LegacyPrivacy>,
    language: Option<String>,
    timezone: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LegacyNotifications {
    email: Option<bool>,
    push: Option<bool>,
    marketing: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct LegacyPrivacy {
    profile_visible: Option<bool>,
    data_collection: Option<bool>,
    analytics: Option<bool>,
}

impl LegacySettings {
    fn apply_to(self, settings: &mut Settings) {
        if let Some(theme) = self.theme {
            settings.theme = theme;
        }
        if let Some(notifications) = self.notifications {
            let prefs = &mut settings.notifications;
            prefs.email = notifications.email.unwrap_or(prefs.email);
            prefs.push = notifications.push.unwrap_or(prefs.push);
            prefs.marketing = notifications.marketing.unwrap_or(prefs.marketing);
        }
        if let Some(privacy) = self.privacy {
            let prefs = &mut settings.privacy;
            prefs.profile_visible = privacy.profile_visible.unwrap_or(prefs.profile_visible);
            prefs.data_collection = privacy.data_collection.unwrap_or(prefs.data_collection);
            prefs.analytics = privacy.analytics.unwrap_or(prefs.analytics);
        }
        if let Some(language) = self.language {
            settings.language = language;
        }
        if let Some(timezone) = self.timezone {
            settings.timezone = timezone;
        }
    }
}

/// Persisted application settings under [`SETTINGS_KEY`].
pub struct SettingsStore {
    store: Arc<PersistentStore>,
    settings: Settings,
    write_error: Option<StoreError>,
}

impl SettingsStore {
    pub fn open(store: Arc<PersistentStore>) -> Self {
        let mut out = Self {
            settings: Settings::default(),
            store,
            write_error: None,
        };
        if !out.migrate_legacy() {
            out.settings = out.store.get(SETTINGS_KEY, Settings::default());
        }
        if out.settings.normalize() {
            warn!(key = SETTINGS_KEY, "stored settings out of range, normalized");
            out.persist();
        }
        out
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn update(&mut self, patch: &Value) -> StoreResult<&Settings> {
        self.settings = self.settings.patched(patch)?;
        self.persist();
        Ok(&self.settings)
    }

    pub fn reset(&mut self) -> &Settings {
        self.settings = Settings::default();
        self.persist();
        &self.settings
    }

    pub fn export(&self, now: DateTime<Utc>) -> SettingsExport {
        SettingsExport {
            settings: self.settings.clone(),
            export_date: now,
            version: EXPORT_VERSION.to_string(),
        }
    }

    pub fn take_write_error(&mut self) -> Option<StoreError> {
        self.write_error.take()
    }

    /// Folds the older `userSettings` entry into the unified schema, once.
    fn migrate_legacy(&mut self) -> bool {
        let Some(raw) = self.store.get_value(LEGACY_SETTINGS_KEY) else {
            return false;
        };
        if self.store.contains(SETTINGS_KEY) {
            if let Err(err) = self.store.remove(LEGACY_SETTINGS_KEY) {
                warn!(error = %err, "failed to drop superseded legacy settings");
            }
            return false;
        }

        let mut settings = Settings::default();
        match serde_json::from_value::<LegacySettings>(raw) {
            Ok(legacy) => legacy.apply_to(&mut settings),
            Err(err) => warn!(error = %err, "legacy settings unreadable, starting from defaults"),
        }
        self.settings = settings;
        self.persist();
        if self.write_error.is_none() {
            if let Err(err) = self.store.remove(LEGACY_SETTINGS_KEY) {
                warn!(error = %err, "failed to drop migrated legacy settings");
            }
        }
        info!(
            from = LEGACY_SETTINGS_KEY,
            to = SETTINGS_KEY,
            "migrated legacy settings"
        );
        true
    }

    fn persist(&mut self) {
        match self.store.set(SETTINGS_KEY, &self.settings) {
            Ok(()) => self.write_error = None,
            Err(err) => {
                warn!(key = SETTINGS_KEY, error = %err, "settings kept in memory only");
                self.write_error = Some(err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryBackend;
    use chrono::TimeZone;
    use serde_json::json;

    fn open_empty() -> SettingsStore {
        SettingsStore::open(Arc::new(PersistentStore::in_memory()))
    }

    #[test]
    fn first_run_uses_defaults() {
        let store = open_empty();
        assert_eq!(store.settings(), &Settings::default());
        assert_eq!(store.settings().theme, Theme::Dark);
        assert_eq!(store.settings().dashboard.refresh_interval, 30);
    }

    #[test]
    fn nested_update_changes_one_leaf() {
        let mut store = open_empty();
        let before = store.settings().clone();
        store
            .update(&json!({"notifications": {"email": false}}))
            .unwrap();

        let mut expected = before;
        expected.notifications.email = false;
        assert_eq!(store.settings(), &expected);
        assert!(store.settings().notifications.push);
    }

    #[test]
    fn scalar_update_replaces_value() {
        let mut store = open_empty();
        store
            .update(&json!({"theme": "light", "language": "fr"}))
            .unwrap();
        assert_eq!(store.settings().theme, Theme::Light);
        assert_eq!(store.settings().language, "fr");
    }

    #[test]
    fn rejected_update_leaves_state_untouched() {
        let mut store = open_empty();
        let before = store.settings().clone();
        for patch in [
            json!({"theme": "neon"}),
            json!({"dashboard": {"refreshInterval": 0}}),
            json!({"notifications": {"sms": true}}),
            json!({"layout": "grid"}),
            json!(["theme"]),
        ] {
            let err = store.update(&patch).unwrap_err();
            assert!(matches!(err, StoreError::InvalidSettings(_)), "{patch}");
        }
        assert_eq!(store.settings(), &before);
    }

    #[test]
    fn out_of_range_stored_interval_does_not_block_updates() {
        let backend = MemoryBackend::new();
        backend.insert_raw(
            SETTINGS_KEY,
            json!({"dashboard": {"refreshInterval": 1}}).to_string(),
        );
        let backing = Arc::new(PersistentStore::new(backend));
        let mut store = SettingsStore::open(backing.clone());
        assert_eq!(store.settings().dashboard.refresh_interval, 5);

        store.update(&json!({"theme": "light"})).unwrap();
        let updated = store
            .update(&json!({"notifications": {"email": false}}))
            .unwrap();
        assert_eq!(updated.theme, Theme::Light);
        assert!(!updated.notifications.email);
        assert!(updated.notifications.push);

        let reopened = SettingsStore::open(backing);
        assert_eq!(reopened.settings().dashboard.refresh_interval, 5);
    }

    #[test]
    fn normalize_clamps_interval() {
        let mut settings = Settings::default();
        assert!(!settings.normalize());
        settings.dashboard.refresh_interval = 90_000;
        assert!(settings.normalize());
        assert_eq!(settings.dashboard.refresh_interval, 3600);
    }

    #[test]
    fn updates_persist_across_reopen() {
        let backing = Arc::new(PersistentStore::in_memory());
        {
            let mut store = SettingsStore::open(backing.clone());
            store
                .update(&json!({"dashboard": {"autoRefresh": false}}))
                .unwrap();
        }
        let reopened = SettingsStore::open(backing);
        assert!(!reopened.settings().dashboard.auto_refresh);
        assert_eq!(reopened.settings().dashboard.default_view, "overview");
    }

    #[test]
    fn legacy_settings_are_migrated_once() {
        let backend = MemoryBackend::new();
        backend.insert_raw(
            LEGACY_SETTINGS_KEY,
            json!({
                "theme": "auto",
                "notifications": {"email": false, "push": true, "marketing": true},
                "privacy": {"profileVisible": false, "dataCollection": true, "analytics": false},
                "language": "de",
                "timezone": "America/Chicago"
            })
            .to_string(),
        );
        let backing = Arc::new(PersistentStore::new(backend));
        let store = SettingsStore::open(backing.clone());

        let settings = store.settings();
        assert_eq!(settings.theme, Theme::Auto);
        assert!(!settings.notifications.email);
        assert!(settings.notifications.marketing);
        assert!(!settings.notifications.desktop);
        assert!(!settings.privacy.profile_visible);
        assert!(!settings.privacy.analytics);
        assert!(settings.privacy.cookies);
        assert_eq!(settings.language, "de");
        assert_eq!(settings.timezone, "America/Chicago");

        assert!(!backing.contains(LEGACY_SETTINGS_KEY));
        assert!(backing.contains(SETTINGS_KEY));
    }

    #[test]
    fn current_settings_win_over_legacy() {
        let backend = MemoryBackend::new();
        backend.insert_raw(SETTINGS_KEY, json!({"theme": "light"}).to_string());
        backend.insert_raw(LEGACY_SETTINGS_KEY, json!({"theme": "auto"}).to_string());
        let backing = Arc::new(PersistentStore::new(backend));
        let store = SettingsStore::open(backing.clone());
        assert_eq!(store.settings().theme, Theme::Light);
        assert!(!backing.contains(LEGACY_SETTINGS_KEY));
    }

    #[test]
    fn export_carries_version_and_date() {
        let store = open_empty();
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap();
        let export = store.export(now);
        let text = export.to_pretty_json().unwrap();
        let parsed: Value = serde_json::from_str(text.as_str()).unwrap();
        assert_eq!(parsed["version"], "1.0");
        assert_eq!(parsed["exportDate"], "2024-05-01T09:30:00Z");
        assert_eq!(parsed["settings"]["theme"], "dark");
    }

    #[test]
    fn reset_restores_defaults() {
        let mut store = open_empty();
        store.update(&json!({"theme": "light"})).unwrap();
        assert_eq!(store.reset(), &Settings::default());
    }
}
