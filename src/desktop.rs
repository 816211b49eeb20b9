use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tauri::{AppHandle, Manager, State};
use tracing::info;

use crate::config::DashboardConfig;
use crate::dashboard::{Dashboard, Overview, SearchOutcome, WriteStatus};
use crate::notifications::{
    relative_time, Notification, NotificationDraft, NotificationStore, NOTIFICATIONS_KEY,
};
use crate::profile::{UserProfile, PROFILE_KEY};
use crate::query::QueryOptions;
use crate::recent_searches::RECENT_SEARCHES_KEY;
use crate::reports::{Report, ReportFilter};
use crate::search::SearchEntry;
use crate::settings::{Settings, EXPORT_FILENAME, LEGACY_SETTINGS_KEY, SETTINGS_KEY};
use crate::storage::{sanitize_key, write_text_file, PersistentStore};
use crate::table::TableView;
use crate::telemetry::init_tracing;

const STORAGE_DIR_NAME: &str = "AnalyticsDashboard";
const TABLE_EXPORT_FILENAME: &str = "dashboard-data.csv";

/// Keys written only through their owning store.
const STORE_OWNED_KEYS: [&str; 5] = [
    SETTINGS_KEY,
    LEGACY_SETTINGS_KEY,
    RECENT_SEARCHES_KEY,
    PROFILE_KEY,
    NOTIFICATIONS_KEY,
];

struct StorageLocation(PathBuf);

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StorageInfoResult {
    ok: bool,
    path_label: String,
    keys: Vec<String>,
}

#[derive(Deserialize)]
struct StorageReadRequest {
    name: String,
}

#[derive(Deserialize)]
struct StorageWriteJsonRequest {
    name: String,
    value: serde_json::Value,
}

#[derive(Serialize)]
struct SaveFileResult {
    ok: bool,
    canceled: bool,
    filename: String,
    path: Option<String>,
    error: Option<String>,
}

#[derive(Deserialize)]
struct SettingsUpdateRequest {
    patch: serde_json::Value,
}

#[derive(Serialize)]
struct SettingsResult {
    settings: Settings,
    #[serde(flatten)]
    status: WriteStatus,
}

#[derive(Deserialize)]
struct NotificationIdRequest {
    id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NotificationView {
    #[serde(flatten)]
    notification: Notification,
    time: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NotificationListResult {
    items: Vec<NotificationView>,
    unread_count: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NotificationMutationResult {
    id: Option<String>,
    changed: bool,
    unread_count: usize,
    #[serde(flatten)]
    status: WriteStatus,
}

#[derive(Deserialize)]
struct SearchRequest {
    query: String,
}

#[derive(Deserialize)]
struct TableSearchRequest {
    text: String,
}

#[derive(Deserialize)]
struct TableSortRequest {
    key: String,
}

#[derive(Deserialize)]
struct TableExportRequest {
    #[serde(default)]
    filename: Option<String>,
}

#[derive(Deserialize)]
struct ReportListRequest {
    #[serde(default)]
    category: String,
    #[serde(default)]
    status: String,
}

#[derive(Serialize)]
struct ReportListResult {
    reports: Vec<Report>,
    categories: Vec<String>,
}

#[derive(Serialize)]
struct ProfileResult {
    profile: UserProfile,
    #[serde(flatten)]
    status: WriteStatus,
}

#[tauri::command]
fn storage_info(
    dashboard: State<'_, Dashboard>,
    location: State<'_, StorageLocation>,
) -> Result<StorageInfoResult, String> {
    let keys = dashboard.store().keys().map_err(|err| err.to_string())?;
    Ok(StorageInfoResult {
        ok: true,
        path_label: location.0.to_string_lossy().to_string(),
        keys,
    })
}

#[tauri::command]
fn storage_read_json(
    dashboard: State<'_, Dashboard>,
    payload: StorageReadRequest,
) -> Result<Option<serde_json::Value>, String> {
    let key = sanitize_key(payload.name.as_str()).map_err(|err| err.to_string())?;
    Ok(dashboard.store().get_value(key))
}

#[tauri::command]
fn storage_write_json(
    dashboard: State<'_, Dashboard>,
    payload: StorageWriteJsonRequest,
) -> Result<bool, String> {
    let key = sanitize_key(payload.name.as_str()).map_err(|err| err.to_string())?;
    if STORE_OWNED_KEYS.contains(&key) {
        return Err(format!("'{key}' can only be changed through its store."));
    }
    dashboard
        .store()
        .set_value(key, payload.value)
        .map_err(|err| err.to_string())?;
    Ok(true)
}

#[tauri::command]
fn dashboard_overview(dashboard: State<'_, Dashboard>) -> Overview {
    dashboard.overview()
}

#[tauri::command]
fn settings_get(dashboard: State<'_, Dashboard>) -> Settings {
    dashboard.settings().settings().clone()
}

#[tauri::command]
fn settings_update(
    dashboard: State<'_, Dashboard>,
    payload: SettingsUpdateRequest,
) -> Result<SettingsResult, String> {
    let (settings, status) = dashboard
        .update_settings(&payload.patch)
        .map_err(|err| err.to_string())?;
    Ok(SettingsResult { settings, status })
}

#[tauri::command]
fn settings_reset(dashboard: State<'_, Dashboard>) -> SettingsResult {
    let mut store = dashboard.settings();
    let settings = store.reset().clone();
    let status = WriteStatus::from_errors([store.take_write_error()]);
    SettingsResult { settings, status }
}

#[tauri::command]
fn settings_export(dashboard: State<'_, Dashboard>) -> Result<SaveFileResult, String> {
    let (_, content) = dashboard
        .export_settings(Utc::now())
        .map_err(|err| err.to_string())?;
    let result = save_with_dialog(EXPORT_FILENAME, "Settings", "json", content.as_str())?;
    if result.ok {
        dashboard.notify(NotificationDraft::success(
            "Settings exported",
            "Settings exported successfully",
        ));
    }
    Ok(result)
}

#[tauri::command]
fn clear_all_data(dashboard: State<'_, Dashboard>) -> WriteStatus {
    dashboard.clear_all_data()
}

#[tauri::command]
fn notifications_list(
    dashboard: State<'_, Dashboard>,
    payload: Option<QueryOptions>,
) -> NotificationListResult {
    let options = payload.unwrap_or_default();
    let now = Utc::now();
    let store = dashboard.notifications();
    let items = store
        .view(&options)
        .into_iter()
        .map(|notification| NotificationView {
            time: relative_time(notification.created_at, now),
            notification: notification.clone(),
        })
        .collect();
    NotificationListResult {
        items,
        unread_count: store.unread_count(),
    }
}

#[tauri::command]
fn notifications_add(
    dashboard: State<'_, Dashboard>,
    payload: NotificationDraft,
) -> NotificationMutationResult {
    let (id, status) = dashboard.notify(payload);
    NotificationMutationResult {
        id: Some(id),
        changed: true,
        unread_count: dashboard.notifications().unread_count(),
        status,
    }
}

#[tauri::command]
fn notifications_mark_read(
    dashboard: State<'_, Dashboard>,
    payload: NotificationIdRequest,
) -> NotificationMutationResult {
    mutate_notifications(&dashboard, |store| store.mark_read(payload.id.as_str()))
}

#[tauri::command]
fn notifications_mark_all_read(dashboard: State<'_, Dashboard>) -> NotificationMutationResult {
    mutate_notifications(&dashboard, |store| {
        let changed = store.unread_count() > 0;
        store.mark_all_read();
        changed
    })
}

#[tauri::command]
fn notifications_remove(
    dashboard: State<'_, Dashboard>,
    payload: NotificationIdRequest,
) -> NotificationMutationResult {
    mutate_notifications(&dashboard, |store| store.remove(payload.id.as_str()))
}

#[tauri::command]
fn search_query(dashboard: State<'_, Dashboard>, payload: SearchRequest) -> SearchOutcome {
    dashboard.search(payload.query.as_str())
}

#[tauri::command]
fn search_suggest(dashboard: State<'_, Dashboard>, payload: SearchRequest) -> Vec<SearchEntry> {
    dashboard
        .catalog()
        .suggest(payload.query.as_str())
        .into_iter()
        .cloned()
        .collect()
}

#[tauri::command]
fn recent_searches_get(dashboard: State<'_, Dashboard>) -> Vec<String> {
    dashboard.recent_searches().entries().to_vec()
}

#[tauri::command]
fn recent_searches_clear(dashboard: State<'_, Dashboard>) -> WriteStatus {
    let mut log = dashboard.recent_searches();
    log.clear();
    WriteStatus::from_errors([log.take_write_error()])
}

#[tauri::command]
fn table_get(dashboard: State<'_, Dashboard>) -> TableView {
    dashboard.table().view()
}

#[tauri::command]
fn table_set_search(dashboard: State<'_, Dashboard>, payload: TableSearchRequest) -> TableView {
    let mut table = dashboard.table();
    table.set_search(payload.text);
    table.view()
}

#[tauri::command]
fn table_toggle_sort(dashboard: State<'_, Dashboard>, payload: TableSortRequest) -> TableView {
    let mut table = dashboard.table();
    table.toggle_sort(payload.key.as_str());
    table.view()
}

#[tauri::command]
fn table_export_csv(
    dashboard: State<'_, Dashboard>,
    payload: TableExportRequest,
) -> Result<SaveFileResult, String> {
    let csv = dashboard.table().to_csv();
    let filename = payload
        .filename
        .unwrap_or_else(|| TABLE_EXPORT_FILENAME.to_string());
    save_with_dialog(filename.as_str(), "CSV", "csv", csv.as_str())
}

#[tauri::command]
fn reports_list(dashboard: State<'_, Dashboard>, payload: ReportListRequest) -> ReportListResult {
    let filter = ReportFilter::from_selection(payload.category.as_str(), payload.status.as_str());
    ReportListResult {
        reports: dashboard.reports(&filter),
        categories: dashboard.report_categories(),
    }
}

#[tauri::command]
fn profile_get(dashboard: State<'_, Dashboard>) -> UserProfile {
    dashboard.profile().profile().clone()
}

#[tauri::command]
fn profile_save(dashboard: State<'_, Dashboard>, payload: UserProfile) -> ProfileResult {
    let (profile, status) = dashboard.save_profile(payload);
    ProfileResult { profile, status }
}

fn mutate_notifications<F>(dashboard: &Dashboard, apply: F) -> NotificationMutationResult
where
    F: FnOnce(&mut NotificationStore) -> bool,
{
    let mut store = dashboard.notifications();
    let changed = apply(&mut *store);
    let status = WriteStatus::from_errors([store.take_write_error()]);
    NotificationMutationResult {
        id: None,
        changed,
        unread_count: store.unread_count(),
        status,
    }
}

fn save_with_dialog(
    filename: &str,
    filter_name: &str,
    extension: &str,
    content: &str,
) -> Result<SaveFileResult, String> {
    let default_name = sanitize_filename(filename, extension);
    let path = rfd::FileDialog::new()
        .add_filter(filter_name, &[extension])
        .set_file_name(default_name.as_str())
        .save_file();

    let Some(path) = path else {
        return Ok(SaveFileResult {
            ok: false,
            canceled: true,
            filename: default_name,
            path: None,
            error: None,
        });
    };

    if let Err(err) = write_text_file(path.clone(), content) {
        return Ok(SaveFileResult {
            ok: false,
            canceled: false,
            filename: default_name,
            path: Some(path.to_string_lossy().to_string()),
            error: Some(err.to_string()),
        });
    }
    info!(path = %path.display(), "exported file");
    Ok(SaveFileResult {
        ok: true,
        canceled: false,
        filename: default_name,
        path: Some(path.to_string_lossy().to_string()),
        error: None,
    })
}

fn sanitize_filename(value: &str, extension: &str) -> String {
    let mut out = String::new();
    for ch in value.trim().chars().take(255) {
        if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' || ch == '.' {
            out.push(ch);
        } else {
            out.push('_');
        }
    }
    let trimmed = out.trim_matches('_');
    let base = if trimmed.is_empty() {
        "dashboard-export"
    } else {
        trimmed
    };
    let suffix = format!(".{extension}");
    if base.to_lowercase().ends_with(suffix.as_str()) {
        base.to_string()
    } else {
        format!("{base}{suffix}")
    }
}

fn storage_root_dir(app: &AppHandle, config: &DashboardConfig) -> Result<PathBuf, String> {
    let root = match config.data_dir.as_ref() {
        Some(dir) => dir.clone(),
        None => app
            .path()
            .app_data_dir()
            .map_err(|err| err.to_string())?
            .join(STORAGE_DIR_NAME),
    };
    fs::create_dir_all(root.as_path()).map_err(|err| err.to_string())?;
    Ok(root)
}

pub fn run() {
    let config = DashboardConfig::from_env();
    init_tracing(config.log_filter.as_str());

    tauri::Builder::default()
        .setup(move |app| {
            let root = storage_root_dir(app.handle(), &config)?;
            info!(root = %root.display(), "opening dashboard storage");
            let store = PersistentStore::open_dir(root.clone())?;
            app.manage(Dashboard::open(Arc::new(store), config));
            app.manage(StorageLocation(root));
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            storage_info,
            storage_read_json,
            storage_write_json,
            dashboard_overview,
            settings_get,
            settings_update,
            settings_reset,
            settings_export,
            clear_all_data,
            notifications_list,
            notifications_add,
            notifications_mark_read,
            notifications_mark_all_read,
            notifications_remove,
            search_query,
            search_suggest,
            recent_searches_get,
            recent_searches_clear,
            table_get,
            table_set_search,
            table_toggle_sort,
            table_export_csv,
            reports_list,
            profile_get,
            profile_save
        ])
        .run(tauri::generate_context!())
        .expect("failed to run Analytics Dashboard");
}
