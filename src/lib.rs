//! State core of the Analytics Dashboard desktop runtime.
//!
//! Every surface of the dashboard reads and writes through the stores in this
//! crate: [`PersistentStore`] for durable key-value state, the list
//! [`query`](query::query) engine for tables, search and notification views,
//! and the settings, notification and recent-search stores layered on top.
//! A [`Dashboard`] ties them together and is what the desktop shell manages.

pub mod config;
pub mod dashboard;
#[cfg(feature = "desktop")]
pub mod desktop;
pub mod error;
pub mod fixtures;
pub mod notifications;
pub mod profile;
pub mod query;
pub mod recent_searches;
pub mod reports;
pub mod search;
pub mod settings;
pub mod storage;
pub mod table;
pub mod telemetry;

pub use config::DashboardConfig;
pub use dashboard::{Dashboard, WriteStatus};
pub use error::{StoreError, StoreResult};
pub use notifications::{Notification, NotificationDraft, NotificationKind, NotificationStore};
pub use query::{
    query, FieldFilter, FieldValue, QueryOptions, Queryable, Record, SortCycle, SortDirection,
    SortSpec, SortState,
};
pub use recent_searches::RecentSearchLog;
pub use settings::{Settings, SettingsStore};
pub use storage::{FileBackend, MemoryBackend, PersistentStore, StorageBackend};
