use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::error::StoreError;
use crate::query::{self, FieldValue, QueryOptions, Queryable};
use crate::storage::PersistentStore;

pub const NOTIFICATIONS_KEY: &str = "notifications";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Info,
    Success,
    Warning,
    Error,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub read: bool,
}

/// A notification as producers submit it; id, timestamp and read state are
/// assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationDraft {
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
}

impl NotificationDraft {
    pub fn new(kind: NotificationKind, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn success(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NotificationKind::Success, title, message)
    }
}

impl Queryable for Notification {
    fn field(&self, name: &str) -> FieldValue {
        match name {
            "id" => FieldValue::Text(self.id.clone()),
            "kind" => FieldValue::Text(self.kind.as_str().to_string()),
            "title" => FieldValue::Text(self.title.clone()),
            "message" => FieldValue::Text(self.message.clone()),
            "createdAt" => FieldValue::Date {
                at: self.created_at.naive_utc(),
                raw: self.created_at.to_rfc3339(),
            },
            "read" => FieldValue::Bool(self.read),
            _ => FieldValue::Empty,
        }
    }

    fn all_fields(&self) -> Vec<FieldValue> {
        vec![
            self.field("kind"),
            self.field("title"),
            self.field("message"),
        ]
    }
}

/// Newest-first notification list persisted under [`NOTIFICATIONS_KEY`].
///
/// The unread count is always derived from the list, never tracked alongside it.
pub struct NotificationStore {
    store: Arc<PersistentStore>,
    items: Vec<Notification>,
    write_error: Option<StoreError>,
}

impl NotificationStore {
    pub fn open(store: Arc<PersistentStore>) -> Self {
        let items = store.get(NOTIFICATIONS_KEY, Vec::new());
        Self {
            store,
            items,
            write_error: None,
        }
    }

    pub fn list(&self) -> &[Notification] {
        self.items.as_slice()
    }

    pub fn get(&self, id: &str) -> Option<&Notification> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn unread_count(&self) -> usize {
        self.items.iter().filter(|item| !item.read).count()
    }

    pub fn view(&self, options: &QueryOptions) -> Vec<&Notification> {
        query::query(self.items.as_slice(), options)
    }

    pub fn add(&mut self, draft: NotificationDraft) -> String {
        self.add_at(draft, Utc::now())
    }

    pub fn add_at(&mut self, draft: NotificationDraft, created_at: DateTime<Utc>) -> String {
        let id = new_id();
        self.items.insert(
            0,
            Notification {
                id: id.clone(),
                kind: draft.kind,
                title: draft.title,
                message: draft.message,
                created_at,
                read: false,
            },
        );
        self.persist();
        id
    }

    /// Returns false when no notification has this id.
    pub fn mark_read(&mut self, id: &str) -> bool {
        let Some(item) = self.items.iter_mut().find(|item| item.id == id) else {
            return false;
        };
        if !item.read {
            item.read = true;
            self.persist();
        }
        true
    }

    pub fn mark_all_read(&mut self) {
        if self.items.iter().all(|item| item.read) {
            return;
        }
        for item in self.items.iter_mut() {
            item.read = true;
        }
        self.persist();
    }

    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.id != id);
        if self.items.len() == before {
            return false;
        }
        self.persist();
        true
    }

    /// First-run seeding; ignored once anything has been stored.
    pub fn seed_if_empty(&mut self, seed: Vec<Notification>) -> bool {
        if !self.items.is_empty() || seed.is_empty() {
            return false;
        }
        self.items = seed;
        self.persist();
        true
    }

    pub fn reload(&mut self) {
        self.items = self.store.get(NOTIFICATIONS_KEY, Vec::new());
    }

    /// The last persistence failure, if the latest write did not reach storage.
    pub fn take_write_error(&mut self) -> Option<StoreError> {
        self.write_error.take()
    }

    fn persist(&mut self) {
        match self.store.set(NOTIFICATIONS_KEY, &self.items) {
            Ok(()) => self.write_error = None,
            Err(err) => {
                warn!(key = NOTIFICATIONS_KEY, error = %err, "notification state kept in memory only");
                self.write_error = Some(err);
            }
        }
    }
}

/// Display projection of a creation timestamp.
pub fn relative_time(created_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(created_at);
    let minutes = elapsed.num_minutes();
    if minutes < 1 {
        return "Just now".to_string();
    }
    if minutes < 60 {
        return format!("{minutes}m ago");
    }
    let hours = elapsed.num_hours();
    if hours < 24 {
        return format!("{hours}h ago");
    }
    format!("{}d ago", elapsed.num_days())
}

fn new_id() -> String {
    format!("ntf-{}", Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::FieldFilter;
    use crate::storage::MemoryBackend;
    use chrono::{Duration, TimeZone};

    fn empty_store() -> NotificationStore {
        NotificationStore::open(Arc::new(PersistentStore::in_memory()))
    }

    fn titles(store: &NotificationStore) -> Vec<&str> {
        store.list().iter().map(|item| item.title.as_str()).collect()
    }

    #[test]
    fn newest_first_and_unread_count() {
        let mut store = empty_store();
        store.add(NotificationDraft::new(NotificationKind::Success, "A", "m"));
        assert_eq!(store.unread_count(), 1);
        store.add(NotificationDraft::new(NotificationKind::Info, "B", "m"));
        assert_eq!(store.unread_count(), 2);
        assert_eq!(titles(&store), ["B", "A"]);
    }

    #[test]
    fn mark_read_touches_only_its_record() {
        let mut store = empty_store();
        let first = store.add(NotificationDraft::success("A", "m"));
        let second = store.add(NotificationDraft::success("B", "m"));

        assert!(store.mark_read(first.as_str()));
        assert_eq!(store.unread_count(), 1);
        assert!(store.get(first.as_str()).unwrap().read);
        assert!(!store.get(second.as_str()).unwrap().read);

        // Repeating is harmless and unknown ids are a no-op.
        assert!(store.mark_read(first.as_str()));
        assert!(!store.mark_read("missing"));
        assert_eq!(store.unread_count(), 1);
    }

    #[test]
    fn mark_all_read_zeroes_unread() {
        let mut store = empty_store();
        for title in ["A", "B", "C"] {
            store.add(NotificationDraft::success(title, "m"));
        }
        store.mark_all_read();
        assert_eq!(store.unread_count(), 0);
        assert_eq!(store.list().len(), 3);
    }

    #[test]
    fn remove_deletes_matching_record_only() {
        let mut store = empty_store();
        let a = store.add(NotificationDraft::success("A", "m"));
        store.add(NotificationDraft::success("B", "m"));
        assert!(store.remove(a.as_str()));
        assert!(!store.remove(a.as_str()));
        assert_eq!(titles(&store), ["B"]);
        assert_eq!(store.unread_count(), 1);
    }

    #[test]
    fn state_survives_reopen() {
        let backing = Arc::new(PersistentStore::in_memory());
        let id = {
            let mut store = NotificationStore::open(backing.clone());
            let id = store.add(NotificationDraft::success("Saved", "m"));
            store.add(NotificationDraft::success("Other", "m"));
            store.mark_read(id.as_str());
            id
        };
        let reopened = NotificationStore::open(backing);
        assert_eq!(titles(&reopened), ["Other", "Saved"]);
        assert!(reopened.get(id.as_str()).unwrap().read);
        assert_eq!(reopened.unread_count(), 1);
    }

    #[test]
    fn failed_write_keeps_memory_state() {
        let backing = Arc::new(PersistentStore::new(MemoryBackend::with_quota(8)));
        let mut store = NotificationStore::open(backing);
        store.add(NotificationDraft::success("A", "m"));
        assert_eq!(store.unread_count(), 1);
        let err = store.take_write_error().unwrap();
        assert!(err.is_write_failure());
        assert!(store.take_write_error().is_none());
    }

    #[test]
    fn seed_applies_only_when_empty() {
        let mut store = empty_store();
        let now = Utc::now();
        let seed = vec![Notification {
            id: "seed-1".into(),
            kind: NotificationKind::Info,
            title: "Welcome".into(),
            message: "m".into(),
            created_at: now,
            read: false,
        }];
        assert!(store.seed_if_empty(seed.clone()));
        assert!(!store.seed_if_empty(seed));
        assert_eq!(store.list().len(), 1);
    }

    #[test]
    fn unread_view_and_search() {
        let mut store = empty_store();
        let a = store.add(NotificationDraft::success("Export ready", "Your export finished"));
        store.add(NotificationDraft::new(NotificationKind::Warning, "Quota", "Storage nearly full"));
        store.mark_read(a.as_str());

        let unread = QueryOptions::default().filtered(FieldFilter::new("read", "false"));
        let view: Vec<_> = store.view(&unread).into_iter().map(|n| n.title.as_str()).collect();
        assert_eq!(view, ["Quota"]);

        let search = QueryOptions::search("EXPORT");
        let view: Vec<_> = store.view(&search).into_iter().map(|n| n.title.as_str()).collect();
        assert_eq!(view, ["Export ready"]);
    }

    #[test]
    fn relative_time_buckets() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
        assert_eq!(relative_time(now - Duration::seconds(20), now), "Just now");
        assert_eq!(relative_time(now - Duration::minutes(5), now), "5m ago");
        assert_eq!(relative_time(now - Duration::hours(2), now), "2h ago");
        assert_eq!(relative_time(now - Duration::days(3), now), "3d ago");
    }
}
