use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::StoreError;
use crate::storage::PersistentStore;

pub const PROFILE_KEY: &str = "userProfile";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserProfile {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub location: String,
    pub join_date: String,
    pub bio: String,
    pub role: String,
    pub department: String,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            name: "John Doe".to_string(),
            email: "john.doe@example.com".to_string(),
            phone: "+1 (555) 123-4567".to_string(),
            location: "San Francisco, CA".to_string(),
            join_date: "January 2024".to_string(),
            bio: "Data analyst with 5+ years of experience in business intelligence and dashboard development.".to_string(),
            role: "Senior Data Analyst".to_string(),
            department: "Analytics Team".to_string(),
        }
    }
}

pub struct ProfileStore {
    store: Arc<PersistentStore>,
    profile: UserProfile,
    write_error: Option<StoreError>,
}

impl ProfileStore {
    pub fn open(store: Arc<PersistentStore>) -> Self {
        let profile = store.get(PROFILE_KEY, UserProfile::default());
        Self {
            store,
            profile,
            write_error: None,
        }
    }

    pub fn profile(&self) -> &UserProfile {
        &self.profile
    }

    pub fn save(&mut self, profile: UserProfile) -> &UserProfile {
        self.profile = profile;
        match self.store.set(PROFILE_KEY, &self.profile) {
            Ok(()) => self.write_error = None,
            Err(err) => {
                warn!(key = PROFILE_KEY, error = %err, "profile kept in memory only");
                self.write_error = Some(err);
            }
        }
        &self.profile
    }

    pub fn reload(&mut self) {
        self.profile = self.store.get(PROFILE_KEY, UserProfile::default());
    }

    pub fn take_write_error(&mut self) -> Option<StoreError> {
        self.write_error.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn saved_profile_survives_reopen() {
        let backing = Arc::new(PersistentStore::in_memory());
        let mut store = ProfileStore::open(backing.clone());
        assert_eq!(store.profile().name, "John Doe");

        let mut edited = store.profile().clone();
        edited.name = "Ada Lovelace".to_string();
        edited.role = "Lead Analyst".to_string();
        store.save(edited.clone());

        let reopened = ProfileStore::open(backing);
        assert_eq!(reopened.profile(), &edited);
    }

    #[test]
    fn partial_stored_profile_fills_defaults() {
        let backing = Arc::new(PersistentStore::in_memory());
        backing
            .set(PROFILE_KEY, &serde_json::json!({"name": "Grace"}))
            .unwrap();
        let store = ProfileStore::open(backing);
        assert_eq!(store.profile().name, "Grace");
        assert_eq!(store.profile().department, "Analytics Team");
    }
}
