use serde::{Deserialize, Serialize};

use crate::query::{self, FieldValue, QueryOptions, Queryable};

const SEARCH_FIELDS: [&str; 3] = ["title", "description", "category"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchEntry {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub url: String,
}

impl Queryable for SearchEntry {
    fn field(&self, name: &str) -> FieldValue {
        match name {
            "id" => FieldValue::Text(self.id.clone()),
            "title" => FieldValue::Text(self.title.clone()),
            "description" => FieldValue::Text(self.description.clone()),
            "category" => FieldValue::Text(self.category.clone()),
            "url" => FieldValue::Text(self.url.clone()),
            _ => FieldValue::Empty,
        }
    }

    fn all_fields(&self) -> Vec<FieldValue> {
        SEARCH_FIELDS.iter().map(|name| self.field(name)).collect()
    }
}

/// The fixed set of destinations offered by the global search box.
#[derive(Debug, Clone, Default)]
pub struct SearchCatalog {
    entries: Vec<SearchEntry>,
}

impl SearchCatalog {
    pub fn new(entries: Vec<SearchEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[SearchEntry] {
        self.entries.as_slice()
    }

    /// Results for a submitted query; a blank query has no results.
    pub fn search(&self, text: &str) -> Vec<&SearchEntry> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        self.matching(text)
    }

    /// Suggestions while typing; a blank query suggests everything.
    pub fn suggest(&self, text: &str) -> Vec<&SearchEntry> {
        self.matching(text)
    }

    fn matching(&self, text: &str) -> Vec<&SearchEntry> {
        let options = QueryOptions::search(text).in_fields(SEARCH_FIELDS);
        query::query(self.entries.as_slice(), &options)
    }
}
