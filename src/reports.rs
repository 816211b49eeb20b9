use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::query::{self, FieldFilter, FieldValue, QueryOptions, Queryable};

/// Selection value meaning "no filter" in the report pickers.
pub const ALL: &str = "all";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Completed,
    Processing,
    Failed,
}

impl ReportStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Processing => "processing",
            Self::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: u32,
    pub title: String,
    pub description: String,
    pub category: String,
    pub status: ReportStatus,
    pub created_at: NaiveDate,
    pub size: String,
    pub format: String,
    pub downloads: u32,
}

impl Queryable for Report {
    fn field(&self, name: &str) -> FieldValue {
        match name {
            "id" => FieldValue::from(u64::from(self.id)),
            "title" => FieldValue::Text(self.title.clone()),
            "description" => FieldValue::Text(self.description.clone()),
            "category" => FieldValue::Text(self.category.clone()),
            "status" => FieldValue::Text(self.status.as_str().to_string()),
            "createdAt" => FieldValue::from_text(self.created_at.format("%Y-%m-%d").to_string().as_str()),
            "size" => FieldValue::Text(self.size.clone()),
            "format" => FieldValue::Text(self.format.clone()),
            "downloads" => FieldValue::from(u64::from(self.downloads)),
            _ => FieldValue::Empty,
        }
    }

    fn all_fields(&self) -> Vec<FieldValue> {
        ["title", "description", "category", "status", "format"]
            .iter()
            .map(|name| self.field(name))
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportFilter {
    pub category: Option<String>,
    pub status: Option<String>,
}

impl ReportFilter {
    /// Builds a filter from the picker values. `all` (or nothing) leaves that
    /// dimension unfiltered; any other value must match exactly, so an unknown
    /// status selects no reports.
    pub fn from_selection(category: &str, status: &str) -> Self {
        Self {
            category: selection(category),
            status: selection(status),
        }
    }

    pub fn options(&self) -> QueryOptions {
        let mut options = QueryOptions::default();
        if let Some(category) = &self.category {
            options = options.filtered(FieldFilter::new("category", category.as_str()));
        }
        if let Some(status) = &self.status {
            options = options.filtered(FieldFilter::new("status", status.as_str()));
        }
        options
    }
}

fn selection(value: &str) -> Option<String> {
    match value.trim() {
        "" | ALL => None,
        other => Some(other.to_string()),
    }
}

pub fn filter_reports<'a>(reports: &'a [Report], filter: &ReportFilter) -> Vec<&'a Report> {
    query::query(reports, &filter.options())
}

/// Distinct categories in first-seen order, for the category picker.
pub fn categories(reports: &[Report]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for report in reports {
        if !out.contains(&report.category) {
            out.push(report.category.clone());
        }
    }
    out
}
