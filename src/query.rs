//! Filter, search and sort over an ordered sequence of records.
//!
//! The data table, the search catalog, the report list and the notification
//! panel all derive their visible rows through [`query`]. It never mutates
//! its input and always returns rows in a deterministic order: input order
//! when unsorted, and a stable sort on the requested field otherwise.

use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// A generic table row: field name to scalar JSON value.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// A field value with natural ordering.
///
/// Values of different kinds order as Empty < Bool < Number < Date < Text, so a
/// missing field always sorts as the minimal value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Empty,
    Bool(bool),
    Number(f64),
    Date { at: NaiveDateTime, raw: String },
    Text(String),
}

impl FieldValue {
    pub fn from_json(value: Option<&serde_json::Value>) -> Self {
        match value {
            None | Some(serde_json::Value::Null) => Self::Empty,
            Some(serde_json::Value::Bool(flag)) => Self::Bool(*flag),
            Some(serde_json::Value::Number(number)) => {
                number.as_f64().map(Self::Number).unwrap_or(Self::Empty)
            }
            Some(serde_json::Value::String(text)) => Self::from_text(text.as_str()),
            Some(other) => Self::Text(other.to_string()),
        }
    }

    /// Strings that look like ISO dates become [`FieldValue::Date`]; everything
    /// else stays text.
    pub fn from_text(text: &str) -> Self {
        match parse_date(text) {
            Some(at) => Self::Date {
                at,
                raw: text.to_string(),
            },
            None => Self::Text(text.to_string()),
        }
    }

    /// The string a user sees for this value; search matches against it.
    pub fn display(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Bool(flag) => flag.to_string(),
            Self::Number(number) => format_number(*number),
            Self::Date { raw, .. } => raw.clone(),
            Self::Text(text) => text.clone(),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Empty => 0,
            Self::Bool(_) => 1,
            Self::Number(_) => 2,
            Self::Date { .. } => 3,
            Self::Text(_) => 4,
        }
    }

    pub fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Number(a), Self::Number(b)) => a.total_cmp(b),
            (Self::Date { at: a, .. }, Self::Date { at: b, .. }) => a.cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::from_text(value)
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::from_text(value.as_str())
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<u64> for FieldValue {
    fn from(value: u64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Anything the query engine can filter and sort.
pub trait Queryable {
    /// Value of a named field, [`FieldValue::Empty`] when absent.
    fn field(&self, name: &str) -> FieldValue;

    /// Every field, used when a search does not name its fields.
    fn all_fields(&self) -> Vec<FieldValue>;
}

impl Queryable for Record {
    fn field(&self, name: &str) -> FieldValue {
        FieldValue::from_json(self.get(name))
    }

    fn all_fields(&self) -> Vec<FieldValue> {
        self.values()
            .map(|value| FieldValue::from_json(Some(value)))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[serde(alias = "asc")]
    Ascending,
    #[serde(alias = "desc")]
    Descending,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Ascending,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: String,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn ascending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Ascending,
        }
    }

    pub fn descending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Descending,
        }
    }
}

/// What a repeated click on the active sort field does.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortCycle {
    /// asc, desc, asc, desc, ...
    #[default]
    Alternate,
    /// asc, desc, unsorted, asc, ...
    ThreeState,
}

/// The single active sort of a list surface.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortState {
    spec: Option<SortSpec>,
    cycle: SortCycle,
}

impl SortState {
    pub fn new(cycle: SortCycle) -> Self {
        Self { spec: None, cycle }
    }

    pub fn spec(&self) -> Option<&SortSpec> {
        self.spec.as_ref()
    }

    /// Applies a header click: a new field starts ascending, the active field
    /// advances through the configured cycle.
    pub fn toggle(&mut self, field: &str) -> Option<&SortSpec> {
        self.spec = match self.spec.take() {
            Some(active) if active.field == field => match (active.direction, self.cycle) {
                (SortDirection::Descending, SortCycle::ThreeState) => None,
                (direction, _) => Some(SortSpec {
                    field: active.field,
                    direction: direction.flipped(),
                }),
            },
            _ => Some(SortSpec::ascending(field)),
        };
        self.spec.as_ref()
    }
}

/// Exact match of a field's display string, e.g. `status == "completed"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldFilter {
    pub field: String,
    pub value: String,
}

impl FieldFilter {
    pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    fn matches<R: Queryable + ?Sized>(&self, record: &R) -> bool {
        record.field(self.field.as_str()).display() == self.value
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueryOptions {
    pub search_text: String,
    /// Fields searched for `search_text`; `None` or empty means every field.
    pub search_fields: Option<Vec<String>>,
    pub filters: Vec<FieldFilter>,
    pub sort: Option<SortSpec>,
}

impl QueryOptions {
    pub fn search(text: impl Into<String>) -> Self {
        Self {
            search_text: text.into(),
            ..Self::default()
        }
    }

    pub fn in_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.search_fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn filtered(mut self, filter: FieldFilter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn sorted(mut self, sort: Option<SortSpec>) -> Self {
        self.sort = sort;
        self
    }
}

/// Derives the visible sequence of `records` under `options`.
pub fn query<'a, R: Queryable>(records: &'a [R], options: &QueryOptions) -> Vec<&'a R> {
    let needle = options.search_text.to_lowercase();
    let fields = options
        .search_fields
        .as_deref()
        .filter(|fields| !fields.is_empty());

    let matched = records.iter().filter(|record| {
        options.filters.iter().all(|filter| filter.matches(*record))
            && matches_search(*record, needle.as_str(), fields)
    });

    let Some(sort) = options.sort.as_ref() else {
        return matched.collect();
    };

    let mut keyed: Vec<(FieldValue, &R)> = matched
        .map(|record| (record.field(sort.field.as_str()), record))
        .collect();
    // `sort_by` is stable, which keeps equal keys in input order in both directions.
    keyed.sort_by(|(a, _), (b, _)| match sort.direction {
        SortDirection::Ascending => a.compare(b),
        SortDirection::Descending => b.compare(a),
    });
    keyed.into_iter().map(|(_, record)| record).collect()
}

fn matches_search<R: Queryable + ?Sized>(
    record: &R,
    needle: &str,
    fields: Option<&[String]>,
) -> bool {
    if needle.is_empty() {
        return true;
    }
    let contains = |value: FieldValue| value.display().to_lowercase().contains(needle);
    match fields {
        Some(fields) => fields
            .iter()
            .any(|field| contains(record.field(field.as_str()))),
        None => record.all_fields().into_iter().any(contains),
    }
}

fn parse_date(text: &str) -> Option<NaiveDateTime> {
    let trimmed = text.trim();
    // Only strings with a YYYY-MM-DD prefix are tried as dates.
    let bytes = trimmed.as_bytes();
    if bytes.len() < 10 || bytes[4] != b'-' || bytes[7] != b'-' {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }
    if let Ok(at) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(at.naive_utc());
    }
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S").ok()
}

fn format_number(number: f64) -> String {
    if number.is_finite() && number.fract() == 0.0 && number.abs() < 1e15 {
        format!("{}", number as i64)
    } else {
        number.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows(value: serde_json::Value) -> Vec<Record> {
        value
            .as_array()
            .unwrap()
            .iter()
            .map(|row| row.as_object().unwrap().clone())
            .collect()
    }

    fn names(view: &[&Record]) -> Vec<String> {
        view.iter()
            .map(|row| row["name"].as_str().unwrap().to_string())
            .collect()
    }

    fn revenue_rows() -> Vec<Record> {
        rows(json!([
            {"id": 3, "name": "Bob", "revenue": 0},
            {"id": 1, "name": "John", "revenue": 12500},
            {"id": 2, "name": "Jane", "revenue": 8900},
        ]))
    }

    #[test]
    fn revenue_sort_then_toggle() {
        let data = revenue_rows();
        let mut sort = SortState::default();

        let asc = QueryOptions::default().sorted(sort.toggle("revenue").cloned());
        assert_eq!(names(&query(&data, &asc)), ["Bob", "Jane", "John"]);

        let desc = QueryOptions::default().sorted(sort.toggle("revenue").cloned());
        assert_eq!(names(&query(&data, &desc)), ["John", "Jane", "Bob"]);
    }

    #[test]
    fn unsorted_keeps_input_order() {
        let data = revenue_rows();
        let view = query(&data, &QueryOptions::default());
        assert_eq!(names(&view), ["Bob", "John", "Jane"]);
    }

    #[test]
    fn search_is_case_insensitive_over_all_fields() {
        let data = revenue_rows();
        assert_eq!(names(&query(&data, &QueryOptions::search("jA"))), ["Jane"]);
        // Numbers match through their display string.
        assert_eq!(names(&query(&data, &QueryOptions::search("125"))), ["John"]);
    }

    #[test]
    fn search_restricted_to_named_fields() {
        let data = revenue_rows();
        let options = QueryOptions::search("1").in_fields(["name"]);
        assert!(query(&data, &options).is_empty());
        let options = QueryOptions::search("1").in_fields(["id"]);
        assert_eq!(names(&query(&data, &options)), ["John"]);
    }

    #[test]
    fn empty_field_list_searches_everything() {
        let data = revenue_rows();
        let options = QueryOptions::search("bob").in_fields(Vec::<String>::new());
        assert_eq!(names(&query(&data, &options)), ["Bob"]);
    }

    #[test]
    fn equal_keys_keep_relative_order_in_both_directions() {
        let data = rows(json!([
            {"name": "a", "status": "Active"},
            {"name": "b", "status": "Inactive"},
            {"name": "c", "status": "Active"},
            {"name": "d", "status": "Inactive"},
        ]));
        let asc = QueryOptions::default().sorted(Some(SortSpec::ascending("status")));
        assert_eq!(names(&query(&data, &asc)), ["a", "c", "b", "d"]);
        let desc = QueryOptions::default().sorted(Some(SortSpec::descending("status")));
        assert_eq!(names(&query(&data, &desc)), ["b", "d", "a", "c"]);
    }

    #[test]
    fn missing_field_sorts_as_minimal() {
        let data = rows(json!([
            {"name": "with", "revenue": -5},
            {"name": "without"},
        ]));
        let asc = QueryOptions::default().sorted(Some(SortSpec::ascending("revenue")));
        assert_eq!(names(&query(&data, &asc)), ["without", "with"]);
    }

    #[test]
    fn dates_sort_chronologically() {
        let data = rows(json!([
            {"name": "march", "signupDate": "2024-03-01"},
            {"name": "january", "signupDate": "2024-01-15"},
            {"name": "february", "signupDate": "2024-02-10T08:30:00Z"},
        ]));
        let asc = QueryOptions::default().sorted(Some(SortSpec::ascending("signupDate")));
        assert_eq!(names(&query(&data, &asc)), ["january", "february", "march"]);
    }

    #[test]
    fn numbers_compare_numerically_not_lexically() {
        let data = rows(json!([
            {"name": "nine", "revenue": 9},
            {"name": "ten", "revenue": 10},
        ]));
        let asc = QueryOptions::default().sorted(Some(SortSpec::ascending("revenue")));
        assert_eq!(names(&query(&data, &asc)), ["nine", "ten"]);
    }

    #[test]
    fn filters_match_display_strings() {
        let data = rows(json!([
            {"name": "a", "status": "Active"},
            {"name": "b", "status": "Inactive"},
        ]));
        let options = QueryOptions::default().filtered(FieldFilter::new("status", "Inactive"));
        assert_eq!(names(&query(&data, &options)), ["b"]);
    }

    #[test]
    fn three_state_cycle_returns_to_unsorted() {
        let mut sort = SortState::new(SortCycle::ThreeState);
        assert_eq!(sort.toggle("name"), Some(&SortSpec::ascending("name")));
        assert_eq!(sort.toggle("name"), Some(&SortSpec::descending("name")));
        assert_eq!(sort.toggle("name"), None);
        assert_eq!(sort.toggle("name"), Some(&SortSpec::ascending("name")));
    }

    #[test]
    fn switching_field_resets_to_ascending() {
        let mut sort = SortState::default();
        sort.toggle("name");
        sort.toggle("name");
        assert_eq!(sort.toggle("revenue"), Some(&SortSpec::ascending("revenue")));
        assert_eq!(sort.toggle("revenue"), Some(&SortSpec::descending("revenue")));
        assert_eq!(sort.toggle("revenue"), Some(&SortSpec::ascending("revenue")));
    }

    #[test]
    fn display_follows_javascript_number_format() {
        assert_eq!(FieldValue::Number(12500.0).display(), "12500");
        assert_eq!(FieldValue::Number(3.45).display(), "3.45");
        assert_eq!(FieldValue::from_json(None).display(), "");
    }

    #[test]
    fn options_deserialize_from_camel_case() {
        let options: QueryOptions = serde_json::from_value(json!({
            "searchText": "jo",
            "sort": {"field": "revenue", "direction": "desc"}
        }))
        .unwrap();
        assert_eq!(options.search_text, "jo");
        assert_eq!(options.sort, Some(SortSpec::descending("revenue")));
        assert!(options.filters.is_empty());
    }
}
