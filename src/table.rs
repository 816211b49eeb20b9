use serde::{Deserialize, Serialize};

use crate::query::{self, QueryOptions, Queryable, Record, SortCycle, SortSpec, SortState};

const MAX_EXPORT_ROWS: usize = 50_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub key: String,
    pub label: String,
    #[serde(default)]
    pub sortable: bool,
}

impl Column {
    pub fn sortable(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            sortable: true,
        }
    }
}

/// A snapshot of what the table currently shows.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableView {
    pub columns: Vec<Column>,
    pub rows: Vec<Record>,
    pub search_text: String,
    pub sort: Option<SortSpec>,
    pub total_rows: usize,
}

/// Rows plus the search box and header-click sort state of one table.
#[derive(Debug, Clone)]
pub struct DataTable {
    columns: Vec<Column>,
    rows: Vec<Record>,
    search_text: String,
    sort: SortState,
}

impl DataTable {
    pub fn new(columns: Vec<Column>, rows: Vec<Record>, cycle: SortCycle) -> Self {
        Self {
            columns,
            rows,
            search_text: String::new(),
            sort: SortState::new(cycle),
        }
    }

    pub fn columns(&self) -> &[Column] {
        self.columns.as_slice()
    }

    pub fn sort(&self) -> Option<&SortSpec> {
        self.sort.spec()
    }

    pub fn search_text(&self) -> &str {
        self.search_text.as_str()
    }

    pub fn set_search(&mut self, text: impl Into<String>) {
        self.search_text = text.into();
    }

    /// Header click. Unknown and non-sortable columns leave the sort unchanged.
    pub fn toggle_sort(&mut self, key: &str) -> Option<&SortSpec> {
        let sortable = self
            .columns
            .iter()
            .any(|column| column.key == key && column.sortable);
        if sortable {
            self.sort.toggle(key);
        }
        self.sort.spec()
    }

    pub fn options(&self) -> QueryOptions {
        QueryOptions::search(self.search_text.clone()).sorted(self.sort.spec().cloned())
    }

    pub fn visible_rows(&self) -> Vec<&Record> {
        query::query(self.rows.as_slice(), &self.options())
    }

    pub fn view(&self) -> TableView {
        TableView {
            columns: self.columns.clone(),
            rows: self.visible_rows().into_iter().cloned().collect(),
            search_text: self.search_text.clone(),
            sort: self.sort.spec().cloned(),
            total_rows: self.rows.len(),
        }
    }

    /// CSV of the visible rows, in column order.
    pub fn to_csv(&self) -> String {
        let keys: Vec<&str> = self.columns.iter().map(|column| column.key.as_str()).collect();
        let mut rows = self.visible_rows();
        rows.truncate(MAX_EXPORT_ROWS);
        rows_to_csv(keys.as_slice(), rows.as_slice())
    }
}

pub fn rows_to_csv(columns: &[&str], rows: &[&Record]) -> String {
    let mut lines: Vec<String> = Vec::new();
    if !columns.is_empty() {
        lines.push(
            columns
                .iter()
                .map(|column| csv_escape(column))
                .collect::<Vec<_>>()
                .join(","),
        );
    }
    for row in rows {
        let line = columns
            .iter()
            .map(|column| csv_escape(row.field(column).display().as_str()))
            .collect::<Vec<_>>()
            .join(",");
        lines.push(line);
    }
    lines.join("\n")
}

fn should_neutralize_csv(value: &str) -> bool {
    let trimmed = value.trim_start();
    if trimmed.is_empty() || trimmed.starts_with('\'') {
        return false;
    }
    match trimmed.chars().next() {
        Some('=') | Some('+') | Some('@') => true,
        // Negative numbers are data, not formulas.
        Some('-') => trimmed.parse::<f64>().is_err(),
        _ => false,
    }
}

fn csv_escape(value: &str) -> String {
    let safe = if should_neutralize_csv(value) {
        format!("'{value}")
    } else {
        value.to_string()
    };
    if safe.contains(',') || safe.contains('"') || safe.contains('\n') || safe.contains('\r') {
        format!("\"{}\"", safe.replace('"', "\"\""))
    } else {
        safe
    }
}
