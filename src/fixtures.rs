//! Static demo data shown until a real data source is connected.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::notifications::{Notification, NotificationKind};
use crate::query::Record;
use crate::reports::{Report, ReportStatus};
use crate::search::SearchEntry;
use crate::table::Column;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatCard {
    pub title: String,
    pub value: f64,
    /// Percent change against the previous period.
    pub change: f64,
    pub icon: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Line,
    Area,
    Bar,
    Pie,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub label: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
    pub id: String,
    pub title: String,
    pub kind: ChartKind,
    pub points: Vec<ChartPoint>,
}

pub fn table_columns() -> Vec<Column> {
    [
        ("id", "ID"),
        ("name", "Name"),
        ("email", "Email"),
        ("status", "Status"),
        ("revenue", "Revenue ($)"),
        ("signupDate", "Signup Date"),
    ]
    .into_iter()
    .map(|(key, label)| Column::sortable(key, label))
    .collect()
}

pub fn table_rows() -> Vec<Record> {
    let rows = json!([
        {"id": 1, "name": "John Doe", "email": "john@example.com", "status": "Active", "revenue": 12500, "signupDate": "2024-01-15"},
        {"id": 2, "name": "Jane Smith", "email": "jane@example.com", "status": "Active", "revenue": 8900, "signupDate": "2024-01-20"},
        {"id": 3, "name": "Bob Johnson", "email": "bob@example.com", "status": "Inactive", "revenue": 0, "signupDate": "2024-02-01"},
        {"id": 4, "name": "Alice Brown", "email": "alice@example.com", "status": "Active", "revenue": 15600, "signupDate": "2024-02-10"},
        {"id": 5, "name": "Charlie Wilson", "email": "charlie@example.com", "status": "Active", "revenue": 22100, "signupDate": "2024-02-15"},
        {"id": 6, "name": "Diana Davis", "email": "diana@example.com", "status": "Active", "revenue": 9800, "signupDate": "2024-02-20"},
        {"id": 7, "name": "Eve Miller", "email": "eve@example.com", "status": "Inactive", "revenue": 0, "signupDate": "2024-03-01"},
        {"id": 8, "name": "Frank Garcia", "email": "frank@example.com", "status": "Active", "revenue": 18700, "signupDate": "2024-03-05"},
    ]);
    match rows {
        serde_json::Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                serde_json::Value::Object(map) => Some(map),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

pub fn search_entries() -> Vec<SearchEntry> {
    [
        ("revenue-trends", "Revenue Trends", "Analytics", "View revenue growth patterns", "/analytics"),
        ("user-analytics", "User Analytics", "Users", "Analyze user behavior and engagement", "/analytics"),
        ("financial-reports", "Financial Reports", "Reports", "Access financial data and insights", "/reports"),
        ("export-data", "Export Data", "Tools", "Export dashboard data to CSV/PDF", "/settings"),
    ]
    .into_iter()
    .map(|(id, title, category, description, url)| SearchEntry {
        id: id.to_string(),
        title: title.to_string(),
        description: description.to_string(),
        category: category.to_string(),
        url: url.to_string(),
    })
    .collect()
}

pub fn reports() -> Vec<Report> {
    let report = |id: u32,
                  title: &str,
                  description: &str,
                  category: &str,
                  status: ReportStatus,
                  day: u32,
                  size: &str,
                  format: &str,
                  downloads: u32| Report {
        id,
        title: title.to_string(),
        description: description.to_string(),
        category: category.to_string(),
        status,
        created_at: NaiveDate::from_ymd_opt(2024, 1, day).unwrap_or_default(),
        size: size.to_string(),
        format: format.to_string(),
        downloads,
    };
    vec![
        report(1, "Monthly Revenue Report", "Comprehensive analysis of revenue trends and performance metrics", "Financial", ReportStatus::Completed, 15, "2.4 MB", "PDF", 45),
        report(2, "User Engagement Analytics", "Detailed insights into user behavior and engagement patterns", "Analytics", ReportStatus::Completed, 14, "1.8 MB", "Excel", 32),
        report(3, "Q4 Performance Summary", "Quarterly performance review with key metrics and insights", "Performance", ReportStatus::Processing, 13, "3.1 MB", "PDF", 0),
        report(4, "Marketing Campaign Results", "Analysis of recent marketing campaigns and their effectiveness", "Marketing", ReportStatus::Completed, 12, "1.5 MB", "PowerPoint", 28),
        report(5, "Customer Satisfaction Survey", "Results and analysis from the latest customer satisfaction survey", "Customer", ReportStatus::Failed, 11, "0 MB", "PDF", 0),
        report(6, "Weekly Traffic Report", "Website traffic analysis with detailed breakdowns by source", "Analytics", ReportStatus::Completed, 10, "900 KB", "CSV", 67),
    ]
}

/// First-run notifications, timestamped relative to `now`.
pub fn initial_notifications(now: DateTime<Utc>) -> Vec<Notification> {
    [
        ("welcome", NotificationKind::Info, "Welcome back", "Your dashboard is up to date.", 2),
        ("revenue-goal", NotificationKind::Success, "Revenue goal reached", "Monthly revenue passed the target.", 60),
        ("traffic-spike", NotificationKind::Warning, "Traffic spike", "Sessions are 40% above the weekly average.", 180),
        ("report-failed", NotificationKind::Error, "Report failed", "Customer Satisfaction Survey could not be generated.", 1440),
    ]
    .into_iter()
    .map(|(id, kind, title, message, minutes_ago)| Notification {
        id: format!("seed-{id}"),
        kind,
        title: title.to_string(),
        message: message.to_string(),
        created_at: now - Duration::minutes(minutes_ago),
        read: false,
    })
    .collect()
}

pub fn stat_cards() -> Vec<StatCard> {
    [
        ("Total Users", 142_850.0, 12.5, "users"),
        ("Revenue", 892_340.0, 8.2, "dollar"),
        ("Conversion Rate", 3.45, -2.1, "trending"),
        ("Active Sessions", 28_450.0, 15.8, "activity"),
    ]
    .into_iter()
    .map(|(title, value, change, icon)| StatCard {
        title: title.to_string(),
        value,
        change,
        icon: icon.to_string(),
    })
    .collect()
}

pub fn chart_series() -> Vec<ChartSeries> {
    let series = |id: &str, title: &str, kind: ChartKind, points: &[(&str, f64)]| ChartSeries {
        id: id.to_string(),
        title: title.to_string(),
        kind,
        points: points
            .iter()
            .map(|(label, value)| ChartPoint {
                label: (*label).to_string(),
                value: *value,
            })
            .collect(),
    };
    vec![
        series(
            "monthly-revenue",
            "Revenue Trend",
            ChartKind::Line,
            &[("Jan", 4000.0), ("Feb", 3000.0), ("Mar", 5000.0), ("Apr", 4500.0), ("May", 6000.0), ("Jun", 5500.0), ("Jul", 7000.0)],
        ),
        series(
            "weekly-activity",
            "Weekly Activity",
            ChartKind::Area,
            &[("Mon", 2400.0), ("Tue", 1398.0), ("Wed", 9800.0), ("Thu", 3908.0), ("Fri", 4800.0), ("Sat", 3800.0), ("Sun", 4300.0)],
        ),
        series(
            "quarterly-sales",
            "Quarterly Sales",
            ChartKind::Bar,
            &[("Q1", 40000.0), ("Q2", 30000.0), ("Q3", 50000.0), ("Q4", 45000.0)],
        ),
        series(
            "device-share",
            "Device Breakdown",
            ChartKind::Pie,
            &[("Desktop", 45.0), ("Mobile", 35.0), ("Tablet", 15.0), ("Other", 5.0)],
        ),
    ]
}
