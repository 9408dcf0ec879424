//! Chart configurations handed to the dashboard's charting library.

use chrono::{Duration, Local, NaiveDate};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Pie,
    Bar,
    Line,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Colors {
    One(String),
    Each(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub data: Vec<u64>,
    pub background_color: Colors,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tension: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub datasets: Vec<Dataset>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartConfig {
    #[serde(rename = "type")]
    pub kind: ChartKind,
    pub data: ChartData,
    pub title: String,
}

const DEFAULT_COUNTRIES: [&str; 5] = ["India", "Pakistan", "USA", "Saudi Arabia", "Sri Lanka"];
const DEFAULT_COUNTRY_COUNTS: [u64; 5] = [45, 35, 25, 20, 15];
const COUNTRY_PALETTE: [&str; 5] = ["#ff9933", "#01411c", "#3c3b6e", "#006c35", "#8d153a"];

const DEFAULT_CATEGORIES: [&str; 8] = [
    "Politics",
    "Business",
    "Technology",
    "Sports",
    "Entertainment",
    "Health",
    "Science",
    "World",
];
const DEFAULT_CATEGORY_COUNTS: [u64; 8] = [65, 59, 80, 81, 56, 55, 40, 70];

/// Per-day counts for the activity timeline, oldest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivitySeries {
    pub news: Vec<u64>,
    pub users: Vec<u64>,
    pub tickets: Vec<u64>,
}

impl Default for ActivitySeries {
    fn default() -> Self {
        Self {
            news: vec![12, 19, 3, 5, 2, 3, 15],
            users: vec![2, 5, 1, 3, 7, 4, 9],
            tickets: vec![1, 2, 3, 4, 2, 1, 5],
        }
    }
}

pub fn users_by_country(countries: Option<Vec<String>>, counts: Option<Vec<u64>>) -> ChartConfig {
    let labels = countries.unwrap_or_else(|| owned(&DEFAULT_COUNTRIES));
    let data = counts.unwrap_or_else(|| DEFAULT_COUNTRY_COUNTS.to_vec());

    ChartConfig {
        kind: ChartKind::Pie,
        data: ChartData {
            labels,
            datasets: vec![Dataset {
                label: None,
                data,
                background_color: Colors::Each(owned(&COUNTRY_PALETTE)),
                border_color: None,
                border_width: Some(1),
                fill: None,
                tension: None,
            }],
        },
        title: "User Distribution by Country".to_string(),
    }
}

pub fn articles_by_category(
    categories: Option<Vec<String>>,
    counts: Option<Vec<u64>>,
) -> ChartConfig {
    let labels = categories.unwrap_or_else(|| owned(&DEFAULT_CATEGORIES));
    let data = counts.unwrap_or_else(|| DEFAULT_CATEGORY_COUNTS.to_vec());

    ChartConfig {
        kind: ChartKind::Bar,
        data: ChartData {
            labels,
            datasets: vec![Dataset {
                label: Some("Number of Articles".to_string()),
                data,
                background_color: Colors::One("#0056b3".to_string()),
                border_color: None,
                border_width: Some(1),
                fill: None,
                tension: None,
            }],
        },
        title: "News Articles by Category".to_string(),
    }
}

pub fn activity_timeline(series: ActivitySeries) -> ChartConfig {
    activity_timeline_at(Local::now().date_naive(), series)
}

pub fn activity_timeline_at(today: NaiveDate, series: ActivitySeries) -> ChartConfig {
    let labels = (0..7)
        .rev()
        .map(|offset| {
            (today - Duration::days(offset))
                .format("%a")
                .to_string()
        })
        .collect();

    let line = |label: &str, data: Vec<u64>, color: &str, fill: &str| Dataset {
        label: Some(label.to_string()),
        data,
        background_color: Colors::One(fill.to_string()),
        border_color: Some(color.to_string()),
        border_width: None,
        fill: Some(true),
        tension: Some(0.4),
    };

    ChartConfig {
        kind: ChartKind::Line,
        data: ChartData {
            labels,
            datasets: vec![
                line("News Published", series.news, "#0056b3", "rgba(0, 86, 179, 0.1)"),
                line(
                    "User Registrations",
                    series.users,
                    "#28a745",
                    "rgba(40, 167, 69, 0.1)",
                ),
                line(
                    "Support Tickets",
                    series.tickets,
                    "#dc3545",
                    "rgba(220, 53, 69, 0.1)",
                ),
            ],
        },
        title: "Activity Timeline (Last 7 Days)".to_string(),
    }
}

fn owned(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}
