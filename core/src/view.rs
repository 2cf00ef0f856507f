//! Projections of the ordered entry collection into what the dashboard shows.
//!
//! Every function here is pure and takes entries ascending by date, the order
//! `LogService::load_entries` returns.

use serde::Serialize;

use crate::models::DailyLogEntry;

pub const CHART_LABEL: &str = "Weight (kg)";

/// Shown on a history card whose day has no food items.
pub const NO_FOOD: &str = "No food logged.";

/// Weight of the most recent entry that has one. Later entries without a
/// weight (food-only days) are skipped.
#[must_use]
pub fn current_weight(entries: &[DailyLogEntry]) -> Option<f64> {
    entries.iter().rev().find_map(|e| e.weight)
}

#[must_use]
pub fn format_current_weight(weight: Option<f64>) -> String {
    match weight {
        Some(w) => format!("{w} kg"),
        None => "-- kg".to_string(),
    }
}

/// A single line series; `values[i]` is `None` where that date has no weight.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub label: String,
    pub labels: Vec<String>,
    pub values: Vec<Option<f64>>,
}

impl ChartSeries {
    #[must_use]
    pub fn from_entries(entries: &[DailyLogEntry]) -> Self {
        Self {
            label: CHART_LABEL.to_string(),
            labels: entries.iter().map(|e| e.date.clone()).collect(),
            values: entries.iter().map(|e| e.weight).collect(),
        }
    }

    /// Smallest and largest plotted value, ignoring gaps.
    #[must_use]
    pub fn range(&self) -> Option<(f64, f64)> {
        self.values.iter().flatten().fold(None, |acc, &v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
    }
}

/// Identifies one food item for deletion. The item text must match the stored
/// string exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteKey {
    pub date: String,
    pub item: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FoodLine {
    /// 1-based position within the card.
    pub index: usize,
    pub text: String,
    pub delete_key: DeleteKey,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryCard {
    pub date: String,
    pub weight: Option<f64>,
    pub food: Vec<FoodLine>,
}

impl HistoryCard {
    #[must_use]
    pub fn weight_label(&self) -> String {
        self.weight.map_or_else(|| "-".to_string(), |w| format!("{w} kg"))
    }
}

/// Cards newest first.
#[must_use]
pub fn history(entries: &[DailyLogEntry]) -> Vec<HistoryCard> {
    entries
        .iter()
        .rev()
        .map(|entry| HistoryCard {
            date: entry.date.clone(),
            weight: entry.weight,
            food: entry
                .food_items()
                .iter()
                .enumerate()
                .map(|(i, item)| FoodLine {
                    index: i + 1,
                    text: item.clone(),
                    delete_key: DeleteKey {
                        date: entry.date.clone(),
                        item: item.clone(),
                    },
                })
                .collect(),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub current_weight: Option<f64>,
    pub chart: ChartSeries,
    pub history: Vec<HistoryCard>,
}

impl DashboardView {
    #[must_use]
    pub fn build(entries: &[DailyLogEntry]) -> Self {
        Self {
            current_weight: current_weight(entries),
            chart: ChartSeries::from_entries(entries),
            history: history(entries),
        }
    }

    #[must_use]
    pub fn current_weight_label(&self) -> String {
        format_current_weight(self.current_weight)
    }
}
