use anyhow::Result;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use weighlog_core::view::{ChartSeries, DashboardView, HistoryCard, NO_FOOD};

use crate::backend::Connection;

const BAR_WIDTH: usize = 40;

async fn load_view(conn: &Connection) -> Result<DashboardView> {
    let dashboard = conn.dashboard().await?;
    Ok(dashboard.view().cloned().unwrap_or_else(|| DashboardView::build(&[])))
}

pub(crate) async fn cmd_show(conn: &Connection, json: bool) -> Result<()> {
    let view = load_view(conn).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    println!("Hello, {}", conn.user().label());
    println!("Current weight: {}", view.current_weight_label());
    println!();
    if view.history.is_empty() {
        println!("Nothing logged yet.");
    } else {
        print_history_table(&view.history);
    }
    Ok(())
}

pub(crate) async fn cmd_history(conn: &Connection, json: bool) -> Result<()> {
    let view = load_view(conn).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&view.history)?);
    } else if view.history.is_empty() {
        println!("Nothing logged yet.");
    } else {
        print_history_table(&view.history);
    }
    Ok(())
}

pub(crate) async fn cmd_chart(conn: &Connection, json: bool) -> Result<()> {
    let view = load_view(conn).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&view.chart)?);
        return Ok(());
    }

    println!("{}", view.chart.label);
    if view.chart.labels.is_empty() {
        println!("Nothing logged yet.");
    }
    for line in render_chart(&view.chart, BAR_WIDTH) {
        println!("{line}");
    }
    Ok(())
}

fn print_history_table(cards: &[HistoryCard]) {
    #[derive(Tabled)]
    struct HistoryRow {
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Weight")]
        weight: String,
        #[tabled(rename = "Food")]
        food: String,
    }

    let rows: Vec<HistoryRow> = cards
        .iter()
        .map(|card| HistoryRow {
            date: card.date.clone(),
            weight: card.weight_label(),
            food: food_cell(card),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::single(1)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

/// Items are shown in full: `delete` matches them character for character.
pub(super) fn food_cell(card: &HistoryCard) -> String {
    if card.food.is_empty() {
        return NO_FOOD.to_string();
    }
    card.food
        .iter()
        .map(|line| format!("{}. {}", line.index, line.text))
        .collect::<Vec<_>>()
        .join("\n")
}

/// One row per date. Bars scale between the lowest and highest weight;
/// dates without a weight get an empty row.
fn render_chart(series: &ChartSeries, width: usize) -> Vec<String> {
    let range = series.range();
    series
        .labels
        .iter()
        .zip(&series.values)
        .map(|(date, value)| match (value, range) {
            (Some(v), Some((lo, hi))) => {
                let len = bar_len(*v, lo, hi, width);
                format!("{date} │{} {v}", "█".repeat(len))
            }
            _ => format!("{date} │"),
        })
        .collect()
}

#[allow(clippy::cast_precision_loss, clippy::cast_sign_loss)]
fn bar_len(value: f64, lo: f64, hi: f64, width: usize) -> usize {
    if hi <= lo {
        return width;
    }
    let scaled = (value - lo) / (hi - lo) * (width - 1) as f64;
    1 + scaled.round().clamp(0.0, (width - 1) as f64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use weighlog_core::models::DailyLogEntry;

    fn entry(date: &str, weight: Option<f64>) -> DailyLogEntry {
        DailyLogEntry {
            date: date.to_string(),
            weight,
            food: None,
        }
    }

    #[test]
    fn test_bar_len_scales_between_min_and_max() {
        assert_eq!(bar_len(80.0, 80.0, 90.0, 11), 1);
        assert_eq!(bar_len(90.0, 80.0, 90.0, 11), 11);
        assert_eq!(bar_len(85.0, 80.0, 90.0, 11), 6);
    }

    #[test]
    fn test_bar_len_flat_series() {
        assert_eq!(bar_len(70.0, 70.0, 70.0, 20), 20);
    }

    #[test]
    fn test_render_chart_leaves_gaps_blank() {
        let series = ChartSeries::from_entries(&[
            entry("2024-06-01", Some(80.0)),
            entry("2024-06-02", None),
            entry("2024-06-03", Some(82.0)),
        ]);
        let lines = render_chart(&series, 5);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "2024-06-01 │█ 80");
        assert_eq!(lines[1], "2024-06-02 │");
        assert_eq!(lines[2], "2024-06-03 │█████ 82");
    }

    #[test]
    fn test_render_chart_without_weights() {
        let series = ChartSeries::from_entries(&[entry("2024-06-01", None)]);
        assert_eq!(render_chart(&series, 5), vec!["2024-06-01 │".to_string()]);
    }

    #[test]
    fn test_food_cell() {
        let view = DashboardView::build(&[
            DailyLogEntry {
                date: "2024-06-01".to_string(),
                weight: None,
                food: Some(vec![
                    "breakfast: oatmeal".to_string(),
                    "lunch: ramen".to_string(),
                ]),
            },
            entry("2024-06-02", Some(80.0)),
        ]);
        assert_eq!(food_cell(&view.history[0]), NO_FOOD);
        assert_eq!(
            food_cell(&view.history[1]),
            "1. breakfast: oatmeal\n2. lunch: ramen"
        );
    }
}
