use anyhow::Result;

use weighlog_core::dashboard::Dashboard;
use weighlog_core::error::LogError;
use weighlog_core::models::{compose_food_description, validate_date};
use weighlog_core::view::{DashboardView, DeleteKey};

use crate::backend::Connection;

use super::helpers::{confirm, json_error, resolve_date};

fn print_view(dashboard: &Dashboard, json: bool) -> Result<()> {
    if let Some(view) = dashboard.view() {
        if json {
            println!("{}", serde_json::to_string_pretty(view)?);
        } else {
            println!("Current weight: {}", view.current_weight_label());
        }
    }
    Ok(())
}

pub(crate) async fn cmd_weight(
    conn: &Connection,
    value: &str,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    let date = resolve_date(date);
    let mut dashboard = conn.dashboard().await?;
    dashboard.save_weight(&date, value).await?;

    if !json {
        println!("Logged {} kg for {date}", value.trim());
    }
    print_view(&dashboard, json)
}

pub(crate) async fn cmd_food(
    conn: &Connection,
    food: &str,
    meal: &str,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    let date = resolve_date(date);
    let mut dashboard = conn.dashboard().await?;
    dashboard.save_food(&date, meal, food).await?;

    if !json {
        println!(
            "Logged \"{}\" for {date}",
            compose_food_description(meal, food)?
        );
    }
    print_view(&dashboard, json)
}

/// Find the item `selector` names on `date`: the 1-based number shown in
/// history, or the item text exactly as stored.
fn resolve_item(view: &DashboardView, date: &str, selector: &str) -> Option<DeleteKey> {
    let card = view.history.iter().find(|card| card.date == date)?;
    let line = match selector.trim().parse::<usize>() {
        Ok(n) => card.food.get(n.checked_sub(1)?),
        Err(_) => card.food.iter().find(|line| line.text == selector),
    };
    line.map(|line| line.delete_key.clone())
}

fn item_present(view: Option<&DashboardView>, key: &DeleteKey) -> bool {
    view.and_then(|view| view.history.iter().find(|card| card.date == key.date))
        .is_some_and(|card| card.food.iter().any(|line| line.delete_key == *key))
}

pub(crate) async fn cmd_delete(
    conn: &Connection,
    date: &str,
    selector: &str,
    yes: bool,
    json: bool,
) -> Result<()> {
    let date = validate_date(&resolve_date(Some(date.to_string()))).map_err(LogError::from)?;
    let mut dashboard = conn.dashboard().await?;

    let Some(key) = dashboard
        .view()
        .and_then(|view| resolve_item(view, &date, selector))
    else {
        let message = format!("No matching item \"{selector}\" on {date}");
        if json {
            println!("{}", json_error(&message));
        } else {
            println!("{message}");
        }
        return Ok(());
    };

    if !yes && !confirm(&format!("Delete \"{}\" from {}?", key.item, key.date))? {
        if !json {
            println!("Cancelled.");
        }
        return Ok(());
    }

    dashboard.delete_food(&key.date, &key.item).await?;

    if item_present(dashboard.view(), &key) {
        tracing::debug!(date = %key.date, item = %key.item, "item still present after removal");
        if json {
            println!("{}", json_error("No matching item was removed"));
            return Ok(());
        }
        println!("No matching item \"{}\" on {}", key.item, key.date);
    } else if !json {
        println!("Deleted \"{}\" from {}", key.item, key.date);
    }
    print_view(&dashboard, json)
}

#[cfg(test)]
mod tests {
    use super::super::view::food_cell;
    use super::*;
    use std::sync::Arc;
    use weighlog_core::models::User;
    use weighlog_core::service::LogService;
    use weighlog_core::store::SqliteStore;

    const LONG_FOOD: &str =
        "grilled chicken salad with avocado, cherry tomatoes and a lemon vinaigrette";

    async fn signed_in() -> Dashboard {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let mut dashboard = Dashboard::new(LogService::new(store));
        dashboard
            .handle_auth_change(Some(User {
                uid: "u1".to_string(),
                display_name: None,
                email: None,
            }))
            .await
            .unwrap();
        dashboard.save_food("2024-06-01", "lunch", "ramen").await.unwrap();
        dashboard.save_food("2024-06-01", "dinner", LONG_FOOD).await.unwrap();
        dashboard
    }

    fn history_text(dashboard: &Dashboard, date: &str) -> String {
        let view = dashboard.view().unwrap();
        let card = view.history.iter().find(|card| card.date == date).unwrap();
        food_cell(card)
    }

    #[tokio::test]
    async fn test_history_shows_items_in_full() {
        let dashboard = signed_in().await;
        let shown = history_text(&dashboard, "2024-06-01");
        assert!(shown.contains(&format!("2. dinner: {LONG_FOOD}")));
    }

    #[tokio::test]
    async fn test_delete_by_number() {
        let mut dashboard = signed_in().await;
        let key = resolve_item(dashboard.view().unwrap(), "2024-06-01", "2").unwrap();
        assert_eq!(key.item, format!("dinner: {LONG_FOOD}"));

        dashboard.delete_food(&key.date, &key.item).await.unwrap();
        assert!(!item_present(dashboard.view(), &key));
        assert_eq!(history_text(&dashboard, "2024-06-01"), "1. lunch: ramen");
    }

    #[tokio::test]
    async fn test_delete_by_text_copied_from_history() {
        let mut dashboard = signed_in().await;
        let shown = history_text(&dashboard, "2024-06-01");
        let copied = shown.lines().nth(1).unwrap().trim_start_matches("2. ");

        let key = resolve_item(dashboard.view().unwrap(), "2024-06-01", copied).unwrap();
        assert!(item_present(dashboard.view(), &key));
        dashboard.delete_food(&key.date, &key.item).await.unwrap();
        assert!(!item_present(dashboard.view(), &key));
    }

    #[tokio::test]
    async fn test_unmatched_selector_resolves_to_nothing() {
        let dashboard = signed_in().await;
        let view = dashboard.view().unwrap();
        assert!(resolve_item(view, "2024-06-01", "dinner: grilled chicken sal…").is_none());
        assert!(resolve_item(view, "2024-06-01", "lunch: RAMEN").is_none());
        assert!(resolve_item(view, "2024-06-01", "0").is_none());
        assert!(resolve_item(view, "2024-06-01", "3").is_none());
        assert!(resolve_item(view, "2024-06-02", "1").is_none());
    }

    #[tokio::test]
    async fn test_item_present_detects_unchanged_log() {
        let mut dashboard = signed_in().await;
        let stale = DeleteKey {
            date: "2024-06-01".to_string(),
            item: "lunch: ramen".to_string(),
        };
        assert!(item_present(dashboard.view(), &stale));

        dashboard
            .delete_food("2024-06-01", "lunch: udon")
            .await
            .unwrap();
        assert!(item_present(dashboard.view(), &stale));
        assert!(!item_present(None, &stale));
    }
}
