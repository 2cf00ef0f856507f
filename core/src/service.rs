use std::sync::Arc;

use crate::error::{AuthError, LogError, StorageError, ValidationError};
use crate::models::{DailyLogEntry, compose_food_description, parse_weight, validate_date};
use crate::store::DocumentStore;

/// Reconciliation layer: turns user intents into store mutations and always
/// answers with the freshly reloaded collection.
#[derive(Clone)]
pub struct LogService {
    store: Arc<dyn DocumentStore>,
}

impl LogService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn load_entries(&self, uid: &str) -> Result<Vec<DailyLogEntry>, LogError> {
        if uid.is_empty() {
            return Ok(Vec::new());
        }
        let mut entries = self.store.query_ordered(uid).await.map_err(|e| {
            tracing::warn!(error = %format!("{e:#}"), "loading entries failed");
            StorageError::Load(e)
        })?;
        entries.sort_by(|a, b| a.date.cmp(&b.date));
        tracing::debug!(count = entries.len(), "entries loaded");
        Ok(entries)
    }

    pub async fn upsert_weight(
        &self,
        uid: &str,
        date: &str,
        weight_value: &str,
    ) -> Result<Vec<DailyLogEntry>, LogError> {
        let date = validate_date(date)?;
        let weight = parse_weight(weight_value)?;
        require_user(uid)?;

        tracing::debug!(%date, weight, "merging weight");
        self.store
            .merge_weight(uid, &date, weight)
            .await
            .map_err(|e| {
                tracing::warn!(error = %format!("{e:#}"), %date, "saving weight failed");
                StorageError::Save(e)
            })?;
        self.load_entries(uid).await
    }

    pub async fn upsert_food(
        &self,
        uid: &str,
        date: &str,
        food_description: &str,
    ) -> Result<Vec<DailyLogEntry>, LogError> {
        let date = validate_date(date)?;
        if food_description.trim().is_empty() {
            return Err(ValidationError::MissingFood.into());
        }
        require_user(uid)?;

        tracing::debug!(%date, "appending food item");
        self.store
            .append_food(uid, &date, food_description)
            .await
            .map_err(|e| {
                tracing::warn!(error = %format!("{e:#}"), %date, "saving food failed");
                StorageError::Save(e)
            })?;
        self.load_entries(uid).await
    }

    /// Compose `"{meal}: {food}"` and add it to the day's food set.
    pub async fn add_meal(
        &self,
        uid: &str,
        date: &str,
        meal_type: &str,
        food: &str,
    ) -> Result<Vec<DailyLogEntry>, LogError> {
        let description = compose_food_description(meal_type, food)?;
        self.upsert_food(uid, date, &description).await
    }

    /// Remove exactly `food_item` from the day's food set. Items that differ
    /// by even one character are left alone.
    pub async fn remove_food_item(
        &self,
        uid: &str,
        date: &str,
        food_item: &str,
    ) -> Result<Vec<DailyLogEntry>, LogError> {
        let date = validate_date(date)?;
        require_user(uid)?;

        tracing::debug!(%date, "removing food item");
        self.store
            .remove_food(uid, &date, food_item)
            .await
            .map_err(|e| {
                tracing::warn!(error = %format!("{e:#}"), %date, "removing food failed");
                StorageError::Delete(e)
            })?;
        self.load_entries(uid).await
    }
}

fn require_user(uid: &str) -> Result<(), AuthError> {
    if uid.is_empty() {
        Err(AuthError::NotSignedIn)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;
    use crate::view::current_weight;

    use anyhow::Result;
    use async_trait::async_trait;

    fn service() -> LogService {
        LogService::new(Arc::new(SqliteStore::open_in_memory().unwrap()))
    }

    /// Store whose every call fails, like a dropped connection.
    struct OfflineStore;

    #[async_trait]
    impl DocumentStore for OfflineStore {
        async fn query_ordered(&self, _uid: &str) -> Result<Vec<DailyLogEntry>> {
            anyhow::bail!("unavailable")
        }
        async fn merge_weight(&self, _uid: &str, _date: &str, _weight: f64) -> Result<()> {
            anyhow::bail!("unavailable")
        }
        async fn append_food(&self, _uid: &str, _date: &str, _item: &str) -> Result<()> {
            anyhow::bail!("unavailable")
        }
        async fn remove_food(&self, _uid: &str, _date: &str, _item: &str) -> Result<()> {
            anyhow::bail!("unavailable")
        }
    }

    #[tokio::test]
    async fn test_weight_is_last_write_wins() {
        let svc = service();
        svc.upsert_weight("u1", "2024-06-01", "80").await.unwrap();
        let entries = svc.upsert_weight("u1", "2024-06-01", "79.4").await.unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].weight, Some(79.4));
    }

    #[tokio::test]
    async fn test_food_union_is_idempotent() {
        let svc = service();
        svc.upsert_food("u1", "2024-06-01", "lunch: ramen").await.unwrap();
        let entries = svc.upsert_food("u1", "2024-06-01", "lunch: ramen").await.unwrap();

        let food = entries[0].food_items();
        assert_eq!(food.iter().filter(|f| *f == "lunch: ramen").count(), 1);
    }

    #[tokio::test]
    async fn test_add_then_remove_round_trips() {
        let svc = service();
        svc.upsert_food("u1", "2024-06-01", "dinner: curry").await.unwrap();
        let entries = svc
            .remove_food_item("u1", "2024-06-01", "dinner: curry")
            .await
            .unwrap();
        assert!(!entries[0].food_items().contains(&"dinner: curry".to_string()));
    }

    #[tokio::test]
    async fn test_remove_absent_item_is_noop() {
        let svc = service();
        let before = svc.upsert_food("u1", "2024-06-01", "snack: nuts").await.unwrap();
        let after = svc
            .remove_food_item("u1", "2024-06-01", "snack: chips")
            .await
            .unwrap();
        assert_eq!(before, after);

        // Missing document too
        let after = svc
            .remove_food_item("u1", "2024-07-01", "snack: nuts")
            .await
            .unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_load_entries_ascending_regardless_of_write_order() {
        let svc = service();
        svc.upsert_weight("u1", "2024-01-03", "68").await.unwrap();
        svc.upsert_food("u1", "2024-01-02", "lunch: toast").await.unwrap();
        svc.upsert_weight("u1", "2024-01-01", "70").await.unwrap();

        let entries = svc.load_entries("u1").await.unwrap();
        let dates: Vec<&str> = entries.iter().map(|e| e.date.as_str()).collect();
        assert_eq!(dates, ["2024-01-01", "2024-01-02", "2024-01-03"]);
        assert_eq!(current_weight(&entries), Some(68.0));
    }

    #[tokio::test]
    async fn test_scenario_single_day() {
        let svc = service();
        assert!(svc.load_entries("U1").await.unwrap().is_empty());

        let entries = svc.upsert_weight("U1", "2024-06-01", "82.5").await.unwrap();
        assert_eq!(
            entries,
            vec![DailyLogEntry {
                date: "2024-06-01".to_string(),
                weight: Some(82.5),
                food: None,
            }]
        );

        let entries = svc
            .upsert_food("U1", "2024-06-01", "breakfast: oatmeal")
            .await
            .unwrap();
        assert_eq!(entries[0].weight, Some(82.5));
        assert_eq!(entries[0].food_items(), ["breakfast: oatmeal"]);

        let entries = svc
            .remove_food_item("U1", "2024-06-01", "breakfast: oatmeal")
            .await
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].food_items().is_empty());
        assert_eq!(entries[0].weight, Some(82.5));
    }

    #[tokio::test]
    async fn test_add_meal_composes_description() {
        let svc = service();
        let entries = svc
            .add_meal("u1", "2024-06-01", "Dinner", "  grilled fish ")
            .await
            .unwrap();
        assert_eq!(entries[0].food_items(), ["dinner: grilled fish"]);
    }

    #[tokio::test]
    async fn test_validation_happens_before_store_calls() {
        let svc = LogService::new(Arc::new(OfflineStore));

        let err = svc.upsert_weight("u1", "2024-06-01", "").await.unwrap_err();
        assert!(matches!(
            err,
            LogError::Validation(ValidationError::MissingWeight)
        ));
        let err = svc.upsert_weight("u1", "", "80").await.unwrap_err();
        assert!(matches!(err, LogError::Validation(ValidationError::MissingDate)));
        let err = svc.add_meal("u1", "2024-06-01", "lunch", "").await.unwrap_err();
        assert!(matches!(err, LogError::Validation(ValidationError::MissingFood)));
    }

    #[tokio::test]
    async fn test_storage_errors_are_classified() {
        let svc = LogService::new(Arc::new(OfflineStore));

        let err = svc.load_entries("u1").await.unwrap_err();
        assert!(matches!(err, LogError::Storage(StorageError::Load(_))));
        let err = svc.upsert_weight("u1", "2024-06-01", "80").await.unwrap_err();
        assert!(matches!(err, LogError::Storage(StorageError::Save(_))));
        let err = svc
            .upsert_food("u1", "2024-06-01", "lunch: soup")
            .await
            .unwrap_err();
        assert!(matches!(err, LogError::Storage(StorageError::Save(_))));
        let err = svc
            .remove_food_item("u1", "2024-06-01", "lunch: soup")
            .await
            .unwrap_err();
        assert!(matches!(err, LogError::Storage(StorageError::Delete(_))));
    }

    #[tokio::test]
    async fn test_mutations_require_user() {
        let svc = service();
        let err = svc.upsert_weight("", "2024-06-01", "80").await.unwrap_err();
        assert!(matches!(err, LogError::Auth(AuthError::NotSignedIn)));
        assert!(svc.load_entries("").await.unwrap().is_empty());
    }
}
