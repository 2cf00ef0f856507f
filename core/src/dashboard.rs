use crate::error::{AuthError, LogError};
use crate::models::{DailyLogEntry, User};
use crate::service::LogService;
use crate::view::DashboardView;

/// Application state for one dashboard: who is signed in and what is on
/// screen. Owned by the shell and passed explicitly to every handler.
pub struct Dashboard {
    service: LogService,
    user: Option<User>,
    view: Option<DashboardView>,
}

impl Dashboard {
    #[must_use]
    pub fn new(service: LogService) -> Self {
        Self {
            service,
            user: None,
            view: None,
        }
    }

    #[must_use]
    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    /// `None` while signed out.
    #[must_use]
    pub fn view(&self) -> Option<&DashboardView> {
        self.view.as_ref()
    }

    /// React to an auth-change event. Signing in always reloads from the
    /// store; signing out drops whatever was rendered.
    pub async fn handle_auth_change(&mut self, user: Option<User>) -> Result<(), LogError> {
        self.view = None;
        self.user = user;
        if self.user.is_some() {
            self.refresh().await?;
        }
        Ok(())
    }

    pub async fn refresh(&mut self) -> Result<(), LogError> {
        let uid = self.uid()?.to_string();
        let entries = self.service.load_entries(&uid).await?;
        self.render(&entries);
        Ok(())
    }

    pub async fn save_weight(&mut self, date: &str, weight: &str) -> Result<(), LogError> {
        let uid = self.uid()?.to_string();
        let entries = self.service.upsert_weight(&uid, date, weight).await?;
        self.render(&entries);
        Ok(())
    }

    pub async fn save_food(
        &mut self,
        date: &str,
        meal_type: &str,
        food: &str,
    ) -> Result<(), LogError> {
        let uid = self.uid()?.to_string();
        let entries = self.service.add_meal(&uid, date, meal_type, food).await?;
        self.render(&entries);
        Ok(())
    }

    pub async fn delete_food(&mut self, date: &str, item: &str) -> Result<(), LogError> {
        let uid = self.uid()?.to_string();
        let entries = self.service.remove_food_item(&uid, date, item).await?;
        self.render(&entries);
        Ok(())
    }

    fn uid(&self) -> Result<&str, AuthError> {
        self.user
            .as_ref()
            .map(|u| u.uid.as_str())
            .ok_or(AuthError::NotSignedIn)
    }

    fn render(&mut self, entries: &[DailyLogEntry]) {
        self.view = Some(DashboardView::build(entries));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AuthGate, Credentials, LocalIdentity};
    use crate::error::ValidationError;
    use crate::store::SqliteStore;

    use std::sync::Arc;
    use tokio::sync::mpsc;

    fn user(uid: &str) -> User {
        User {
            uid: uid.to_string(),
            display_name: None,
            email: None,
        }
    }

    fn dashboard() -> (Dashboard, Arc<SqliteStore>) {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let service = LogService::new(store.clone());
        (Dashboard::new(service), store)
    }

    #[tokio::test]
    async fn test_signed_out_has_no_view() {
        let (mut dash, _) = dashboard();
        dash.handle_auth_change(None).await.unwrap();
        assert!(dash.view().is_none());

        let err = dash.save_weight("2024-06-01", "80").await.unwrap_err();
        assert!(matches!(err, LogError::Auth(AuthError::NotSignedIn)));
    }

    #[tokio::test]
    async fn test_mutations_rebuild_view() {
        let (mut dash, _) = dashboard();
        dash.handle_auth_change(Some(user("u1"))).await.unwrap();
        assert_eq!(dash.view().unwrap().current_weight_label(), "-- kg");

        dash.save_weight("2024-06-01", "82.5").await.unwrap();
        dash.save_food("2024-06-01", "breakfast", "oatmeal").await.unwrap();
        let view = dash.view().unwrap();
        assert_eq!(view.current_weight, Some(82.5));
        assert_eq!(view.history[0].food[0].text, "breakfast: oatmeal");

        let key = view.history[0].food[0].delete_key.clone();
        dash.delete_food(&key.date, &key.item).await.unwrap();
        assert!(dash.view().unwrap().history[0].food.is_empty());
    }

    #[tokio::test]
    async fn test_failed_action_keeps_view() {
        let (mut dash, _) = dashboard();
        dash.handle_auth_change(Some(user("u1"))).await.unwrap();
        dash.save_weight("2024-06-01", "80").await.unwrap();
        let before = dash.view().cloned();

        let err = dash.save_weight("2024-06-01", "eighty").await.unwrap_err();
        assert!(matches!(
            err,
            LogError::Validation(ValidationError::InvalidWeight(_))
        ));
        assert_eq!(dash.view().cloned(), before);
        assert_eq!(dash.user().map(|u| u.uid.as_str()), Some("u1"));
    }

    #[tokio::test]
    async fn test_switching_users_never_shows_previous_entries() {
        let (mut dash, store) = dashboard();
        let provider = LocalIdentity::new(store);
        let gate = AuthGate::new();

        let (tx, mut rx) = mpsc::unbounded_channel();
        gate.on_auth_change(move |user| {
            let _ = tx.send(user.cloned());
        });

        let first = gate
            .sign_in(
                &provider,
                &Credentials {
                    email: "first@example.com".to_string(),
                    ..Credentials::default()
                },
            )
            .await
            .unwrap();
        while let Ok(event) = rx.try_recv() {
            dash.handle_auth_change(event).await.unwrap();
        }
        dash.save_weight("2024-06-01", "90").await.unwrap();
        dash.save_food("2024-06-01", "lunch", "pizza").await.unwrap();
        assert_eq!(dash.view().unwrap().history.len(), 1);

        gate.sign_out(&provider, &first).await.unwrap();
        gate.sign_in(
            &provider,
            &Credentials {
                email: "second@example.com".to_string(),
                ..Credentials::default()
            },
        )
        .await
        .unwrap();
        while let Ok(event) = rx.try_recv() {
            dash.handle_auth_change(event).await.unwrap();
        }

        let view = dash.view().unwrap();
        assert!(view.history.is_empty());
        assert_eq!(view.current_weight, None);
        assert_eq!(
            dash.user().and_then(|u| u.email.as_deref()),
            Some("second@example.com")
        );
    }
}
