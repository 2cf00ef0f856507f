use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AuthError;
use crate::models::User;
use crate::store::SqliteStore;

#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub email: String,
    pub password: Option<String>,
    pub display_name: Option<String>,
}

/// A signed-in user plus whatever tokens the provider handed out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user: User,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    #[must_use]
    pub fn local(user: User) -> Self {
        Self {
            user,
            id_token: None,
            refresh_token: None,
            expires_at: None,
        }
    }

    /// True when the id token expires within `margin_secs`.
    #[must_use]
    pub fn needs_refresh(&self, now: DateTime<Utc>, margin_secs: i64) -> bool {
        self.expires_at
            .is_some_and(|at| at - chrono::Duration::seconds(margin_secs) <= now)
    }
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in(&self, credentials: &Credentials) -> Result<Session, AuthError>;

    async fn sign_out(&self, session: &Session) -> Result<(), AuthError>;
}

/// Accounts kept in the local SQLite database, keyed by email. There is no
/// password check: the local backend trusts whoever runs the binary.
pub struct LocalIdentity {
    store: Arc<SqliteStore>,
}

impl LocalIdentity {
    pub fn new(store: Arc<SqliteStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl IdentityProvider for LocalIdentity {
    async fn sign_in(&self, credentials: &Credentials) -> Result<Session, AuthError> {
        let email = credentials.email.trim().to_lowercase();
        if email.is_empty() {
            return Err(AuthError::Cancelled);
        }
        let display_name = credentials
            .display_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty());
        let user = self
            .store
            .db()
            .find_or_create_account(&email, display_name)
            .map_err(|e| AuthError::SignIn(format!("{e:#}")))?;
        tracing::debug!(uid = %user.uid, "local sign-in");
        Ok(Session::local(user))
    }

    async fn sign_out(&self, session: &Session) -> Result<(), AuthError> {
        tracing::debug!(uid = %session.user.uid, "local sign-out");
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateState {
    SignedOut,
    SignedIn(User),
}

/// Handle returned by [`AuthGate::on_auth_change`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscription(u64);

type Listener = Arc<dyn Fn(Option<&User>) + Send + Sync>;

/// Holds the current identity and notifies subscribers on every sign-in and
/// sign-out.
pub struct AuthGate {
    current: Mutex<Option<User>>,
    listeners: Mutex<Vec<(u64, Listener)>>,
    next_id: AtomicU64,
}

impl Default for AuthGate {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthGate {
    #[must_use]
    pub fn new() -> Self {
        Self {
            current: Mutex::new(None),
            listeners: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Gate that starts signed in, e.g. from a persisted session.
    #[must_use]
    pub fn restored(user: Option<User>) -> Self {
        let gate = Self::new();
        *gate.current.lock().unwrap_or_else(PoisonError::into_inner) = user;
        gate
    }

    #[must_use]
    pub fn current_user(&self) -> Option<User> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn state(&self) -> GateState {
        match self.current_user() {
            Some(user) => GateState::SignedIn(user),
            None => GateState::SignedOut,
        }
    }

    /// Register `callback`. It runs right away with the current user and
    /// again after every sign-in or sign-out until unsubscribed.
    pub fn on_auth_change<F>(&self, callback: F) -> Subscription
    where
        F: Fn(Option<&User>) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let listener: Listener = Arc::new(callback);
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::clone(&listener)));
        let current = self.current_user();
        listener(current.as_ref());
        Subscription(id)
    }

    pub fn unsubscribe(&self, subscription: Subscription) {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(id, _)| *id != subscription.0);
    }

    pub async fn sign_in(
        &self,
        provider: &dyn IdentityProvider,
        credentials: &Credentials,
    ) -> Result<Session, AuthError> {
        let session = provider.sign_in(credentials).await?;
        self.set_user(Some(session.user.clone()));
        Ok(session)
    }

    pub async fn sign_out(
        &self,
        provider: &dyn IdentityProvider,
        session: &Session,
    ) -> Result<(), AuthError> {
        provider.sign_out(session).await?;
        self.set_user(None);
        Ok(())
    }

    fn set_user(&self, user: Option<User>) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = user.clone();
        // Listeners run outside the lock so they may call back into the gate.
        let listeners: Vec<Listener> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in listeners {
            listener(user.as_ref());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds(email: &str) -> Credentials {
        Credentials {
            email: email.to_string(),
            ..Credentials::default()
        }
    }

    fn recorder(gate: &AuthGate) -> (Subscription, Arc<Mutex<Vec<Option<String>>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let sub = gate.on_auth_change(move |user| {
            sink.lock().unwrap().push(user.map(|u| u.uid.clone()));
        });
        (sub, seen)
    }

    #[tokio::test]
    async fn test_subscription_fires_immediately_and_on_changes() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let provider = LocalIdentity::new(store);
        let gate = AuthGate::new();
        let (_sub, seen) = recorder(&gate);

        assert_eq!(*seen.lock().unwrap(), vec![None]);

        let session = gate.sign_in(&provider, &creds("a@example.com")).await.unwrap();
        gate.sign_out(&provider, &session).await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[1].as_deref(), Some(session.user.uid.as_str()));
        assert_eq!(seen[2], None);
        assert_eq!(gate.state(), GateState::SignedOut);
    }

    #[tokio::test]
    async fn test_unsubscribe_stops_notifications() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let provider = LocalIdentity::new(store);
        let gate = AuthGate::new();
        let (sub, seen) = recorder(&gate);
        gate.unsubscribe(sub);

        gate.sign_in(&provider, &creds("a@example.com")).await.unwrap();
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_sign_in_keeps_state() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let provider = LocalIdentity::new(store);
        let gate = AuthGate::new();
        let (_sub, seen) = recorder(&gate);

        let err = gate.sign_in(&provider, &creds("   ")).await.unwrap_err();
        assert!(matches!(err, AuthError::Cancelled));
        assert_eq!(gate.state(), GateState::SignedOut);
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_local_identity_is_stable_per_email() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let provider = LocalIdentity::new(store);

        let first = provider.sign_in(&creds("Mei@Example.com")).await.unwrap();
        let second = provider.sign_in(&creds("mei@example.com")).await.unwrap();
        assert_eq!(first.user.uid, second.user.uid);
        assert_eq!(first.user.email.as_deref(), Some("mei@example.com"));
        assert!(first.id_token.is_none());
    }

    #[test]
    fn test_restored_gate_reports_user() {
        let user = User {
            uid: "u1".to_string(),
            display_name: None,
            email: None,
        };
        let gate = AuthGate::restored(Some(user.clone()));
        let (_sub, seen) = recorder(&gate);
        assert_eq!(gate.state(), GateState::SignedIn(user));
        assert_eq!(*seen.lock().unwrap(), vec![Some("u1".to_string())]);
    }

    #[test]
    fn test_session_needs_refresh() {
        let now = Utc::now();
        let mut session = Session::local(User {
            uid: "u1".to_string(),
            display_name: None,
            email: None,
        });
        assert!(!session.needs_refresh(now, 60));

        session.expires_at = Some(now + chrono::Duration::seconds(30));
        assert!(session.needs_refresh(now, 60));

        session.expires_at = Some(now + chrono::Duration::seconds(3600));
        assert!(!session.needs_refresh(now, 60));
    }
}
