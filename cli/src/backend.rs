use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;

use weighlog_core::auth::{AuthGate, IdentityProvider, LocalIdentity};
use weighlog_core::config::FirebaseConfig;
use weighlog_core::dashboard::Dashboard;
use weighlog_core::error::{AuthError, LogError};
use weighlog_core::models::User;
use weighlog_core::service::LogService;
use weighlog_core::store::{DocumentStore, SqliteStore};

use crate::config::Config;
use crate::firebase_auth::FirebaseIdentity;
use crate::firestore::{FirestoreStore, REFRESH_MARGIN_SECS};
use crate::session::{self, Backend, StoredSession};

/// Identity provider for `backend`. The local one shares the log database.
pub(crate) fn identity_provider(
    config: &Config,
    backend: Backend,
) -> Result<Box<dyn IdentityProvider>> {
    Ok(match backend {
        Backend::Local => {
            let store = Arc::new(SqliteStore::open(&config.db_path)?);
            Box::new(LocalIdentity::new(store))
        }
        Backend::Firebase => Box::new(FirebaseIdentity::new(&FirebaseConfig::from_env()?)?),
    })
}

/// The signed-in user's log, opened on the backend they signed in with.
pub(crate) struct Connection {
    pub stored: StoredSession,
    pub service: LogService,
}

impl Connection {
    pub(crate) async fn open(config: &Config) -> Result<Self> {
        let Some(mut stored) = session::load(&config.session_path)? else {
            return Err(LogError::from(AuthError::NotSignedIn).into());
        };

        let store: Arc<dyn DocumentStore> = match stored.backend {
            Backend::Local => Arc::new(SqliteStore::open(&config.db_path)?),
            Backend::Firebase => {
                let firebase = FirebaseConfig::from_env()?;
                if stored.session.needs_refresh(Utc::now(), REFRESH_MARGIN_SECS) {
                    let identity = FirebaseIdentity::new(&firebase)?;
                    stored.session = identity
                        .refresh(&stored.session)
                        .await
                        .map_err(LogError::from)?;
                    session::save(&config.session_path, &stored)?;
                }
                Arc::new(FirestoreStore::new(&firebase, stored.session.clone())?)
            }
        };

        tracing::debug!(backend = ?stored.backend, uid = %stored.session.user.uid, "opened log");
        Ok(Self {
            stored,
            service: LogService::new(store),
        })
    }

    pub(crate) fn user(&self) -> &User {
        &self.stored.session.user
    }

    /// A dashboard fed by an auth gate restored from the stored session.
    pub(crate) async fn dashboard(&self) -> Result<Dashboard, LogError> {
        let gate = AuthGate::restored(Some(self.user().clone()));
        let mut dashboard = Dashboard::new(self.service.clone());
        dashboard.handle_auth_change(gate.current_user()).await?;
        Ok(dashboard)
    }
}
