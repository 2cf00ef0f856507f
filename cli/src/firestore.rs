use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::Mutex;

use weighlog_core::auth::Session;
use weighlog_core::config::FirebaseConfig;
use weighlog_core::firestore::{
    self, ErrorBody, QueryResult, append_food_write, commit_body, database_root,
    decode_query_response, document_name, merge_weight_write, ordered_query, remove_food_write,
};
use weighlog_core::models::DailyLogEntry;
use weighlog_core::store::DocumentStore;

use crate::firebase_auth::{FirebaseIdentity, http_client};

const FIRESTORE_URL: &str = "https://firestore.googleapis.com/v1";

/// Refresh the id token when it has less than this long to live.
pub const REFRESH_MARGIN_SECS: i64 = 300;

/// Cloud Firestore over REST, authorized as the signed-in user.
pub struct FirestoreStore {
    client: reqwest::Client,
    project_id: String,
    identity: FirebaseIdentity,
    session: Mutex<Session>,
}

impl FirestoreStore {
    pub fn new(config: &FirebaseConfig, session: Session) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            project_id: config.project_id.clone(),
            identity: FirebaseIdentity::new(config)?,
            session: Mutex::new(session),
        })
    }

    async fn bearer(&self) -> Result<String> {
        let mut session = self.session.lock().await;
        if session.needs_refresh(Utc::now(), REFRESH_MARGIN_SECS) {
            *session = self.identity.refresh(&session).await?;
        }
        session
            .id_token
            .clone()
            .context("Firebase session has no id token")
    }

    async fn commit(&self, write: Value) -> Result<reqwest::Response> {
        let url = format!("{FIRESTORE_URL}/{}:commit", database_root(&self.project_id));
        let token = self.bearer().await?;
        self.client
            .post(&url)
            .bearer_auth(token)
            .json(&commit_body(vec![write]))
            .send()
            .await
            .context("Failed to reach Firestore")
    }
}

async fn ensure_success(resp: reqwest::Response) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorBody>(&body) {
        Ok(parsed) => bail!(
            "Firestore {} ({}): {}",
            parsed.error.status,
            parsed.error.code,
            parsed.error.message
        ),
        Err(_) => bail!("Firestore returned HTTP {status}"),
    }
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn query_ordered(&self, uid: &str) -> Result<Vec<DailyLogEntry>> {
        let url = format!(
            "{FIRESTORE_URL}/{}/users/{uid}:runQuery",
            database_root(&self.project_id)
        );
        let token = self.bearer().await?;
        let resp = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&ordered_query())
            .send()
            .await
            .context("Failed to reach Firestore")?;
        let rows: Vec<QueryResult> = ensure_success(resp)
            .await?
            .json()
            .await
            .context("Failed to parse Firestore query response")?;
        decode_query_response(rows)
    }

    async fn merge_weight(&self, uid: &str, date: &str, weight: f64) -> Result<()> {
        let name = document_name(&self.project_id, uid, date);
        ensure_success(self.commit(merge_weight_write(&name, date, weight)).await?).await?;
        Ok(())
    }

    async fn append_food(&self, uid: &str, date: &str, item: &str) -> Result<()> {
        let name = document_name(&self.project_id, uid, date);
        ensure_success(self.commit(append_food_write(&name, date, item)).await?).await?;
        Ok(())
    }

    async fn remove_food(&self, uid: &str, date: &str, item: &str) -> Result<()> {
        let name = document_name(&self.project_id, uid, date);
        let resp = self.commit(remove_food_write(&name, item)).await?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            tracing::debug!(
                date,
                collection = firestore::COLLECTION,
                "no document, removal is a no-op"
            );
            return Ok(());
        }
        ensure_success(resp).await?;
        Ok(())
    }
}
