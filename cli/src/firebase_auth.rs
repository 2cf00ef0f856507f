use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;

use weighlog_core::auth::{Credentials, IdentityProvider, Session};
use weighlog_core::config::FirebaseConfig;
use weighlog_core::error::AuthError;
use weighlog_core::firestore::ErrorBody;
use weighlog_core::models::User;

const SIGN_IN_URL: &str = "https://identitytoolkit.googleapis.com/v1/accounts:signInWithPassword";
const REFRESH_URL: &str = "https://securetoken.googleapis.com/v1/token";

/// Shared HTTP client settings for every Firebase endpoint.
pub fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(format!(
            "weighlog-cli/{} (weight diary)",
            env!("CARGO_PKG_VERSION")
        ))
        .timeout(std::time::Duration::from_secs(10))
        .connect_timeout(std::time::Duration::from_secs(5))
        .build()
        .context("Failed to build HTTP client")
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    id_token: String,
    refresh_token: String,
    expires_in: String,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    expires_in: String,
    user_id: String,
}

/// Email/password accounts in Firebase Authentication.
pub struct FirebaseIdentity {
    client: reqwest::Client,
    api_key: String,
}

impl FirebaseIdentity {
    pub fn new(config: &FirebaseConfig) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            api_key: config.api_key.clone(),
        })
    }

    /// Trade the refresh token for a fresh id token.
    pub async fn refresh(&self, session: &Session) -> Result<Session, AuthError> {
        let Some(refresh_token) = session.refresh_token.as_deref() else {
            return Err(AuthError::NotSignedIn);
        };
        let resp = self
            .client
            .post(REFRESH_URL)
            .query(&[("key", self.api_key.as_str())])
            .json(&json!({
                "grant_type": "refresh_token",
                "refresh_token": refresh_token,
            }))
            .send()
            .await
            .map_err(|e| AuthError::SignIn(format!("Failed to reach Firebase Auth: {e}")))?;
        let data: RefreshResponse = read_json(resp).await?;
        tracing::debug!(uid = %session.user.uid, "refreshed Firebase id token");
        apply_refresh(session, data, Utc::now())
    }
}

#[async_trait]
impl IdentityProvider for FirebaseIdentity {
    async fn sign_in(&self, credentials: &Credentials) -> Result<Session, AuthError> {
        let email = credentials.email.trim();
        let password = credentials.password.as_deref().unwrap_or_default();
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::Cancelled);
        }

        let resp = self
            .client
            .post(SIGN_IN_URL)
            .query(&[("key", self.api_key.as_str())])
            .json(&json!({
                "email": email,
                "password": password,
                "returnSecureToken": true,
            }))
            .send()
            .await
            .map_err(|e| AuthError::SignIn(format!("Failed to reach Firebase Auth: {e}")))?;
        let data: SignInResponse = read_json(resp).await?;
        session_from_sign_in(data, Utc::now())
    }

    async fn sign_out(&self, session: &Session) -> Result<(), AuthError> {
        // Firebase ID tokens are stateless; dropping them is the sign-out.
        tracing::debug!(uid = %session.user.uid, "firebase sign-out");
        Ok(())
    }
}

async fn read_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, AuthError> {
    let status = resp.status();
    let body = resp
        .text()
        .await
        .map_err(|e| AuthError::SignIn(format!("Failed to read Firebase Auth response: {e}")))?;
    if !status.is_success() {
        return Err(AuthError::SignIn(error_message(&body, status)));
    }
    serde_json::from_str(&body)
        .map_err(|e| AuthError::SignIn(format!("Unexpected Firebase Auth response: {e}")))
}

/// The provider's own message (e.g. `INVALID_LOGIN_CREDENTIALS`), or the
/// HTTP status when the body is not the usual error envelope.
fn error_message(body: &str, status: reqwest::StatusCode) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) if !parsed.error.message.is_empty() => parsed.error.message,
        _ => format!("HTTP {status}"),
    }
}

fn expiry(expires_in: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>, AuthError> {
    let secs: i64 = expires_in
        .trim()
        .parse()
        .map_err(|_| AuthError::SignIn(format!("invalid token lifetime '{expires_in}'")))?;
    Ok(now + chrono::Duration::seconds(secs))
}

fn session_from_sign_in(data: SignInResponse, now: DateTime<Utc>) -> Result<Session, AuthError> {
    let expires_at = expiry(&data.expires_in, now)?;
    Ok(Session {
        user: User {
            uid: data.local_id,
            display_name: data.display_name.filter(|n| !n.is_empty()),
            email: data.email.filter(|e| !e.is_empty()),
        },
        id_token: Some(data.id_token),
        refresh_token: Some(data.refresh_token),
        expires_at: Some(expires_at),
    })
}

fn apply_refresh(
    session: &Session,
    data: RefreshResponse,
    now: DateTime<Utc>,
) -> Result<Session, AuthError> {
    if data.user_id != session.user.uid {
        return Err(AuthError::SignIn(
            "refreshed token belongs to a different user".to_string(),
        ));
    }
    Ok(Session {
        user: session.user.clone(),
        id_token: Some(data.id_token),
        refresh_token: Some(data.refresh_token),
        expires_at: Some(expiry(&data.expires_in, now)?),
    })
}
