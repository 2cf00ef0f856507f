use anyhow::{Result, bail};

pub const ENV_API_KEY: &str = "WEIGHLOG_FIREBASE_API_KEY";
pub const ENV_AUTH_DOMAIN: &str = "WEIGHLOG_FIREBASE_AUTH_DOMAIN";
pub const ENV_PROJECT_ID: &str = "WEIGHLOG_FIREBASE_PROJECT_ID";
pub const ENV_STORAGE_BUCKET: &str = "WEIGHLOG_FIREBASE_STORAGE_BUCKET";
pub const ENV_MESSAGING_SENDER_ID: &str = "WEIGHLOG_FIREBASE_MESSAGING_SENDER_ID";
pub const ENV_APP_ID: &str = "WEIGHLOG_FIREBASE_APP_ID";
pub const ENV_MEASUREMENT_ID: &str = "WEIGHLOG_FIREBASE_MEASUREMENT_ID";

/// Connection settings for the Firebase backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirebaseConfig {
    pub api_key: String,
    pub auth_domain: String,
    pub project_id: String,
    pub storage_bucket: String,
    pub messaging_sender_id: String,
    pub app_id: String,
    pub measurement_id: Option<String>,
}

impl FirebaseConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Every required key must be present and
    /// non-empty; there are no defaults. All missing keys are reported at once.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut missing = Vec::new();
        let mut required = |key: &'static str| -> String {
            match lookup(key).map(|v| v.trim().to_string()) {
                Some(v) if !v.is_empty() => v,
                _ => {
                    missing.push(key);
                    String::new()
                }
            }
        };

        let config = Self {
            api_key: required(ENV_API_KEY),
            auth_domain: required(ENV_AUTH_DOMAIN),
            project_id: required(ENV_PROJECT_ID),
            storage_bucket: required(ENV_STORAGE_BUCKET),
            messaging_sender_id: required(ENV_MESSAGING_SENDER_ID),
            app_id: required(ENV_APP_ID),
            measurement_id: None,
        };

        if !missing.is_empty() {
            bail!(
                "Firebase backend is not configured. Missing: {}",
                missing.join(", ")
            );
        }

        Ok(Self {
            measurement_id: lookup(ENV_MEASUREMENT_ID)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            ..config
        })
    }
}
