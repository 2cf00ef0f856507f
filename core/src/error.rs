use thiserror::Error;

/// Language used for user-facing alerts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    En,
    ZhTw,
}

impl Locale {
    pub fn parse(s: &str) -> anyhow::Result<Self> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "en" | "en-us" | "en-gb" => Ok(Self::En),
            "zh-tw" | "zh-hant" | "zh" => Ok(Self::ZhTw),
            _ => anyhow::bail!("Unsupported language '{s}'. Use 'en' or 'zh-tw'"),
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("sign-in was cancelled")]
    Cancelled,
    #[error("not signed in")]
    NotSignedIn,
    #[error("sign-in failed: {0}")]
    SignIn(String),
    #[error("sign-out failed: {0}")]
    SignOut(String),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to load entries: {0:#}")]
    Load(#[source] anyhow::Error),
    #[error("failed to save entry: {0:#}")]
    Save(#[source] anyhow::Error),
    #[error("failed to delete food item: {0:#}")]
    Delete(#[source] anyhow::Error),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("date is required")]
    MissingDate,
    #[error("invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("weight is required")]
    MissingWeight,
    #[error("invalid weight '{0}', expected a number")]
    InvalidWeight(String),
    #[error("food description is required")]
    MissingFood,
    #[error("invalid meal type '{0}', expected one of: breakfast, lunch, dinner, snack")]
    InvalidMealType(String),
}

#[derive(Debug, Error)]
pub enum LogError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl LogError {
    /// Localized text shown to the user when the triggering action fails.
    ///
    /// Storage alerts never include the underlying error; auth alerts carry
    /// the provider's message.
    #[must_use]
    pub fn alert(&self, locale: Locale) -> String {
        match (self, locale) {
            (Self::Auth(AuthError::SignIn(msg)), Locale::En) => format!("Sign-in failed: {msg}"),
            (Self::Auth(AuthError::SignIn(msg)), Locale::ZhTw) => format!("登入失敗: {msg}"),
            (Self::Auth(AuthError::SignOut(msg)), Locale::En) => format!("Sign-out failed: {msg}"),
            (Self::Auth(AuthError::SignOut(msg)), Locale::ZhTw) => format!("登出失敗: {msg}"),
            (Self::Auth(AuthError::Cancelled), Locale::En) => "Sign-in was cancelled.".to_string(),
            (Self::Auth(AuthError::Cancelled), Locale::ZhTw) => "已取消登入。".to_string(),
            (Self::Auth(AuthError::NotSignedIn), Locale::En) => "Please sign in first.".to_string(),
            (Self::Auth(AuthError::NotSignedIn), Locale::ZhTw) => "請先登入。".to_string(),
            (Self::Storage(StorageError::Load(_)), Locale::En) => {
                "Could not load your log, please check your network connection.".to_string()
            }
            (Self::Storage(StorageError::Load(_)), Locale::ZhTw) => {
                "載入失敗，請檢查網路連線".to_string()
            }
            (Self::Storage(StorageError::Save(_)), Locale::En) => {
                "Save failed, please check your network connection.".to_string()
            }
            (Self::Storage(StorageError::Save(_)), Locale::ZhTw) => {
                "儲存失敗，請檢查網路連線".to_string()
            }
            (Self::Storage(StorageError::Delete(_)), Locale::En) => "Delete failed.".to_string(),
            (Self::Storage(StorageError::Delete(_)), Locale::ZhTw) => "刪除失敗".to_string(),
            (Self::Validation(v), locale) => validation_alert(v, locale),
        }
    }
}

fn validation_alert(err: &ValidationError, locale: Locale) -> String {
    match (err, locale) {
        (ValidationError::MissingFood, Locale::En) => {
            "Please enter a date and a food item.".to_string()
        }
        (ValidationError::MissingFood, Locale::ZhTw) => "請輸入日期和食物項目。".to_string(),
        (ValidationError::InvalidMealType(_), Locale::En) => {
            "Please choose breakfast, lunch, dinner or snack.".to_string()
        }
        (ValidationError::InvalidMealType(_), Locale::ZhTw) => {
            "請選擇早餐、午餐、晚餐或點心。".to_string()
        }
        (ValidationError::InvalidDate(d), Locale::En) => {
            format!("Invalid date '{d}'. Use YYYY-MM-DD.")
        }
        (ValidationError::InvalidDate(d), Locale::ZhTw) => {
            format!("日期格式錯誤: '{d}'，請使用 YYYY-MM-DD。")
        }
        (ValidationError::InvalidWeight(w), Locale::En) => {
            format!("Invalid weight '{w}'. Enter a number.")
        }
        (ValidationError::InvalidWeight(w), Locale::ZhTw) => {
            format!("體重格式錯誤: '{w}'，請輸入數字。")
        }
        (ValidationError::MissingDate | ValidationError::MissingWeight, Locale::En) => {
            "Please enter a date and weight.".to_string()
        }
        (ValidationError::MissingDate | ValidationError::MissingWeight, Locale::ZhTw) => {
            "請輸入日期和體重。".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_alerts_hide_details() {
        let err = LogError::from(StorageError::Save(anyhow::anyhow!("permission denied: /secret")));
        let alert = err.alert(Locale::En);
        assert!(!alert.contains("secret"));
        assert_eq!(err.alert(Locale::ZhTw), "儲存失敗，請檢查網路連線");
    }

    #[test]
    fn save_and_delete_alerts_differ() {
        let save = LogError::from(StorageError::Save(anyhow::anyhow!("x")));
        let delete = LogError::from(StorageError::Delete(anyhow::anyhow!("x")));
        assert_ne!(save.alert(Locale::En), delete.alert(Locale::En));
        assert_eq!(delete.alert(Locale::ZhTw), "刪除失敗");
    }

    #[test]
    fn sign_in_alert_includes_provider_message() {
        let err = LogError::from(AuthError::SignIn("INVALID_PASSWORD".to_string()));
        assert_eq!(err.alert(Locale::En), "Sign-in failed: INVALID_PASSWORD");
        assert_eq!(err.alert(Locale::ZhTw), "登入失敗: INVALID_PASSWORD");
    }

    #[test]
    fn weight_and_food_validation_alerts_differ() {
        let weight = LogError::from(ValidationError::MissingWeight);
        let food = LogError::from(ValidationError::MissingFood);
        assert_eq!(weight.alert(Locale::ZhTw), "請輸入日期和體重。");
        assert_eq!(food.alert(Locale::ZhTw), "請輸入日期和食物項目。");
    }

    #[test]
    fn locale_parse() {
        assert_eq!(Locale::parse("en").unwrap(), Locale::En);
        assert_eq!(Locale::parse("zh_TW").unwrap(), Locale::ZhTw);
        assert!(Locale::parse("fr").is_err());
    }
}
