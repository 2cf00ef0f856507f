use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// One day of the log, keyed by its ISO date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyLogEntry {
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub food: Option<Vec<String>>,
}

impl DailyLogEntry {
    #[must_use]
    pub fn new(date: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            weight: None,
            food: None,
        }
    }

    /// Food items, treating an absent field as empty.
    #[must_use]
    pub fn food_items(&self) -> &[String] {
        self.food.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub uid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl User {
    /// Name shown in the greeting: display name, then email, then uid.
    #[must_use]
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .or(self.email.as_deref().filter(|e| !e.is_empty()))
            .unwrap_or(self.uid.as_str())
    }
}

pub const MEAL_TYPES: &[&str] = &["breakfast", "lunch", "dinner", "snack"];

pub fn validate_meal_type(meal: &str) -> Result<String, ValidationError> {
    let lower = meal.trim().to_lowercase();
    if MEAL_TYPES.contains(&lower.as_str()) {
        Ok(lower)
    } else {
        Err(ValidationError::InvalidMealType(meal.to_string()))
    }
}

/// Validate a `YYYY-MM-DD` date and return it normalized.
pub fn validate_date(date: &str) -> Result<String, ValidationError> {
    let date = date.trim();
    if date.is_empty() {
        return Err(ValidationError::MissingDate);
    }
    let parsed = NaiveDate::parse_from_str(date, DATE_FORMAT)
        .map_err(|_| ValidationError::InvalidDate(date.to_string()))?;
    Ok(parsed.format(DATE_FORMAT).to_string())
}

/// Parse user weight input. Only numeric parsing is applied; the range is
/// not checked.
pub fn parse_weight(input: &str) -> Result<f64, ValidationError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(ValidationError::MissingWeight);
    }
    match input.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(ValidationError::InvalidWeight(input.to_string())),
    }
}

/// Build the stored `"meal: food"` string.
pub fn compose_food_description(meal_type: &str, food: &str) -> Result<String, ValidationError> {
    let meal = validate_meal_type(meal_type)?;
    let food = food.trim();
    if food.is_empty() {
        return Err(ValidationError::MissingFood);
    }
    Ok(format!("{meal}: {food}"))
}
