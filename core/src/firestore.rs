//! Firestore REST wire format for the `users/{uid}/daily_logs` collection.
//!
//! Pure request builders and response decoders; the HTTP client lives in the
//! CLI crate.

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::models::DailyLogEntry;

pub const COLLECTION: &str = "daily_logs";

/// `projects/{project}/databases/(default)/documents`
#[must_use]
pub fn database_root(project_id: &str) -> String {
    format!("projects/{project_id}/databases/(default)/documents")
}

#[must_use]
pub fn document_name(project_id: &str, uid: &str, date: &str) -> String {
    format!(
        "{}/users/{uid}/{COLLECTION}/{date}",
        database_root(project_id)
    )
}

/// Body for `POST {root}/users/{uid}:runQuery`, ordered by date ascending.
#[must_use]
pub fn ordered_query() -> Value {
    json!({
        "structuredQuery": {
            "from": [{ "collectionId": COLLECTION }],
            "orderBy": [{
                "field": { "fieldPath": "date" },
                "direction": "ASCENDING"
            }]
        }
    })
}

/// Merge-upsert of `{date, weight}`: the update mask limits the write to those
/// two fields so `food` survives.
#[must_use]
pub fn merge_weight_write(name: &str, date: &str, weight: f64) -> Value {
    json!({
        "update": {
            "name": name,
            "fields": {
                "date": { "stringValue": date },
                "weight": { "doubleValue": weight }
            }
        },
        "updateMask": { "fieldPaths": ["date", "weight"] }
    })
}

/// Set-union append. Also writes `date` so a new document is queryable.
#[must_use]
pub fn append_food_write(name: &str, date: &str, item: &str) -> Value {
    json!({
        "update": {
            "name": name,
            "fields": { "date": { "stringValue": date } }
        },
        "updateMask": { "fieldPaths": ["date"] },
        "updateTransforms": [{
            "fieldPath": "food",
            "appendMissingElements": { "values": [{ "stringValue": item }] }
        }]
    })
}

/// Set-element removal. The `exists` precondition keeps a removal against a
/// missing day from creating an empty document.
#[must_use]
pub fn remove_food_write(name: &str, item: &str) -> Value {
    json!({
        "update": { "name": name, "fields": {} },
        "updateMask": { "fieldPaths": [] },
        "updateTransforms": [{
            "fieldPath": "food",
            "removeAllFromArray": { "values": [{ "stringValue": item }] }
        }],
        "currentDocument": { "exists": true }
    })
}

#[must_use]
pub fn commit_body(writes: Vec<Value>) -> Value {
    json!({ "writes": writes })
}

#[derive(Debug, Deserialize)]
pub struct QueryResult {
    pub document: Option<Document>,
}

#[derive(Debug, Deserialize)]
pub struct Document {
    pub name: String,
    #[serde(default)]
    pub fields: serde_json::Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct ErrorDetail {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: String,
}

/// Decode a `runQuery` response. Rows without a document (the trailing
/// `readTime`-only row) are skipped.
pub fn decode_query_response(results: Vec<QueryResult>) -> Result<Vec<DailyLogEntry>> {
    results
        .into_iter()
        .filter_map(|r| r.document)
        .map(|doc| decode_document(&doc))
        .collect()
}

pub fn decode_document(doc: &Document) -> Result<DailyLogEntry> {
    let date = match doc.fields.get("date") {
        Some(v) => string_value(v).with_context(|| format!("bad date in {}", doc.name))?,
        None => doc
            .name
            .rsplit('/')
            .next()
            .map(str::to_string)
            .with_context(|| format!("document name without id: {}", doc.name))?,
    };

    let weight = match doc.fields.get("weight") {
        Some(v) if v.get("nullValue").is_some() => None,
        Some(v) => Some(number_value(v).with_context(|| format!("bad weight on {date}"))?),
        None => None,
    };

    let food = match doc.fields.get("food") {
        Some(v) => Some(string_array(v).with_context(|| format!("bad food list on {date}"))?),
        None => None,
    };

    Ok(DailyLogEntry { date, weight, food })
}

fn string_value(v: &Value) -> Result<String> {
    match v.get("stringValue").and_then(Value::as_str) {
        Some(s) => Ok(s.to_string()),
        None => bail!("expected stringValue, got {v}"),
    }
}

fn number_value(v: &Value) -> Result<f64> {
    if let Some(d) = v.get("doubleValue") {
        // Firestore sends NaN and infinities as strings.
        if let Some(n) = d.as_f64() {
            return Ok(n);
        }
        if let Some(s) = d.as_str() {
            return s.parse().with_context(|| format!("invalid doubleValue '{s}'"));
        }
    }
    if let Some(i) = v.get("integerValue") {
        // int64 values travel as decimal strings.
        if let Some(s) = i.as_str() {
            let n: i64 = s
                .parse()
                .with_context(|| format!("invalid integerValue '{s}'"))?;
            #[allow(clippy::cast_precision_loss)]
            return Ok(n as f64);
        }
        if let Some(n) = i.as_f64() {
            return Ok(n);
        }
    }
    bail!("expected a number, got {v}")
}

fn string_array(v: &Value) -> Result<Vec<String>> {
    let Some(array) = v.get("arrayValue") else {
        bail!("expected arrayValue, got {v}");
    };
    // An empty array is sent as `{"arrayValue": {}}`.
    let Some(values) = array.get("values").and_then(Value::as_array) else {
        return Ok(Vec::new());
    };
    values.iter().map(string_value).collect()
}
