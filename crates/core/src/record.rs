use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One inference request from a monitoring history.
///
/// Fields the dashboard does not know about are kept in `extra` so an
/// export writes them back under their original names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub timestamp: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub request_id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub status: String,
    #[serde(default, deserialize_with = "lenient_count")]
    pub response_time: Option<u64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub input_size: Option<u64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub output_size: Option<u64>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub error_message: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub input_text: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub output_text: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

fn value_text(v: Value) -> Option<String> {
    match v {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

/// Strings as-is, numbers and other scalars in their JSON spelling, null as empty.
fn lenient_string<'de, D>(d: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(value_text(Value::deserialize(d)?).unwrap_or_default())
}

/// Like [`lenient_string`] but keeps null as `None`; objects are re-encoded.
fn lenient_text<'de, D>(d: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(value_text(Value::deserialize(d)?))
}

/// Non-negative numbers, fractional ones rounded; anything else is absent.
fn lenient_count<'de, D>(d: D) -> Result<Option<u64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let v = Value::deserialize(d)?;
    let n = match &v {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && *f >= 0.0)
                .map(|f| f.round() as u64)
        }),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite() && *f >= 0.0)
            .map(|f| f.round() as u64),
        _ => None,
    };
    Ok(n)
}

impl HistoryRecord {
    pub fn new(
        request_id: impl Into<String>,
        status: impl Into<String>,
        timestamp: impl Into<String>,
    ) -> Self {
        Self {
            id: String::new(),
            timestamp: timestamp.into(),
            request_id: request_id.into(),
            status: status.into(),
            response_time: None,
            input_size: None,
            output_size: None,
            error_message: None,
            input_text: None,
            output_text: None,
            extra: BTreeMap::new(),
        }
    }

    /// Fields matched by the free-text search box; missing ones are empty.
    pub fn searchable_fields(&self) -> [&str; 4] {
        [
            self.request_id.as_str(),
            self.error_message.as_deref().unwrap_or(""),
            self.input_text.as_deref().unwrap_or(""),
            self.output_text.as_deref().unwrap_or(""),
        ]
    }

    /// Lowercased text the keyword search runs against.
    pub fn semantic_text(&self) -> String {
        format!(
            "{} {} {} {}",
            self.request_id,
            self.input_text.as_deref().unwrap_or(""),
            self.output_text.as_deref().unwrap_or(""),
            self.error_message.as_deref().unwrap_or(""),
        )
        .to_lowercase()
    }

    pub fn parsed_timestamp(&self) -> Option<DateTime<Utc>> {
        parse_instant(&self.timestamp)
    }

    pub fn confidence(&self) -> Option<f64> {
        self.output_text.as_deref().and_then(derive_confidence)
    }
}

/// RFC 3339, a naive date-time (UTC), or a bare date (UTC midnight).
pub fn parse_instant(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Some(t.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(t) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(t.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|t| t.and_utc())
}

/// Read a numeric `confidence` key out of a JSON payload.
///
/// Anything that is not a JSON object with a numeric `confidence`
/// yields `None`.
pub fn derive_confidence(payload: &str) -> Option<f64> {
    let value: Value = serde_json::from_str(payload).ok()?;
    value.get("confidence")?.as_f64()
}

/// A generated monitoring report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub size: String,
    #[serde(default)]
    pub description: String,
}

/// An entry of the activity feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub resource: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub status: String,
}
