// Wire types for the admin backend.
//
// Every JSON response is wrapped in `{ code, message, data }`. Responses
// that don't match that envelope are rejected with a deserialization
// error rather than parsed as some other shape.

use chrono::{DateTime, TimeZone, Utc};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The canonical `{ code, message, data }` response envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub code: Option<Value>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    /// Take `data`, failing if the backend omitted it.
    pub fn into_data(self, endpoint: &str) -> Result<T, crate::Error> {
        self.data.ok_or_else(|| crate::Error::Deserialization {
            message: format!("{endpoint}: response envelope has no `data`"),
            body: String::new(),
        })
    }
}

/// One page of a listing endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    #[serde(default)]
    pub number: u32,
    #[serde(default)]
    pub size: u32,
    /// Terminal page marker; no further pages exist when `true`.
    pub last: bool,
    #[serde(default)]
    pub total_elements: Option<u64>,
}

/// A resource row: condition, allergy, ingredient, or food.
///
/// `id` is opaque; the backend may send it as a string or a number.
/// Resource-specific fields ride along untouched in `fields`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    #[serde(deserialize_with = "opaque_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Item {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            fields: Map::new(),
        }
    }

    /// Overlay a JSON object payload onto this item. `id` is never changed.
    pub fn merged_with(&self, patch: &Value) -> Self {
        let mut merged = self.clone();
        let Some(obj) = patch.as_object() else {
            return merged;
        };
        for (key, value) in obj {
            match key.as_str() {
                "id" => {}
                "name" => {
                    if let Some(name) = value.as_str() {
                        name.clone_into(&mut merged.name);
                    }
                }
                "description" => {
                    merged.description = value.as_str().map(str::to_owned);
                }
                _ => {
                    merged.fields.insert(key.clone(), value.clone());
                }
            }
        }
        merged
    }

    /// Build an item from a payload that already carries an `id`.
    pub fn from_payload(payload: &Value) -> Option<Self> {
        serde_json::from_value(payload.clone()).ok()
    }
}

fn opaque_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}

// ── Auth payloads ───────────────────────────────────────────────────

/// `data` of `/auths/login` and `/auths/refresh`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default, deserialize_with = "optional_timestamp")]
    pub access_expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default, deserialize_with = "optional_timestamp")]
    pub refresh_expires_at: Option<DateTime<Utc>>,
}

/// Accepts RFC 3339 strings or epoch milliseconds.
fn optional_timestamp<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error> {
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => DateTime::parse_from_rfc3339(&s)
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(de::Error::custom),
        Some(Value::Number(n)) => {
            let millis = n
                .as_i64()
                .ok_or_else(|| de::Error::custom("timestamp out of range"))?;
            Ok(Utc.timestamp_millis_opt(millis).single())
        }
        Some(other) => Err(de::Error::custom(format!("invalid timestamp: {other}"))),
    }
}

/// Error body shape: `{ message, code, field }`, all optional.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub code: Option<Value>,
    #[serde(default)]
    pub field: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numeric_ids_become_strings() {
        let item: Item = serde_json::from_value(json!({"id": 42, "name": "Oats"})).unwrap();
        assert_eq!(item.id, "42");
        assert_eq!(item.name, "Oats");
    }

    #[test]
    fn extra_fields_are_preserved() {
        let item: Item = serde_json::from_value(json!({
            "id": "a1", "name": "Peanut", "severity": "high"
        }))
        .unwrap();
        assert_eq!(item.fields.get("severity"), Some(&json!("high")));
        let back = serde_json::to_value(&item).unwrap();
        assert_eq!(back["severity"], "high");
    }

    #[test]
    fn merged_with_keeps_id() {
        let item = Item::new("x", "Old");
        let merged = item.merged_with(&json!({"id": "y", "name": "New", "calories": 120}));
        assert_eq!(merged.id, "x");
        assert_eq!(merged.name, "New");
        assert_eq!(merged.fields["calories"], 120);
    }

    #[test]
    fn envelope_without_data_is_rejected() {
        let env: Envelope<Item> = serde_json::from_value(json!({"code": 200})).unwrap();
        assert!(env.into_data("foods").is_err());
    }

    #[test]
    fn timestamps_accept_millis_and_rfc3339() {
        let a: TokenResponse = serde_json::from_value(json!({
            "accessToken": "t", "accessExpiresAt": 1_700_000_000_000_i64
        }))
        .unwrap();
        let b: TokenResponse = serde_json::from_value(json!({
            "accessToken": "t", "accessExpiresAt": "2023-11-14T22:13:20Z"
        }))
        .unwrap();
        assert_eq!(a.access_expires_at, b.access_expires_at);
        assert!(a.refresh_token.is_none());
    }
}
