//! Derived data snapshots.
//!
//! A snapshot is a flat JSON object. The presence of an `error` field marks
//! it as a failure snapshot; everything else is a success.

use serde::Serialize;
use serde_json::{Map, Value};

use super::UnitName;

const ERROR_KEY: &str = "error";
const UNIT_KEY: &str = "unit";

/// The computed, client-facing representation of a unit at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct DerivedData(Map<String, Value>);

impl DerivedData {
    /// Successful snapshot; the unit name is recorded under `unit`.
    pub fn success(unit: &UnitName, mut payload: Map<String, Value>) -> Self {
        payload.insert(UNIT_KEY.into(), Value::String(unit.to_string()));
        Self(payload)
    }

    /// Error-flagged snapshot.
    pub fn failure(unit: Option<&UnitName>, message: impl Into<String>) -> Self {
        let mut fields = Map::new();
        fields.insert(ERROR_KEY.into(), Value::String(message.into()));
        if let Some(unit) = unit {
            fields.insert(UNIT_KEY.into(), Value::String(unit.to_string()));
        }
        Self(fields)
    }

    pub fn is_failure(&self) -> bool {
        self.0.contains_key(ERROR_KEY)
    }

    /// Error message, if this is a failure snapshot.
    pub fn error(&self) -> Option<&str> {
        match self.0.get(ERROR_KEY)? {
            Value::String(s) => Some(s),
            _ => Some("unknown error"),
        }
    }

    pub fn unit(&self) -> Option<&str> {
        self.0.get(UNIT_KEY).and_then(Value::as_str)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    /// HTTP status for the `/json` endpoint.
    pub fn status_code(&self) -> u16 {
        if self.is_failure() { 400 } else { 200 }
    }

    /// Serialized body, shared by `/json` and the event stream payload.
    pub fn to_json(&self) -> String {
        // A map of JSON values has no non-string keys, serialization cannot fail
        serde_json::to_string(&self.0).unwrap_or_else(|_| String::from("{}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_success_records_unit() {
        let data = DerivedData::success(&UnitName::new("box"), payload(json!({"parts": 3})));
        assert!(!data.is_failure());
        assert_eq!(data.unit(), Some("box"));
        assert_eq!(data.fields()["parts"], json!(3));
        assert_eq!(data.status_code(), 200);
    }

    #[test]
    fn test_failure_is_flagged() {
        let data = DerivedData::failure(Some(&UnitName::new("box")), "syntax error");
        assert!(data.is_failure());
        assert_eq!(data.error(), Some("syntax error"));
        assert_eq!(data.unit(), Some("box"));
        assert_eq!(data.status_code(), 400);
    }

    #[test]
    fn test_payload_error_field_marks_failure() {
        let data = DerivedData::success(&UnitName::new("a"), payload(json!({"error": 1})));
        assert!(data.is_failure());
        assert_eq!(data.error(), Some("unknown error"));
    }

    #[test]
    fn test_to_json_is_flat_object() {
        let data = DerivedData::failure(None, "no units");
        let parsed: Value = serde_json::from_str(&data.to_json()).unwrap();
        assert_eq!(parsed, json!({"error": "no units"}));
    }
}
