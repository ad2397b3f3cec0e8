//! Wire message types
//!
//! Outbound telemetry and status documents, and the inbound configuration
//! update. All of them travel as JSON strings.

use crate::sensor::EnvironmentSensor;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Wire key for the sampling interval in configuration updates
pub const SAMPLING_KEY: &str = "env";
/// Wire key for the status interval in configuration updates
pub const STATUS_KEY: &str = "status";
/// Wire key for the telemetry interval in configuration updates
pub const TELEMETRY_KEY: &str = "telemetry";

/// Latest snapshot of every sensor channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    /// Epoch seconds at which the sample was taken
    pub timestamp: u64,
    pub temperature: f32,
    pub humidity: f32,
    pub pressure: f32,
    pub illuminance: f32,
    pub uva: f32,
    pub uvb: f32,
    pub uv_index: f32,
}

impl TelemetryRecord {
    /// Read every channel of `sensor` into a new record
    pub fn capture<S: EnvironmentSensor + ?Sized>(sensor: &mut S, timestamp: u64) -> Self {
        Self {
            timestamp,
            temperature: sensor.read_temperature(),
            humidity: sensor.read_humidity(),
            pressure: sensor.read_pressure(),
            illuminance: sensor.read_illuminance(),
            uva: sensor.read_uva(),
            uvb: sensor.read_uvb(),
            uv_index: sensor.read_uv_index(),
        }
    }
}

/// Heartbeat published on the state topic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRecord {
    /// Epoch seconds at which the status was built
    pub timestamp: u64,
    /// Milliseconds until the next telemetry publish; may be zero or negative
    /// when telemetry is due in the same tick
    pub next_telemetry_update: i64,
}

/// Rejection reason for an inbound configuration payload
#[derive(Debug, Error, PartialEq)]
pub enum MalformedPayload {
    #[error("Payload is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("Payload is not a JSON object")]
    NotAnObject,
}

/// Partial interval update received on the config topic
///
/// Fields that are absent, or present with a non-numeric value, stay `None`
/// and leave the stored interval untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigUpdate {
    pub sampling_ms: Option<i64>,
    pub status_ms: Option<i64>,
    pub telemetry_ms: Option<i64>,
}

impl ConfigUpdate {
    /// Parse a raw payload from the config topic
    pub fn from_payload(payload: &[u8]) -> Result<Self, MalformedPayload> {
        let value: Value = serde_json::from_slice(payload)
            .map_err(|e| MalformedPayload::InvalidJson(e.to_string()))?;
        match value {
            Value::Object(fields) => Ok(Self::from_fields(&fields)),
            _ => Err(MalformedPayload::NotAnObject),
        }
    }

    /// Pick the recognized keys out of a JSON object
    pub fn from_fields(fields: &Map<String, Value>) -> Self {
        Self {
            sampling_ms: fields.get(SAMPLING_KEY).and_then(interval_value),
            status_ms: fields.get(STATUS_KEY).and_then(interval_value),
            telemetry_ms: fields.get(TELEMETRY_KEY).and_then(interval_value),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sampling_ms.is_none() && self.status_ms.is_none() && self.telemetry_ms.is_none()
    }
}

/// Integer milliseconds from a JSON value. Floats truncate toward zero.
fn interval_value(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.is_finite())
            .map(|f| f.trunc() as i64)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_telemetry_record_wire_format() {
        let record = TelemetryRecord {
            timestamp: 1_700_000_000,
            temperature: 21.5,
            humidity: 40.0,
            pressure: 101.25,
            illuminance: 300.0,
            uva: 2.0,
            uvb: 1.0,
            uv_index: 0.5,
        };

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(
            value,
            json!({
                "timestamp": 1_700_000_000u64,
                "temperature": 21.5,
                "humidity": 40.0,
                "pressure": 101.25,
                "illuminance": 300.0,
                "uva": 2.0,
                "uvb": 1.0,
                "uv_index": 0.5,
            })
        );
    }

    #[test]
    fn test_status_record_wire_format() {
        let status = StatusRecord {
            timestamp: 1_700_000_600,
            next_telemetry_update: -3,
        };
        let json = serde_json::to_string(&status).unwrap();
        assert_eq!(
            json,
            r#"{"timestamp":1700000600,"next_telemetry_update":-3}"#
        );
    }

    #[test]
    fn test_parse_full_update() {
        let update =
            ConfigUpdate::from_payload(br#"{"env": 1000, "status": 2000, "telemetry": 3000}"#)
                .unwrap();
        assert_eq!(update.sampling_ms, Some(1000));
        assert_eq!(update.status_ms, Some(2000));
        assert_eq!(update.telemetry_ms, Some(3000));
    }

    #[test]
    fn test_parse_partial_update() {
        let update = ConfigUpdate::from_payload(br#"{"status": 5000}"#).unwrap();
        assert_eq!(
            update,
            ConfigUpdate {
                status_ms: Some(5000),
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_unrecognized_keys_are_ignored() {
        let update = ConfigUpdate::from_payload(br#"{"bogus": 1, "sampling": 5}"#).unwrap();
        assert!(update.is_empty());
    }

    #[test]
    fn test_non_numeric_value_is_ignored() {
        let update =
            ConfigUpdate::from_payload(br#"{"telemetry": "not-a-number", "status": 10}"#).unwrap();
        assert_eq!(update.telemetry_ms, None);
        assert_eq!(update.status_ms, Some(10));
    }

    #[test]
    fn test_float_values_truncate() {
        let update = ConfigUpdate::from_payload(br#"{"env": 1500.9, "status": -2.5}"#).unwrap();
        assert_eq!(update.sampling_ms, Some(1500));
        assert_eq!(update.status_ms, Some(-2));
    }

    #[test]
    fn test_zero_and_negative_pass_through() {
        let update = ConfigUpdate::from_payload(br#"{"env": 0, "status": -100}"#).unwrap();
        assert_eq!(update.sampling_ms, Some(0));
        assert_eq!(update.status_ms, Some(-100));
    }

    #[test]
    fn test_invalid_json_is_malformed() {
        let result = ConfigUpdate::from_payload(b"{not json");
        assert!(matches!(result, Err(MalformedPayload::InvalidJson(_))));
    }

    #[test]
    fn test_non_object_is_malformed() {
        assert_eq!(
            ConfigUpdate::from_payload(b"[1, 2, 3]"),
            Err(MalformedPayload::NotAnObject)
        );
        assert_eq!(
            ConfigUpdate::from_payload(b"42"),
            Err(MalformedPayload::NotAnObject)
        );
    }
}
