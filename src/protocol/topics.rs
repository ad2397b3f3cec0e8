//! Device identity, client id and topic derivation
//!
//! Everything the broker knows about this device follows from the four
//! identity segments: the MQTT client id and the per-device topics.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identity validation errors
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("{field} cannot be empty")]
    EmptySegment { field: &'static str },
    #[error("{field} contains invalid character: '{ch}'")]
    InvalidSegmentChar { field: &'static str, ch: char },
}

/// Fixed identity of this device within the cloud broker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub project_id: String,
    pub region: String,
    pub registry_id: String,
    pub device_id: String,
}

impl Identity {
    pub fn new(
        project_id: impl Into<String>,
        region: impl Into<String>,
        registry_id: impl Into<String>,
        device_id: impl Into<String>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            region: region.into(),
            registry_id: registry_id.into(),
            device_id: device_id.into(),
        }
    }

    /// Check every identity segment
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_segment("project_id", &self.project_id)?;
        validate_segment("region", &self.region)?;
        validate_segment("registry_id", &self.registry_id)?;
        validate_segment("device_id", &self.device_id)?;
        Ok(())
    }

    /// MQTT client id:
    /// `projects/{project}/locations/{region}/registries/{registry}/devices/{device}`
    pub fn client_id(&self) -> String {
        format!(
            "projects/{}/locations/{}/registries/{}/devices/{}",
            self.project_id, self.region, self.registry_id, self.device_id
        )
    }

    /// Status topic: `/devices/{device}/state`
    pub fn state_topic(&self) -> String {
        format!("/devices/{}/state", self.device_id)
    }

    /// Telemetry topic: `/devices/{device}/events`
    pub fn events_topic(&self) -> String {
        format!("/devices/{}/events", self.device_id)
    }

    /// Inbound configuration topic: `/devices/{device}/config`
    pub fn config_topic(&self) -> String {
        format!("/devices/{}/config", self.device_id)
    }

    /// Inbound command filter: `/devices/{device}/commands/#`
    pub fn commands_filter(&self) -> String {
        format!("/devices/{}/commands/#", self.device_id)
    }

    /// Whether `topic` falls under the command filter
    pub fn is_command_topic(&self, topic: &str) -> bool {
        let prefix = format!("/devices/{}/commands", self.device_id);
        topic == prefix
            || topic
                .strip_prefix(&prefix)
                .is_some_and(|rest| rest.starts_with('/'))
    }
}

/// Identity segments may only contain `[A-Za-z0-9._~+%-]`
pub fn validate_segment(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::EmptySegment { field });
    }

    for ch in value.chars() {
        if !ch.is_ascii_alphanumeric() && !matches!(ch, '.' | '_' | '~' | '+' | '%' | '-') {
            return Err(ValidationError::InvalidSegmentChar { field, ch });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn identity() -> Identity {
        Identity::new("my-project", "europe-west1", "sensors", "mkr-env-01")
    }

    #[test]
    fn test_client_id_format() {
        assert_eq!(
            identity().client_id(),
            "projects/my-project/locations/europe-west1/registries/sensors/devices/mkr-env-01"
        );
    }

    #[test]
    fn test_topic_construction() {
        let id = identity();
        assert_eq!(id.state_topic(), "/devices/mkr-env-01/state");
        assert_eq!(id.events_topic(), "/devices/mkr-env-01/events");
        assert_eq!(id.config_topic(), "/devices/mkr-env-01/config");
        assert_eq!(id.commands_filter(), "/devices/mkr-env-01/commands/#");
    }

    #[test]
    fn test_command_topic_matching() {
        let id = identity();
        assert!(id.is_command_topic("/devices/mkr-env-01/commands"));
        assert!(id.is_command_topic("/devices/mkr-env-01/commands/reboot"));
        assert!(id.is_command_topic("/devices/mkr-env-01/commands/a/b"));
        assert!(!id.is_command_topic("/devices/mkr-env-01/commandsx"));
        assert!(!id.is_command_topic("/devices/mkr-env-01/config"));
        assert!(!id.is_command_topic("/devices/other/commands/reboot"));
    }

    #[test]
    fn test_validate_accepts_valid_identity() {
        assert_eq!(identity().validate(), Ok(()));
    }

    #[test]
    fn test_validate_rejects_empty_segment() {
        let mut id = identity();
        id.project_id.clear();
        assert_eq!(
            id.validate(),
            Err(ValidationError::EmptySegment {
                field: "project_id"
            })
        );
    }

    #[test]
    fn test_validate_rejects_slash() {
        let mut id = identity();
        id.device_id = "dev/42".to_string();
        assert_eq!(
            id.validate(),
            Err(ValidationError::InvalidSegmentChar {
                field: "device_id",
                ch: '/'
            })
        );
    }

    proptest! {
        #[test]
        fn valid_segments_always_pass(segment in "[A-Za-z0-9._~+%-]{1,32}") {
            prop_assert!(validate_segment("device_id", &segment).is_ok());
        }

        #[test]
        fn topics_embed_device_id(device in "[a-z0-9-]{1,16}") {
            let id = Identity::new("p", "r", "g", device.clone());
            prop_assert!(id.state_topic().contains(&device));
            let command_topic = format!("/devices/{device}/commands/x");
            prop_assert!(id.is_command_topic(&command_topic));
        }
    }
}
