//! Configuration loading and validation tests
//!
//! Tests focus on BEHAVIOR of configuration loading, validation, and error handling.

use envagent::agent::{ConfigStore, IntervalKind};
use envagent::config::{AgentConfig, ConfigError};
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

const DEVICE_SECTION: &str = r#"
[device]
project_id = "my-project"
region = "europe-west1"
registry_id = "sensors"
device_id = "mkr-env-01"
"#;

fn write_config(content: &str) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().unwrap();
    write!(temp_file, "{content}").unwrap();
    temp_file
}

#[test]
fn test_config_loads_successfully_from_valid_toml() {
    let temp_file = write_config(&format!(
        r#"{DEVICE_SECTION}
[mqtt]
broker_url = "mqtts://mqtt.googleapis.com:8883"
private_key_path = "/etc/envagent/device-ec.pem"

[reconnect]
backoff_ms = 5000

[schedule]
sampling_ms = 30000
status_ms = 300000
telemetry_ms = 900000
"#
    ));

    let config = AgentConfig::load_from_file(temp_file.path()).unwrap();

    assert_eq!(config.device.project_id, "my-project");
    assert_eq!(
        config.identity().client_id(),
        "projects/my-project/locations/europe-west1/registries/sensors/devices/mkr-env-01"
    );
    let endpoint = config.broker_endpoint().unwrap();
    assert_eq!(endpoint.host, "mqtt.googleapis.com");
    assert_eq!(endpoint.port, 8883);
    assert!(endpoint.tls);

    let store = ConfigStore::from_schedule(&config.schedule);
    assert_eq!(store.get(IntervalKind::Sampling), 30_000);
    assert_eq!(store.get(IntervalKind::Status), 300_000);
    assert_eq!(store.get(IntervalKind::Telemetry), 900_000);
}

#[test]
fn test_device_section_alone_uses_defaults() {
    let temp_file = write_config(DEVICE_SECTION);
    let config = AgentConfig::load_from_file(temp_file.path()).unwrap();

    assert_eq!(config.mqtt.broker_url, "mqtts://mqtt.googleapis.com:8883");
    assert_eq!(config.mqtt.connect_timeout_secs, 30);
    assert_eq!(config.mqtt.poll_window_ms, 50);

    let policy = config.retry_policy();
    assert_eq!(policy.backoff, Duration::from_secs(5));
    assert_eq!(policy.max_attempts, None);

    assert_eq!(ConfigStore::from_schedule(&config.schedule), ConfigStore::new());
}

#[test]
fn test_missing_file_is_file_read_error() {
    let result = AgentConfig::load_from_file(std::path::Path::new("/nonexistent/envagent.toml"));
    assert!(matches!(result, Err(ConfigError::FileRead(_))));
}

#[test]
fn test_malformed_toml_is_parse_error() {
    let temp_file = write_config("[device\nproject_id = ");
    let result = AgentConfig::load_from_file(temp_file.path());
    assert!(matches!(result, Err(ConfigError::TomlParse(_))));
}

#[test]
fn test_empty_device_id_is_rejected() {
    let temp_file = write_config(
        r#"
[device]
project_id = "my-project"
region = "europe-west1"
registry_id = "sensors"
device_id = ""
"#,
    );
    let result = AgentConfig::load_from_file(temp_file.path());
    assert!(matches!(result, Err(ConfigError::InvalidIdentity(_))));
}

#[test]
fn test_unsupported_broker_scheme_is_rejected() {
    let temp_file = write_config(&format!(
        "{DEVICE_SECTION}\n[mqtt]\nbroker_url = \"https://mqtt.googleapis.com\"\n"
    ));
    let result = AgentConfig::load_from_file(temp_file.path());
    assert!(matches!(result, Err(ConfigError::InvalidConfig(_))));
}

#[test]
fn test_zero_poll_window_is_rejected() {
    let temp_file = write_config(&format!(
        "{DEVICE_SECTION}\n[mqtt]\npoll_window_ms = 0\n"
    ));
    let result = AgentConfig::load_from_file(temp_file.path());
    assert!(matches!(result, Err(ConfigError::InvalidConfig(_))));
}

#[test]
fn test_negative_schedule_is_accepted() {
    // Interval values are not range-checked at load time either
    let temp_file = write_config(&format!(
        "{DEVICE_SECTION}\n[schedule]\nsampling_ms = -1\n"
    ));
    let config = AgentConfig::load_from_file(temp_file.path()).unwrap();
    assert_eq!(config.schedule.sampling_ms, -1);
}

#[test]
fn test_bounded_reconnect_policy() {
    let temp_file = write_config(&format!(
        "{DEVICE_SECTION}\n[reconnect]\nbackoff_ms = 250\nmax_attempts = 4\n"
    ));
    let config = AgentConfig::load_from_file(temp_file.path()).unwrap();

    let policy = config.retry_policy();
    assert_eq!(policy.backoff, Duration::from_millis(250));
    assert_eq!(policy.max_attempts, Some(4));
}
