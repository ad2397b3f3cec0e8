//! Pure connection configuration for the MQTT client
//!
//! This module contains pure functions for broker address parsing, option
//! construction and QoS mapping.

use crate::config::MqttSection;
use crate::transport::QoS;
use rumqttc::{MqttOptions, Transport as RumqttcTransport};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Default port for `mqtts://` brokers
pub const DEFAULT_TLS_PORT: u16 = 8883;
/// Default port for `mqtt://` brokers
pub const DEFAULT_PLAIN_PORT: u16 = 1883;

/// MQTT client construction errors
#[derive(Debug, Error, PartialEq)]
pub enum MqttError {
    #[error("Invalid broker URL: {0}")]
    InvalidBrokerUrl(String),
}

/// Broker host, port and transport security, parsed from the broker URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerEndpoint {
    pub host: String,
    pub port: u16,
    pub tls: bool,
}

impl BrokerEndpoint {
    /// Parse `mqtt://host[:port]` or `mqtts://host[:port]`
    pub fn parse(broker_url: &str) -> Result<Self, MqttError> {
        let url =
            Url::parse(broker_url).map_err(|_| MqttError::InvalidBrokerUrl(broker_url.to_string()))?;

        let tls = match url.scheme() {
            "mqtts" | "ssl" => true,
            "mqtt" | "tcp" => false,
            _ => return Err(MqttError::InvalidBrokerUrl(broker_url.to_string())),
        };

        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| MqttError::InvalidBrokerUrl(broker_url.to_string()))?;

        let port = url
            .port()
            .unwrap_or(if tls { DEFAULT_TLS_PORT } else { DEFAULT_PLAIN_PORT });

        Ok(Self {
            host: host.to_string(),
            port,
            tls,
        })
    }
}

/// Per-connection settings that do not change between attempts
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionSettings {
    pub username: String,
    pub keep_alive: Duration,
    pub connect_timeout: Duration,
    pub poll_window: Duration,
    pub tls: bool,
}

impl ConnectionSettings {
    pub fn from_config(config: &MqttSection) -> Result<Self, MqttError> {
        let endpoint = BrokerEndpoint::parse(&config.broker_url)?;
        Ok(Self {
            username: config.username.clone(),
            keep_alive: Duration::from_secs(config.keep_alive_secs),
            connect_timeout: Duration::from_secs(config.connect_timeout_secs),
            poll_window: Duration::from_millis(config.poll_window_ms),
            tls: endpoint.tls,
        })
    }
}

/// Pure function to build MQTT options for one connection attempt
///
/// The password is the freshly minted device token.
pub fn configure_mqtt_options(
    host: &str,
    port: u16,
    client_id: &str,
    password: &str,
    settings: &ConnectionSettings,
) -> MqttOptions {
    let mut mqtt_options = MqttOptions::new(client_id, host, port);

    if settings.tls {
        mqtt_options.set_transport(RumqttcTransport::tls_with_default_config());
    }

    mqtt_options.set_credentials(settings.username.clone(), password);
    mqtt_options.set_keep_alive(settings.keep_alive);
    // Every attempt carries a new token; never resume broker-side state
    mqtt_options.set_clean_session(true);

    mqtt_options
}

/// Map the transport-neutral QoS onto rumqttc's
pub fn to_rumqttc_qos(qos: QoS) -> rumqttc::QoS {
    match qos {
        QoS::AtMostOnce => rumqttc::QoS::AtMostOnce,
        QoS::AtLeastOnce => rumqttc::QoS::AtLeastOnce,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_mqtt_config() -> MqttSection {
        MqttSection {
            broker_url: "mqtts://mqtt.googleapis.com:8883".to_string(),
            username: "unused".to_string(),
            private_key_path: "keys/device-ec.pem".into(),
            private_key_env: None,
            keep_alive_secs: 60,
            connect_timeout_secs: 30,
            poll_window_ms: 50,
        }
    }

    #[test]
    fn test_parse_tls_endpoint() {
        let endpoint = BrokerEndpoint::parse("mqtts://mqtt.googleapis.com:8883").unwrap();
        assert_eq!(endpoint.host, "mqtt.googleapis.com");
        assert_eq!(endpoint.port, 8883);
        assert!(endpoint.tls);
    }

    #[test]
    fn test_parse_default_ports() {
        assert_eq!(
            BrokerEndpoint::parse("mqtts://broker.example").unwrap().port,
            DEFAULT_TLS_PORT
        );
        let plain = BrokerEndpoint::parse("mqtt://localhost").unwrap();
        assert_eq!(plain.port, DEFAULT_PLAIN_PORT);
        assert!(!plain.tls);
    }

    #[test]
    fn test_invalid_broker_url() {
        assert!(matches!(
            BrokerEndpoint::parse("invalid-url"),
            Err(MqttError::InvalidBrokerUrl(_))
        ));
        assert!(matches!(
            BrokerEndpoint::parse("http://broker.example"),
            Err(MqttError::InvalidBrokerUrl(_))
        ));
    }

    #[test]
    fn test_settings_from_config() {
        let settings = ConnectionSettings::from_config(&test_mqtt_config()).unwrap();
        assert_eq!(settings.username, "unused");
        assert_eq!(settings.keep_alive, Duration::from_secs(60));
        assert_eq!(settings.connect_timeout, Duration::from_secs(30));
        assert_eq!(settings.poll_window, Duration::from_millis(50));
        assert!(settings.tls);
    }

    #[test]
    fn test_configure_mqtt_options() {
        let mut settings = ConnectionSettings::from_config(&test_mqtt_config()).unwrap();
        settings.tls = false;

        let options = configure_mqtt_options(
            "localhost",
            1883,
            "projects/p/locations/r/registries/g/devices/d",
            "token",
            &settings,
        );

        assert_eq!(
            options.client_id(),
            "projects/p/locations/r/registries/g/devices/d"
        );
        assert_eq!(options.broker_address(), ("localhost".to_string(), 1883));
        assert_eq!(
            options.credentials(),
            Some(("unused".to_string(), "token".to_string()))
        );
        assert_eq!(options.keep_alive(), Duration::from_secs(60));
        assert!(options.clean_session());
    }

    #[test]
    fn test_qos_mapping() {
        assert_eq!(to_rumqttc_qos(QoS::AtMostOnce), rumqttc::QoS::AtMostOnce);
        assert_eq!(to_rumqttc_qos(QoS::AtLeastOnce), rumqttc::QoS::AtLeastOnce);
    }
}
