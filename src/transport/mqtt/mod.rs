//! MQTT transport backed by rumqttc
//!
//! # Architecture
//!
//! - [`connection`] - Pure broker address parsing and option construction
//! - [`client`] - Impure I/O operations against the broker
//!
//! # Usage
//!
//! ```rust,no_run
//! use envagent::config::MqttSection;
//! use envagent::transport::{mqtt::MqttClient, Transport};
//!
//! # tokio_test::block_on(async {
//! let config = MqttSection::default();
//! let mut client = MqttClient::new(&config)?;
//! client
//!     .connect("mqtt.googleapis.com", 8883, "projects/p/locations/r/registries/g/devices/d", "<jwt>")
//!     .await?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! # });
//! ```

pub mod client;
pub mod connection;

pub use client::MqttClient;
pub use connection::{
    configure_mqtt_options, BrokerEndpoint, ConnectionSettings, MqttError,
};
