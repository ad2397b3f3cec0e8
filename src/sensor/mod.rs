//! Environmental sensor collaborator
//!
//! The agent reads temperature, humidity, pressure, illuminance and UV bands
//! through [`EnvironmentSensor`]. Hardware drivers live outside this crate;
//! [`SimulatedSensor`] stands in for them when running on a host.

use thiserror::Error;

pub mod simulated;

pub use simulated::SimulatedSensor;

/// Sensor subsystem errors
#[derive(Debug, Error)]
pub enum SensorError {
    #[error("Sensor initialization failed: {0}")]
    InitFailed(String),
}

/// Synchronous reading interface of an environmental sensor board
///
/// Readings are assumed to be always available once [`begin`](Self::begin)
/// has succeeded.
pub trait EnvironmentSensor: Send {
    /// Initialize the sensor. Called once at startup; failure is fatal.
    fn begin(&mut self) -> Result<(), SensorError>;

    /// Temperature in degrees Celsius
    fn read_temperature(&mut self) -> f32;

    /// Relative humidity in percent
    fn read_humidity(&mut self) -> f32;

    /// Barometric pressure in kPa
    fn read_pressure(&mut self) -> f32;

    /// Illuminance in lux
    fn read_illuminance(&mut self) -> f32;

    /// UVA irradiance
    fn read_uva(&mut self) -> f32;

    /// UVB irradiance
    fn read_uvb(&mut self) -> f32;

    /// UV index
    fn read_uv_index(&mut self) -> f32;
}
