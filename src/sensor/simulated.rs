//! Host-side sensor that produces plausible, slowly drifting readings

use super::{EnvironmentSensor, SensorError};
use tracing::info;

/// Baseline values around which the simulated channels oscillate
const BASE_TEMPERATURE: f32 = 21.5;
const BASE_HUMIDITY: f32 = 45.0;
const BASE_PRESSURE: f32 = 101.3;
const BASE_ILLUMINANCE: f32 = 320.0;

/// Deterministic sensor simulation
///
/// Every read of a channel advances that channel's phase, so consecutive
/// samples differ slightly while staying in a realistic range.
#[derive(Debug, Default)]
pub struct SimulatedSensor {
    initialized: bool,
    step: u32,
}

impl SimulatedSensor {
    pub fn new() -> Self {
        Self::default()
    }

    fn wave(&mut self, amplitude: f32, period: f32) -> f32 {
        self.step = self.step.wrapping_add(1);
        let phase = self.step as f32 / period * std::f32::consts::TAU;
        amplitude * phase.sin()
    }
}

impl EnvironmentSensor for SimulatedSensor {
    fn begin(&mut self) -> Result<(), SensorError> {
        self.initialized = true;
        info!("Simulated environment sensor initialized");
        Ok(())
    }

    fn read_temperature(&mut self) -> f32 {
        BASE_TEMPERATURE + self.wave(1.5, 97.0)
    }

    fn read_humidity(&mut self) -> f32 {
        BASE_HUMIDITY + self.wave(5.0, 89.0)
    }

    fn read_pressure(&mut self) -> f32 {
        BASE_PRESSURE + self.wave(0.4, 211.0)
    }

    fn read_illuminance(&mut self) -> f32 {
        (BASE_ILLUMINANCE + self.wave(150.0, 53.0)).max(0.0)
    }

    fn read_uva(&mut self) -> f32 {
        (2.0 + self.wave(1.0, 61.0)).max(0.0)
    }

    fn read_uvb(&mut self) -> f32 {
        (1.0 + self.wave(0.5, 61.0)).max(0.0)
    }

    fn read_uv_index(&mut self) -> f32 {
        (0.8 + self.wave(0.4, 61.0)).max(0.0)
    }
}
