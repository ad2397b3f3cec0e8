//! Testing utilities and mock implementations
//!
//! This module provides test doubles for the agent's collaborators so the
//! session and scheduling logic can run without a broker, sensor hardware or
//! wall-clock time.

pub mod mocks;

pub use mocks::*;
