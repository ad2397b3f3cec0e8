//! Observability: structured logging
//!
//! Log output is configured from the environment; see [`logging`].

pub mod logging;

pub use logging::{init_default_logging, init_logging, LogFormat};

// Span macros for structured logging
pub use logging::{session_span, tick_span};
