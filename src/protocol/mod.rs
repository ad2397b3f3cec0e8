//! Device protocol: identity, topics and wire messages

pub mod messages;
pub mod topics;

pub use messages::*;
pub use topics::{validate_segment, Identity, ValidationError};
