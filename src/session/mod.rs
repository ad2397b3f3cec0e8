//! Broker session: connection state machine, retry policy and inbound routing

pub mod manager;
pub mod message_handler;
pub mod retry;

pub use manager::{ConnectReport, SessionError, SessionManager, SessionState};
pub use message_handler::{InboundRoute, MessageHandler};
pub use retry::{RetryDecision, RetryPolicy, DEFAULT_BACKOFF};
