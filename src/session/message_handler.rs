//! Pure routing of inbound broker messages

use crate::protocol::{ConfigUpdate, Identity};
use crate::transport::InboundMessage;
use tracing::debug;

/// Where an inbound message should go
#[derive(Debug, Clone, PartialEq)]
pub enum InboundRoute {
    /// A parsed configuration update for the config store
    Config(ConfigUpdate),
    /// A message on the command topic tree
    Command { topic: String },
    /// Nothing to do: malformed config payload or unexpected topic
    Ignored,
}

/// Inbound message routing decisions
pub struct MessageHandler;

impl MessageHandler {
    /// Route one inbound message (pure function)
    ///
    /// A malformed config payload is dropped without surfacing an error.
    pub fn route(identity: &Identity, message: &InboundMessage) -> InboundRoute {
        if message.topic == identity.config_topic() {
            return match ConfigUpdate::from_payload(&message.payload) {
                Ok(update) => InboundRoute::Config(update),
                Err(e) => {
                    debug!(topic = %message.topic, reason = %e, "Dropping malformed config payload");
                    InboundRoute::Ignored
                }
            };
        }

        if identity.is_command_topic(&message.topic) {
            return InboundRoute::Command {
                topic: message.topic.clone(),
            };
        }

        debug!(topic = %message.topic, "Ignoring message on unexpected topic");
        InboundRoute::Ignored
    }
}
