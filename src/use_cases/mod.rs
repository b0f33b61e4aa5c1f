pub mod config_host;
pub mod config_peer;
pub mod engine;
pub mod init;
pub mod lobby_query;
mod lobby_store;
pub mod password;
pub mod registry;
pub mod relay;
pub mod teardown;
pub mod ulid_check;

pub use engine::Engine;
pub use lobby_store::{LobbyExists, LobbyStore};
pub use registry::ClientRegistry;

use crate::domain::client::ClientHandle;
use crate::domain::errors::OpcodeError;
use crate::domain::protocol::{Delivery, OutboundEvent};

/// Builds the reply `Delivery` for a coded error.
pub fn error_reply(target: ClientHandle, error: OpcodeError, listener: Option<String>) -> Delivery {
    Delivery::reply(target, OutboundEvent::Error(error), listener)
}
