// Protocol Engine (§4.1): dispatches validated inbound frames by opcode.

use std::sync::Arc;

use crate::domain::client::ClientHandle;
use crate::domain::ports::SessionVerifier;
use crate::domain::protocol::{Delivery, RawRequest};
use crate::use_cases::{config_host, config_peer, init, lobby_query, relay};
use crate::use_cases::{error_reply, ClientRegistry, LobbyStore};
use crate::domain::errors::OpcodeError;

/// Opcodes reserved by the wire contract but not yet implemented (§9, Open
/// Question 2). Accepted as valid opcodes so they never trigger VIOLATION;
/// produce no state change and no reply.
const RESERVED_NOOP_OPCODES: &[&str] = &[
    "CLAIM_HOST",
    "TRANSFER_HOST",
    "LOCK",
    "UNLOCK",
    "SIZE",
    "KICK",
];

/// Bundles the shared dependencies every opcode handler needs.
pub struct Engine {
    pub registry: Arc<ClientRegistry>,
    pub lobby_store: Arc<LobbyStore>,
    pub session_verifier: Arc<dyn SessionVerifier>,
    pub authless: bool,
}

impl Engine {
    pub async fn handle_frame(&self, handle: ClientHandle, request: RawRequest) -> Vec<Delivery> {
        let listener = request.listener.clone();
        match request.opcode.as_str() {
            "INIT" => init::handle_init(self, handle, request.payload, listener).await,
            "KEEPALIVE" => vec![Delivery::reply(
                handle,
                crate::domain::protocol::OutboundEvent::Keepalive,
                listener,
            )],
            "CONFIG_HOST" => config_host::handle_config_host(self, handle, request.payload, listener).await,
            "CONFIG_PEER" => config_peer::handle_config_peer(self, handle, request.payload, listener).await,
            "MAKE_OFFER" => relay::handle_relay(self, handle, "MAKE_OFFER", request.recipient, request.payload, listener).await,
            "MAKE_ANSWER" => relay::handle_relay(self, handle, "MAKE_ANSWER", request.recipient, request.payload, listener).await,
            "ICE" => relay::handle_relay(self, handle, "ICE", request.recipient, request.payload, listener).await,
            "LOBBY_LIST" => lobby_query::handle_lobby_list(self, handle, listener).await,
            "LOBBY_INFO" => lobby_query::handle_lobby_info(self, handle, request.payload, listener).await,
            opcode if RESERVED_NOOP_OPCODES.contains(&opcode) => Vec::new(),
            _ => vec![error_reply(
                handle,
                OpcodeError::Violation(format!("unknown opcode {}", request.opcode)),
                None,
            )],
        }
    }
}
