// LOBBY_LIST and LOBBY_INFO opcode handlers (§4.1).

use crate::domain::client::{ClientHandle, Role};
use crate::domain::errors::OpcodeError;
use crate::domain::protocol::{Delivery, OutboundEvent};
use crate::use_cases::{error_reply, Engine};

async fn require_unconfigured(
    engine: &Engine,
    handle: ClientHandle,
) -> Result<String, Delivery> {
    let Some(record) = engine.registry.record_of(handle).await else {
        return Err(error_reply(handle, OpcodeError::ConfigRequired, None));
    };
    if !record.valid_session {
        return Err(error_reply(handle, OpcodeError::ConfigRequired, None));
    }
    match record.role {
        Role::Host => Err(error_reply(handle, OpcodeError::AlreadyHost, None)),
        Role::Peer => Err(error_reply(handle, OpcodeError::AlreadyPeer, None)),
        Role::Unconfigured => Ok(record.ugi),
    }
}

pub async fn handle_lobby_list(
    engine: &Engine,
    handle: ClientHandle,
    listener: Option<String>,
) -> Vec<Delivery> {
    let ugi = match require_unconfigured(engine, handle).await {
        Ok(ugi) => ugi,
        Err(mut delivery) => {
            delivery.frame.listener = listener;
            return vec![delivery];
        }
    };

    let lobbies = engine.lobby_store.public_lobbies_of(&ugi).await;
    vec![Delivery::reply(handle, OutboundEvent::LobbyList(lobbies), listener)]
}

pub async fn handle_lobby_info(
    engine: &Engine,
    handle: ClientHandle,
    payload: serde_json::Value,
    listener: Option<String>,
) -> Vec<Delivery> {
    let ugi = match require_unconfigured(engine, handle).await {
        Ok(ugi) => ugi,
        Err(mut delivery) => {
            delivery.frame.listener = listener;
            return vec![delivery];
        }
    };

    let Some(lobby_id) = payload.as_str() else {
        return vec![error_reply(
            handle,
            OpcodeError::Violation("payload must be a lobby id string".into()),
            None,
        )];
    };

    let Some(lobby) = engine.lobby_store.get(&ugi, lobby_id).await else {
        return vec![error_reply(handle, OpcodeError::LobbyNotfound, listener)];
    };
    if !lobby.is_public() {
        return vec![error_reply(handle, OpcodeError::LobbyNotfound, listener)];
    }

    let current_peers = engine.registry.peers_in(&ugi, lobby_id).await.len() as u32;

    vec![Delivery::reply(
        handle,
        OutboundEvent::LobbyInfo {
            host_id: lobby.current_owner_ulid,
            host_username: lobby.current_owner_username,
            current_peers,
            max_peers: lobby.maximum_peers,
        },
        listener,
    )]
}
