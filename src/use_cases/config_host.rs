// CONFIG_HOST opcode handler (§4.1).

use serde::Deserialize;

use crate::domain::client::{ClientHandle, Role};
use crate::domain::errors::OpcodeError;
use crate::domain::protocol::{Delivery, OutboundEvent};
use crate::use_cases::password::hash_password;
use crate::use_cases::{error_reply, Engine};

#[derive(Debug, Deserialize)]
struct ConfigHostPayload {
    lobby_id: String,
    allow_host_reclaim: bool,
    allow_peers_to_claim_host: bool,
    max_peers: u32,
    #[serde(default)]
    password: String,
    #[serde(default)]
    pubkey: Option<String>,
}

pub async fn handle_config_host(
    engine: &Engine,
    handle: ClientHandle,
    payload: serde_json::Value,
    listener: Option<String>,
) -> Vec<Delivery> {
    let Some(record) = engine.registry.record_of(handle).await else {
        return Vec::new();
    };

    if !record.valid_session {
        return vec![error_reply(handle, OpcodeError::ConfigRequired, listener)];
    }

    match record.role {
        Role::Host => return vec![error_reply(handle, OpcodeError::AlreadyHost, listener)],
        Role::Peer => return vec![error_reply(handle, OpcodeError::AlreadyPeer, listener)],
        Role::Unconfigured => {}
    }

    let payload: ConfigHostPayload = match serde_json::from_value(payload) {
        Ok(payload) => payload,
        Err(e) => {
            return vec![error_reply(handle, OpcodeError::Violation(e.to_string()), None)]
        }
    };

    if payload.lobby_id.trim().is_empty() {
        return vec![error_reply(
            handle,
            OpcodeError::Violation("lobby_id is required".into()),
            None,
        )];
    }
    if payload.max_peers > 100 {
        return vec![error_reply(
            handle,
            OpcodeError::Violation("max_peers must be between 0 and 100".into()),
            None,
        )];
    }
    if payload.password.len() > 128 {
        return vec![error_reply(
            handle,
            OpcodeError::Violation("password must be at most 128 characters".into()),
            None,
        )];
    }

    let ulid = record.ulid.clone().unwrap_or_default();
    let username = record.username.clone().unwrap_or_default();

    let password_hash = if payload.password.is_empty() {
        None
    } else {
        match hash_password(&payload.password) {
            Ok(hash) => Some(hash),
            Err(e) => {
                return vec![error_reply(handle, OpcodeError::Violation(e), None)];
            }
        }
    };
    let is_public = password_hash.is_none();

    let created = engine
        .lobby_store
        .create(
            &record.ugi,
            &payload.lobby_id,
            payload.max_peers,
            payload.allow_host_reclaim,
            payload.allow_peers_to_claim_host,
            handle,
            ulid.clone(),
            username.clone(),
            payload.pubkey.clone(),
            password_hash,
        )
        .await;

    if created.is_err() {
        return vec![error_reply(handle, OpcodeError::LobbyExists, listener)];
    }

    engine
        .registry
        .set_host(handle, &record.ugi, &payload.lobby_id, payload.pubkey.clone())
        .await;

    let mut deliveries = vec![Delivery::reply(handle, OutboundEvent::AckHost, listener)];

    if is_public {
        let unassigned = engine.registry.unassigned_in(&record.ugi).await;
        for client in unassigned {
            deliveries.push(Delivery::unsolicited(
                client.handle,
                OutboundEvent::NewHost {
                    id: ulid.clone(),
                    user: username.clone(),
                    lobby_id: payload.lobby_id.clone(),
                    pubkey: payload.pubkey.clone(),
                },
            ));
        }
    }

    deliveries
}
