// Shared handler for the three SDP/ICE relay opcodes: MAKE_OFFER,
// MAKE_ANSWER, ICE (§4.1). Each relays an opaque payload to a named peer
// within the sender's own (ugi, lobby) and acks the sender.

use crate::domain::client::ClientHandle;
use crate::domain::errors::OpcodeError;
use crate::domain::protocol::{Delivery, OutboundEvent};
use crate::use_cases::ulid_check::is_valid_ulid;
use crate::use_cases::{error_reply, Engine};

pub async fn handle_relay(
    engine: &Engine,
    handle: ClientHandle,
    opcode: &'static str,
    recipient: Option<String>,
    payload: serde_json::Value,
    listener: Option<String>,
) -> Vec<Delivery> {
    let Some(record) = engine.registry.record_of(handle).await else {
        return Vec::new();
    };

    if !record.valid_session {
        return vec![error_reply(handle, OpcodeError::ConfigRequired, listener)];
    }

    let Some(recipient) = recipient else {
        return vec![error_reply(
            handle,
            OpcodeError::Warning("recipient is required".into()),
            listener,
        )];
    };
    if !is_valid_ulid(&recipient) {
        return vec![error_reply(
            handle,
            OpcodeError::Warning("recipient must be a ULID".into()),
            listener,
        )];
    }

    let Some(lobby) = &record.lobby else {
        return vec![error_reply(handle, OpcodeError::PeerInvalid, listener)];
    };

    let Some(target) = engine
        .registry
        .by_ulid_in_lobby(&recipient, &record.ugi, lobby)
        .await
    else {
        return vec![error_reply(handle, OpcodeError::PeerInvalid, listener)];
    };

    vec![
        Delivery::unsolicited(
            target,
            OutboundEvent::Relay {
                opcode,
                payload,
                origin_id: record.ulid.clone().unwrap_or_default(),
                origin_user: record.username.clone().unwrap_or_default(),
            },
        ),
        Delivery::reply(handle, OutboundEvent::RelayOk, listener),
    ]
}
