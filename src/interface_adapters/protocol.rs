// Wire serialization (§6): maps the domain's semantic `OutboundEvent`
// vocabulary onto the frame format
// `{opcode, payload, listener?, origin?}`.

use serde::Serialize;
use serde_json::json;

use crate::domain::protocol::{Frame, OutboundEvent};

#[derive(Serialize)]
struct WireOrigin {
    id: String,
    user: String,
}

#[derive(Serialize)]
struct WireMessage {
    opcode: &'static str,
    payload: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    listener: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    origin: Option<WireOrigin>,
}

/// Builds a `{id, user, pubkey?}` payload, omitting `pubkey` entirely when
/// absent rather than sending an empty string (§9, Open Question 4).
fn peer_payload(id: String, user: String, pubkey: Option<String>) -> serde_json::Value {
    let mut obj = serde_json::Map::new();
    obj.insert("id".into(), json!(id));
    obj.insert("user".into(), json!(user));
    if let Some(pubkey) = pubkey {
        obj.insert("pubkey".into(), json!(pubkey));
    }
    serde_json::Value::Object(obj)
}

fn encode_event(event: OutboundEvent) -> (&'static str, serde_json::Value, Option<WireOrigin>) {
    match event {
        OutboundEvent::InitOk {
            user,
            id,
            game,
            developer,
        } => (
            "INIT_OK",
            json!({"user": user, "id": id, "game": game, "developer": developer}),
            None,
        ),
        OutboundEvent::Keepalive => ("KEEPALIVE", serde_json::Value::Null, None),
        OutboundEvent::AckHost => ("ACK_HOST", serde_json::Value::Null, None),
        OutboundEvent::AckPeer => ("ACK_PEER", serde_json::Value::Null, None),
        OutboundEvent::NewHost {
            id,
            user,
            lobby_id,
            pubkey,
        } => {
            let mut payload = peer_payload(id, user, pubkey);
            payload
                .as_object_mut()
                .expect("peer_payload always returns an object")
                .insert("lobby_id".into(), json!(lobby_id));
            ("NEW_HOST", payload, None)
        }
        OutboundEvent::NewPeer { id, user, pubkey } => {
            ("NEW_PEER", peer_payload(id, user, pubkey), None)
        }
        OutboundEvent::Anticipate { id, user, pubkey } => {
            ("ANTICIPATE", peer_payload(id, user, pubkey), None)
        }
        OutboundEvent::Discover { id, user, pubkey } => {
            ("DISCOVER", peer_payload(id, user, pubkey), None)
        }
        OutboundEvent::Relay {
            opcode,
            payload,
            origin_id,
            origin_user,
        } => (
            opcode,
            payload,
            Some(WireOrigin {
                id: origin_id,
                user: origin_user,
            }),
        ),
        OutboundEvent::RelayOk => ("RELAY_OK", serde_json::Value::Null, None),
        OutboundEvent::LobbyList(ids) => ("LOBBY_LIST", json!(ids), None),
        OutboundEvent::LobbyInfo {
            host_id,
            host_username,
            current_peers,
            max_peers,
        } => (
            "LOBBY_INFO",
            json!({
                "lobby_host_id": host_id,
                "lobby_host_username": host_username,
                "current_peers": current_peers,
                "max_peers": max_peers,
            }),
            None,
        ),
        // Bare-string payloads, matching the source's single-extra-arg
        // `SendCodeWithMessage(conn, message, opcode)` convention.
        OutboundEvent::LobbyClose { lobby_id } => ("LOBBY_CLOSE", json!(lobby_id), None),
        OutboundEvent::PeerGone { ulid } => ("PEER_GONE", json!(ulid), None),
        OutboundEvent::Error(error) => {
            let payload = match error.message() {
                Some(message) => json!(message),
                None => serde_json::Value::Null,
            };
            (error.opcode(), payload, None)
        }
    }
}

/// True if this frame's event, per §4.4/§7, closes the connection once
/// flushed.
pub fn closes_connection(frame: &Frame) -> bool {
    matches!(&frame.event, OutboundEvent::Error(e) if e.closes_connection())
}

/// Serializes one outbound frame to its wire JSON text.
pub fn encode(frame: Frame) -> String {
    let listener = frame.listener;
    let (opcode, payload, origin) = encode_event(frame.event);
    let message = WireMessage {
        opcode,
        payload,
        listener,
        origin,
    };
    serde_json::to_string(&message).unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to serialize outbound frame");
        "{\"opcode\":\"VIOLATION\"}".to_string()
    })
}
