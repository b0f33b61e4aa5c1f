use crate::domain::client::ClientHandle;
use crate::domain::errors::OpcodeError;

/// Wire-level inbound frame: `{opcode, payload, recipient?, listener?}`.
/// A client-supplied `origin` field is ignored per §6 ("origin is
/// server-originated only").
#[derive(Debug, Clone, serde::Deserialize)]
pub struct RawRequest {
    pub opcode: String,
    #[serde(default)]
    pub payload: serde_json::Value,
    #[serde(default)]
    pub recipient: Option<String>,
    #[serde(default)]
    pub listener: Option<String>,
}

/// Semantic reply/broadcast events produced by Protocol Engine handlers.
/// Wire serialization (opcode string, payload JSON, `origin`/`listener`
/// framing) is owned by `interface_adapters::protocol`.
#[derive(Debug, Clone)]
pub enum OutboundEvent {
    InitOk {
        user: String,
        id: String,
        game: String,
        developer: String,
    },
    Keepalive,
    AckHost,
    AckPeer,
    NewHost {
        id: String,
        user: String,
        lobby_id: String,
        pubkey: Option<String>,
    },
    NewPeer {
        id: String,
        user: String,
        pubkey: Option<String>,
    },
    Anticipate {
        id: String,
        user: String,
        pubkey: Option<String>,
    },
    Discover {
        id: String,
        user: String,
        pubkey: Option<String>,
    },
    Relay {
        opcode: &'static str,
        payload: serde_json::Value,
        origin_id: String,
        origin_user: String,
    },
    RelayOk,
    LobbyList(Vec<String>),
    LobbyInfo {
        host_id: String,
        host_username: String,
        current_peers: u32,
        max_peers: u32,
    },
    LobbyClose {
        lobby_id: String,
    },
    PeerGone {
        ulid: String,
    },
    Error(OpcodeError),
}

/// A single queued outbound frame. `listener` carries the request
/// correlation token back only on direct replies; server-initiated frames
/// (broadcasts, relays' origin-tagged deliveries, teardown notices) carry
/// none, per §7.
#[derive(Debug, Clone)]
pub struct Frame {
    pub event: OutboundEvent,
    pub listener: Option<String>,
}

impl Frame {
    pub fn reply(event: OutboundEvent, listener: Option<String>) -> Self {
        Self { event, listener }
    }

    pub fn unsolicited(event: OutboundEvent) -> Self {
        Self {
            event,
            listener: None,
        }
    }
}

/// One outbound delivery: which connection receives it, and what frame.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub target: ClientHandle,
    pub frame: Frame,
}

impl Delivery {
    pub fn reply(target: ClientHandle, event: OutboundEvent, listener: Option<String>) -> Self {
        Self {
            target,
            frame: Frame::reply(event, listener),
        }
    }

    pub fn unsolicited(target: ClientHandle, event: OutboundEvent) -> Self {
        Self {
            target,
            frame: Frame::unsolicited(event),
        }
    }
}
