// CONFIG_PEER opcode handler (§4.1).

use serde::Deserialize;

use crate::domain::client::{ClientHandle, Role};
use crate::domain::errors::OpcodeError;
use crate::domain::protocol::{Delivery, OutboundEvent};
use crate::use_cases::password::verify_password;
use crate::use_cases::{error_reply, Engine};

#[derive(Debug, Deserialize)]
struct ConfigPeerPayload {
    lobby_id: String,
    #[serde(default)]
    password: String,
    #[serde(default)]
    pubkey: Option<String>,
}

pub async fn handle_config_peer(
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

    let payload: ConfigPeerPayload = match serde_json::from_value(payload) {
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

    let Some(lobby) = engine.lobby_store.get(&record.ugi, &payload.lobby_id).await else {
        return vec![error_reply(handle, OpcodeError::LobbyNotfound, listener)];
    };

    let existing_peers = engine.registry.peers_in(&record.ugi, &payload.lobby_id).await;
    if lobby.maximum_peers != 0 && existing_peers.len() as u32 >= lobby.maximum_peers {
        return vec![error_reply(handle, OpcodeError::LobbyFull, listener)];
    }

    if lobby.locked {
        return vec![error_reply(handle, OpcodeError::LobbyLocked, listener)];
    }

    if let Some(hash) = &lobby.password_hash {
        if !verify_password(&payload.password, hash) {
            return vec![error_reply(handle, OpcodeError::PasswordFail, listener)];
        }
    }

    engine
        .registry
        .set_peer(handle, &record.ugi, &payload.lobby_id, payload.pubkey.clone())
        .await;

    let ulid = record.ulid.clone().unwrap_or_default();
    let username = record.username.clone().unwrap_or_default();

    let mut deliveries = vec![
        // Peer sees the host first...
        Delivery::unsolicited(
            handle,
            OutboundEvent::Anticipate {
                id: lobby.current_owner_ulid.clone(),
                user: lobby.current_owner_username.clone(),
                pubkey: lobby.current_owner_pubkey.clone(),
            },
        ),
        // ...then its own ack, carrying the request's listener...
        Delivery::reply(handle, OutboundEvent::AckPeer, listener),
    ];

    // ...then one DISCOVER per peer already present.
    for peer in &existing_peers {
        deliveries.push(Delivery::unsolicited(
            handle,
            OutboundEvent::Discover {
                id: peer.ulid.clone().unwrap_or_default(),
                user: peer.username.clone().unwrap_or_default(),
                pubkey: peer.public_key.clone(),
            },
        ));
    }

    // Host is told a peer joined.
    deliveries.push(Delivery::unsolicited(
        lobby.current_owner_handle,
        OutboundEvent::NewPeer {
            id: ulid.clone(),
            user: username.clone(),
            pubkey: payload.pubkey.clone(),
        },
    ));

    // Existing peers are told to anticipate the joiner.
    for peer in &existing_peers {
        deliveries.push(Delivery::unsolicited(
            peer.handle,
            OutboundEvent::Anticipate {
                id: ulid.clone(),
                user: username.clone(),
                pubkey: payload.pubkey.clone(),
            },
        ));
    }

    deliveries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::client::ClientRecord;
    use crate::domain::ports::{VerifiedSession, VerifyError};
    use crate::use_cases::password::hash_password;
    use crate::use_cases::{ClientRegistry, LobbyStore};
    use std::sync::Arc;

    struct Stub;
    #[async_trait::async_trait]
    impl crate::domain::ports::SessionVerifier for Stub {
        async fn verify(&self, _token: &str) -> Result<VerifiedSession, VerifyError> {
            Err(VerifyError::NotFound)
        }
    }

    async fn engine_with_lobby(max_peers: u32, password_hash: Option<String>) -> Engine {
        let registry = Arc::new(ClientRegistry::new());
        let lobby_store = LobbyStore::new();
        let (host_tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        let host = ClientRecord::new(1, "ugi-a".into(), "Game".into(), "Dev".into(), "example.test".into());
        registry.add(host, host_tx).await;
        registry
            .mark_authenticated(1, "01H0000000000000000000HST0".into(), "host".into(), "".into(), 0)
            .await;
        registry.set_host(1, "ugi-a", "L1", None).await;
        lobby_store
            .create(
                "ugi-a",
                "L1",
                max_peers,
                false,
                false,
                1,
                "01H0000000000000000000HST0".into(),
                "host".into(),
                None,
                password_hash,
            )
            .await
            .expect("create succeeds");

        let (joiner_tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        let joiner = ClientRecord::new(2, "ugi-a".into(), "Game".into(), "Dev".into(), "example.test".into());
        registry.add(joiner, joiner_tx).await;
        registry
            .mark_authenticated(2, "01H0000000000000000000JNR0".into(), "joiner".into(), "".into(), 0)
            .await;

        Engine {
            registry,
            lobby_store: Arc::new(lobby_store),
            session_verifier: Arc::new(Stub),
            authless: false,
        }
    }

    #[tokio::test]
    async fn when_lobby_missing_then_lobby_notfound() {
        let engine = engine_with_lobby(4, None).await;
        let deliveries = handle_config_peer(&engine, 2, serde_json::json!({"lobby_id": "NOPE"}), None).await;
        match &deliveries[0].frame.event {
            OutboundEvent::Error(e) => assert_eq!(e.opcode(), "LOBBY_NOTFOUND"),
            other => panic!("expected LOBBY_NOTFOUND, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn when_at_capacity_then_lobby_full() {
        let engine = engine_with_lobby(1, None).await;
        let first = handle_config_peer(&engine, 2, serde_json::json!({"lobby_id": "L1"}), None).await;
        assert!(matches!(first[1].frame.event, OutboundEvent::AckPeer));

        let (joiner_tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        let joiner = ClientRecord::new(3, "ugi-a".into(), "Game".into(), "Dev".into(), "example.test".into());
        engine.registry.add(joiner, joiner_tx).await;
        engine
            .registry
            .mark_authenticated(3, "01H0000000000000000000JN1".into(), "joiner2".into(), "".into(), 0)
            .await;

        let deliveries = handle_config_peer(&engine, 3, serde_json::json!({"lobby_id": "L1"}), None).await;
        match &deliveries[0].frame.event {
            OutboundEvent::Error(e) => assert_eq!(e.opcode(), "LOBBY_FULL"),
            other => panic!("expected LOBBY_FULL, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn when_capacity_unlimited_then_first_peer_joins() {
        let engine = engine_with_lobby(0, None).await;
        let deliveries = handle_config_peer(&engine, 2, serde_json::json!({"lobby_id": "L1"}), None).await;
        assert!(matches!(deliveries[1].frame.event, OutboundEvent::AckPeer));
    }

    #[tokio::test]
    async fn when_password_wrong_then_password_fail() {
        let hash = hash_password("correct").expect("hash");
        let engine = engine_with_lobby(4, Some(hash)).await;
        let deliveries = handle_config_peer(
            &engine,
            2,
            serde_json::json!({"lobby_id": "L1", "password": "wrong"}),
            None,
        )
        .await;
        match &deliveries[0].frame.event {
            OutboundEvent::Error(e) => assert_eq!(e.opcode(), "PASSWORD_FAIL"),
            other => panic!("expected PASSWORD_FAIL, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn when_successful_then_anticipate_then_ack_peer_then_new_peer_to_host() {
        let engine = engine_with_lobby(4, None).await;
        let deliveries = handle_config_peer(&engine, 2, serde_json::json!({"lobby_id": "L1"}), None).await;

        assert_eq!(deliveries.len(), 3);
        assert_eq!(deliveries[0].target, 2);
        assert!(matches!(deliveries[0].frame.event, OutboundEvent::Anticipate { .. }));
        assert_eq!(deliveries[1].target, 2);
        assert!(matches!(deliveries[1].frame.event, OutboundEvent::AckPeer));
        assert_eq!(deliveries[2].target, 1);
        assert!(matches!(deliveries[2].frame.event, OutboundEvent::NewPeer { .. }));
    }
}
