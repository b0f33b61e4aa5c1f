// INIT opcode handler (§4.1).

use crate::domain::client::{unix_now, ClientHandle};
use crate::domain::errors::OpcodeError;
use crate::domain::ports::VerifyError;
use crate::domain::protocol::{Delivery, OutboundEvent};
use crate::use_cases::ulid_check::is_valid_ulid;
use crate::use_cases::{error_reply, Engine};

pub async fn handle_init(
    engine: &Engine,
    handle: ClientHandle,
    payload: serde_json::Value,
    listener: Option<String>,
) -> Vec<Delivery> {
    let Some(record) = engine.registry.record_of(handle).await else {
        return Vec::new();
    };

    if record.valid_session {
        return vec![error_reply(handle, OpcodeError::SessionExists, listener)];
    }

    let token = match payload.as_str() {
        Some(token) if is_valid_ulid(token) => token.to_string(),
        _ => {
            return vec![error_reply(
                handle,
                OpcodeError::Violation("payload must be a ULID session token".into()),
                None,
            )]
        }
    };

    let verified = match engine.session_verifier.verify(&token).await {
        Ok(verified) => verified,
        Err(VerifyError::NotFound) => {
            return vec![error_reply(
                handle,
                OpcodeError::TokenInvalid("session token not found".into()),
                listener,
            )]
        }
        Err(VerifyError::Other(message)) => {
            return vec![error_reply(handle, OpcodeError::TokenInvalid(message), listener)]
        }
    };

    // Same user already connected, whether via this very connection or another.
    if engine.registry.by_ulid(&verified.ulid).await.is_some() {
        return vec![error_reply(handle, OpcodeError::SessionExists, listener)];
    }

    if !engine.authless {
        if verified.origin != record.connection_host {
            return vec![error_reply(handle, OpcodeError::TokenOriginMismatch, listener)];
        }
        if verified.expiry_unix < unix_now() {
            return vec![error_reply(handle, OpcodeError::TokenExpired, listener)];
        }
        if !verified.account_active {
            return vec![error_reply(
                handle,
                OpcodeError::AccountInactive(
                    "Your account has no verified email address. Please try again.".into(),
                ),
                None,
            )];
        }
    }

    let authenticated = engine
        .registry
        .mark_authenticated(
            handle,
            verified.ulid.clone(),
            verified.username.clone(),
            verified.origin.clone(),
            verified.expiry_unix,
        )
        .await;

    if !authenticated {
        // Lost a race against another connection completing INIT for the same ulid.
        return vec![error_reply(handle, OpcodeError::SessionExists, listener)];
    }

    vec![Delivery::reply(
        handle,
        OutboundEvent::InitOk {
            user: verified.username,
            id: verified.ulid,
            game: record.game_name,
            developer: record.developer_name,
        },
        listener,
    )]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::client::ClientRecord;
    use crate::domain::ports::VerifiedSession;
    use crate::use_cases::{ClientRegistry, LobbyStore};
    use std::sync::Arc;

    const TOKEN: &str = "01H0000000000000000000TKN0";

    struct FixedVerifier(VerifiedSession);

    #[async_trait::async_trait]
    impl crate::domain::ports::SessionVerifier for FixedVerifier {
        async fn verify(&self, _token: &str) -> Result<VerifiedSession, VerifyError> {
            Ok(self.0.clone())
        }
    }

    async fn engine_with(verified: VerifiedSession, authless: bool) -> (Engine, ClientHandle) {
        let registry = Arc::new(ClientRegistry::new());
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        let mut record = ClientRecord::new(1, "ugi-a".into(), "Game".into(), "Dev".into(), "example.test".into());
        record.connection_host = "example.test".into();
        registry.add(record, tx).await;
        let engine = Engine {
            registry,
            lobby_store: Arc::new(LobbyStore::new()),
            session_verifier: Arc::new(FixedVerifier(verified)),
            authless,
        };
        (engine, 1)
    }

    fn session(origin: &str, expiry_unix: u64, account_active: bool) -> VerifiedSession {
        VerifiedSession {
            ulid: "01H0000000000000000000VER0".into(),
            username: "verified".into(),
            origin: origin.into(),
            expiry_unix,
            account_active,
        }
    }

    #[tokio::test]
    async fn when_origin_mismatches_then_rejected() {
        let (engine, handle) = engine_with(session("other.test", unix_now() + 3600, true), false).await;
        let deliveries = handle_init(&engine, handle, serde_json::json!(TOKEN), None).await;
        match &deliveries[0].frame.event {
            OutboundEvent::Error(e) => assert_eq!(e.opcode(), "TOKEN_ORIGIN_MISMATCH"),
            other => panic!("expected TOKEN_ORIGIN_MISMATCH, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn when_token_expired_then_rejected() {
        let (engine, handle) = engine_with(session("example.test", 1, true), false).await;
        let deliveries = handle_init(&engine, handle, serde_json::json!(TOKEN), None).await;
        match &deliveries[0].frame.event {
            OutboundEvent::Error(e) => assert_eq!(e.opcode(), "TOKEN_EXPIRED"),
            other => panic!("expected TOKEN_EXPIRED, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn when_account_inactive_then_violation_closes() {
        let (engine, handle) = engine_with(session("example.test", unix_now() + 3600, false), false).await;
        let deliveries = handle_init(&engine, handle, serde_json::json!(TOKEN), None).await;
        match &deliveries[0].frame.event {
            OutboundEvent::Error(e) => {
                assert_eq!(e.opcode(), "VIOLATION");
                assert!(e.closes_connection());
            }
            other => panic!("expected VIOLATION, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn when_authless_then_origin_and_expiry_checks_skipped() {
        let (engine, handle) = engine_with(session("other.test", 1, false), true).await;
        let deliveries = handle_init(&engine, handle, serde_json::json!(TOKEN), None).await;
        assert!(matches!(deliveries[0].frame.event, OutboundEvent::InitOk { .. }));
    }

    #[tokio::test]
    async fn when_payload_not_a_valid_ulid_then_violation() {
        let (engine, handle) = engine_with(session("example.test", unix_now() + 3600, true), false).await;
        let deliveries = handle_init(&engine, handle, serde_json::json!("not-a-token"), None).await;
        match &deliveries[0].frame.event {
            OutboundEvent::Error(e) => assert_eq!(e.opcode(), "VIOLATION"),
            other => panic!("expected VIOLATION, got {other:?}"),
        }
    }
}
