// Shared primitives for one-time server bootstrapping across integration tests.
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use signaling_core::domain::client::unix_now;
use signaling_core::domain::ports::{ResolvedUgi, SessionVerifier, UgiResolver, VerifiedSession, VerifyError};
use signaling_core::interface_adapters::clients::ugi_resolver::InMemoryUgiResolver;
use signaling_core::interface_adapters::state::AppState;
use signaling_core::use_cases::{ClientRegistry, Engine, LobbyStore};

pub const TEST_UGI: &str = "01H0000000000000000000TEST";

static SERVER_URL: OnceLock<String> = OnceLock::new();
static SERVER_READY: OnceLock<()> = OnceLock::new();

/// A fixed-roster Session Verifier: tests register tokens up front, then the
/// server exercises the same verification path it does in production.
#[derive(Default)]
pub struct FakeSessionVerifier {
    sessions: tokio::sync::RwLock<std::collections::HashMap<String, VerifiedSession>>,
}

impl FakeSessionVerifier {
    pub async fn register(&self, token: &str, ulid: &str, username: &str, origin: &str) {
        self.sessions.write().await.insert(
            token.to_string(),
            VerifiedSession {
                ulid: ulid.to_string(),
                username: username.to_string(),
                origin: origin.to_string(),
                expiry_unix: unix_now() + 3600,
                account_active: true,
            },
        );
    }
}

#[async_trait::async_trait]
impl SessionVerifier for FakeSessionVerifier {
    async fn verify(&self, token: &str) -> Result<VerifiedSession, VerifyError> {
        self.sessions
            .read()
            .await
            .get(token)
            .cloned()
            .ok_or(VerifyError::NotFound)
    }
}

/// Ensures the test server is running, returns its ws:// base URL, and
/// returns a handle to the fake Session Verifier so tests can register
/// tokens before connecting.
pub fn ensure_server() -> (&'static str, Arc<FakeSessionVerifier>) {
    static VERIFIER: OnceLock<Arc<FakeSessionVerifier>> = OnceLock::new();
    let verifier = VERIFIER
        .get_or_init(|| Arc::new(FakeSessionVerifier::default()))
        .clone();

    SERVER_READY.get_or_init(|| {
        let published_url = Arc::new(OnceLock::<String>::new());
        let published_url_thread = Arc::clone(&published_url);
        let verifier = verifier.clone();

        std::thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().expect("test runtime");
            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                    .await
                    .expect("bind ephemeral test port");
                let addr = listener.local_addr().expect("get local addr");
                let _ = published_url_thread.set(format!("ws://{}", addr));

                let ugi_resolver = Arc::new(InMemoryUgiResolver::new());
                ugi_resolver.register(TEST_UGI, "Test Game", "Test Studio").await;

                let engine = Arc::new(Engine {
                    registry: Arc::new(ClientRegistry::new()),
                    lobby_store: Arc::new(LobbyStore::new()),
                    session_verifier: verifier as Arc<dyn SessionVerifier>,
                    authless: false,
                });
                let state = Arc::new(AppState::new(engine, ugi_resolver as Arc<dyn UgiResolver>));

                signaling_core::run(listener, state).await.expect("server failed");
            });
        });

        wait_for_server_url_and_readiness(published_url);
    });

    (SERVER_URL.get().expect("server url initialized").as_str(), verifier)
}

fn wait_for_server_url_and_readiness(published_url: Arc<OnceLock<String>>) {
    let base_url = loop {
        if let Some(url) = published_url.get() {
            break url.clone();
        }
        std::thread::sleep(Duration::from_millis(10));
    };

    let _ = SERVER_URL.set(base_url.clone());

    let addr = base_url
        .strip_prefix("ws://")
        .expect("base url should use ws://");

    for _ in 0..100 {
        if std::net::TcpStream::connect(addr).is_ok() {
            return;
        }
        std::thread::sleep(Duration::from_millis(20));
    }

    panic!("server did not become ready in time");
}

/// Dummy `ResolvedUgi` constructor used by tests that assert on game/dev
/// names without wiring a full resolver registration.
#[allow(dead_code)]
pub fn resolved_ugi(game_name: &str, developer_name: &str) -> ResolvedUgi {
    ResolvedUgi {
        game_name: game_name.to_string(),
        developer_name: developer_name.to_string(),
    }
}

use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message as TMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

pub type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Opens a signaling connection for the given `ugi` against the test server.
pub async fn connect(server_url: &str, ugi: &str) -> WsStream {
    let url = format!("{server_url}/ws?ugi={ugi}");
    let (stream, _response) = connect_async(url).await.expect("ws connect");
    stream
}

/// Sends one JSON frame `{opcode, payload, recipient?, listener?}`.
pub async fn send(ws: &mut WsStream, opcode: &str, payload: serde_json::Value, recipient: Option<&str>, listener: Option<&str>) {
    let mut frame = serde_json::json!({ "opcode": opcode, "payload": payload });
    if let Some(recipient) = recipient {
        frame["recipient"] = serde_json::Value::String(recipient.to_string());
    }
    if let Some(listener) = listener {
        frame["listener"] = serde_json::Value::String(listener.to_string());
    }
    ws.send(TMessage::Text(frame.to_string().into()))
        .await
        .expect("send frame");
}

/// Reads and JSON-decodes the next text frame from the connection.
pub async fn recv(ws: &mut WsStream) -> serde_json::Value {
    loop {
        match ws.next().await.expect("stream closed unexpectedly").expect("ws error") {
            TMessage::Text(text) => return serde_json::from_str(&text).expect("valid json frame"),
            TMessage::Ping(_) | TMessage::Pong(_) => continue,
            other => panic!("unexpected message: {other:?}"),
        }
    }
}
