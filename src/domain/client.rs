use std::time::Duration;

/// Numeric identifier assigned to a connection on admission; unique for the
/// lifetime of the process.
pub type ClientHandle = u64;

/// A connection's role inside its lobby. Transitions are monotonic:
/// `Unconfigured -> Host` or `Unconfigured -> Peer`, never host<->peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Unconfigured,
    Host,
    Peer,
}

/// Connection-scoped record tracked by the Client Registry.
///
/// `ugi` is fixed for the life of the connection. `role`, `lobby`,
/// `valid_session`, and `public_key` are written only by the connection's
/// own task; other tasks may read but never write them.
#[derive(Debug, Clone)]
pub struct ClientRecord {
    pub handle: ClientHandle,
    pub ulid: Option<String>,
    pub username: Option<String>,
    pub ugi: String,
    pub game_name: String,
    pub developer_name: String,
    /// Hostname the client's upgrade request arrived on; compared against
    /// the Session Verifier's `origin` at INIT.
    pub connection_host: String,
    pub valid_session: bool,
    pub role: Role,
    pub lobby: Option<String>,
    pub public_key: Option<String>,
    pub origin: Option<String>,
    pub expiry: Option<u64>,
}

impl ClientRecord {
    pub fn new(
        handle: ClientHandle,
        ugi: String,
        game_name: String,
        developer_name: String,
        connection_host: String,
    ) -> Self {
        Self {
            handle,
            ulid: None,
            username: None,
            ugi,
            game_name,
            developer_name,
            connection_host,
            valid_session: false,
            role: Role::Unconfigured,
            lobby: None,
            public_key: None,
            origin: None,
            expiry: None,
        }
    }

    pub fn is_expired(&self, now_unix: u64) -> bool {
        self.expiry.is_some_and(|expiry| expiry < now_unix)
    }
}

/// Wall-clock source for expiry checks; kept as a seam so tests can use a
/// fixed clock instead of `SystemTime::now`.
pub fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::SystemTime::UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_secs()
}
