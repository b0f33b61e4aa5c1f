use async_trait::async_trait;

/// Identity and session metadata returned by a successful token verification.
#[derive(Debug, Clone)]
pub struct VerifiedSession {
    pub ulid: String,
    pub username: String,
    pub origin: String,
    pub expiry_unix: u64,
    /// "account active" bit from `user_state_bits`; required outside authless mode.
    pub account_active: bool,
}

/// Failure modes of the external Session Verifier contract (§6).
#[derive(Debug, Clone)]
pub enum VerifyError {
    NotFound,
    Other(String),
}

/// Port for the external session-token service. The core treats this as a
/// pure, read-only query: `verify(token) -> identity | NotFound | Other`.
#[async_trait]
pub trait SessionVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<VerifiedSession, VerifyError>;
}

/// Game/developer names resolved for a UGI.
#[derive(Debug, Clone)]
pub struct ResolvedUgi {
    pub game_name: String,
    pub developer_name: String,
}

/// Port for the external game-identity lookup: `resolve(ugi) -> {game_name, developer_name} | NotFound`.
#[async_trait]
pub trait UgiResolver: Send + Sync {
    async fn resolve(&self, ugi: &str) -> Option<ResolvedUgi>;
}
