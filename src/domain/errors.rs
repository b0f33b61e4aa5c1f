/// Precondition, identity, and structural failures from §7. Each variant
/// corresponds to exactly one reply opcode from the spec's opcode table.
/// `Violation` and `AccountInactive` close the connection after the reply
/// is flushed; everything else leaves the connection open so the client
/// may retry.
#[derive(Debug, Clone)]
pub enum OpcodeError {
    SessionExists,
    TokenInvalid(String),
    TokenOriginMismatch,
    TokenExpired,
    AccountInactive(String),
    ConfigRequired,
    AlreadyHost,
    AlreadyPeer,
    LobbyNotfound,
    LobbyExists,
    LobbyFull,
    LobbyLocked,
    PasswordFail,
    PeerInvalid,
    /// Field-level validation failure (e.g. a malformed `recipient`);
    /// non-fatal, replied as `WARNING`.
    Warning(String),
    /// Malformed frame or payload-shape validation failure; closes the
    /// connection after the reply is flushed, per the Go reference's
    /// zero-extra-args `SendCodeWithMessage` path.
    Violation(String),
}

impl OpcodeError {
    /// Wire opcode this error is reported under.
    pub fn opcode(&self) -> &'static str {
        match self {
            OpcodeError::SessionExists => "SESSION_EXISTS",
            OpcodeError::TokenInvalid(_) => "TOKEN_INVALID",
            OpcodeError::TokenOriginMismatch => "TOKEN_ORIGIN_MISMATCH",
            OpcodeError::TokenExpired => "TOKEN_EXPIRED",
            OpcodeError::AccountInactive(_) => "VIOLATION",
            OpcodeError::ConfigRequired => "CONFIG_REQUIRED",
            OpcodeError::AlreadyHost => "ALREADY_HOST",
            OpcodeError::AlreadyPeer => "ALREADY_PEER",
            OpcodeError::LobbyNotfound => "LOBBY_NOTFOUND",
            OpcodeError::LobbyExists => "LOBBY_EXISTS",
            OpcodeError::LobbyFull => "LOBBY_FULL",
            OpcodeError::LobbyLocked => "LOBBY_LOCKED",
            OpcodeError::PasswordFail => "PASSWORD_FAIL",
            OpcodeError::PeerInvalid => "PEER_INVALID",
            OpcodeError::Warning(_) => "WARNING",
            OpcodeError::Violation(_) => "VIOLATION",
        }
    }

    /// True if the connection should close once this reply is flushed.
    pub fn closes_connection(&self) -> bool {
        matches!(self, OpcodeError::AccountInactive(_) | OpcodeError::Violation(_))
    }

    /// Optional human-readable message carried in the reply payload.
    pub fn message(&self) -> Option<&str> {
        match self {
            OpcodeError::TokenInvalid(msg)
            | OpcodeError::AccountInactive(msg)
            | OpcodeError::Warning(msg)
            | OpcodeError::Violation(msg) => Some(msg.as_str()),
            _ => None,
        }
    }
}
