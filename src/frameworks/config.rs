use std::{env, net::SocketAddr, time::Duration};

// Runtime/server configuration (§6 of the design notes), not protocol
// tuning — opcode/validation constants live beside the code that uses them.

pub fn bind_addr() -> SocketAddr {
    env::var("BIND_ADDR")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 3000)))
}

pub fn session_verifier_url() -> String {
    env::var("SESSION_VERIFIER_URL").unwrap_or_else(|_| "http://localhost:3002".to_string())
}

pub fn ugi_resolver_url() -> String {
    env::var("UGI_RESOLVER_URL").unwrap_or_else(|_| "http://localhost:3002".to_string())
}

/// Authless mode (§6): bypasses the Session Verifier entirely and accepts
/// any well-formed ULID token.
pub fn authless_mode() -> bool {
    matches!(
        env::var("AUTHLESS_MODE").as_deref(),
        Ok("1") | Ok("true") | Ok("TRUE")
    )
}

pub fn external_service_timeout() -> Duration {
    let millis = env::var("EXTERNAL_SERVICE_TIMEOUT_MS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(3000);
    Duration::from_millis(millis)
}
