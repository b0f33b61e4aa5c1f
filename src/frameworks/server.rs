// Framework bootstrap: tracing/env init, listener bind, router assembly.

use std::io::Result;
use std::sync::Arc;

use axum::routing::get;
use axum::Router;

use crate::frameworks::config;
use crate::interface_adapters::clients::session_verifier::{AuthlessSessionVerifier, HttpSessionVerifier};
use crate::interface_adapters::clients::ugi_resolver::HttpUgiResolver;
use crate::interface_adapters::net::ws_handler;
use crate::interface_adapters::state::AppState;
use crate::use_cases::{ClientRegistry, Engine, LobbyStore};

fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

/// Serves the signaling endpoint on an already-bound listener, against a
/// caller-supplied `AppState`. Kept separate from state construction so
/// integration tests can inject fake Session Verifier / UGI Resolver
/// adapters instead of HTTP-backed ones.
pub async fn run(listener: tokio::net::TcpListener, state: Arc<AppState>) -> Result<()> {
    let address = listener.local_addr()?;
    let app = Router::new().route("/ws", get(ws_handler)).with_state(state);

    tracing::info!(%address, "listening");

    axum::serve(listener, app).await.inspect_err(|e| {
        tracing::error!(error = %e, "server error");
    })
}

pub async fn run_with_config() -> Result<()> {
    init_runtime();

    let address = config::bind_addr();
    let listener = tokio::net::TcpListener::bind(address).await.inspect_err(|e| {
        tracing::error!(%address, error = %e, "failed to bind");
    })?;

    let state = build_state().await?;
    run(listener, state).await
}

async fn build_state() -> Result<Arc<AppState>> {
    let registry = Arc::new(ClientRegistry::new());
    let lobby_store = Arc::new(LobbyStore::new());
    let timeout = config::external_service_timeout();
    let authless = config::authless_mode();

    let session_verifier: Arc<dyn crate::domain::ports::SessionVerifier> = if authless {
        tracing::warn!("authless mode enabled: Session Verifier is bypassed");
        Arc::new(AuthlessSessionVerifier)
    } else {
        let url = config::session_verifier_url();
        let client = HttpSessionVerifier::new(url.clone(), timeout)
            .map_err(|e| std::io::Error::other(format!("failed to initialize session verifier client: {e}")))?;
        tracing::debug!(session_verifier_url = %url, "session verifier configured");
        Arc::new(client)
    };

    let ugi_resolver_url = config::ugi_resolver_url();
    let ugi_resolver = Arc::new(
        HttpUgiResolver::new(ugi_resolver_url.clone(), timeout)
            .map_err(|e| std::io::Error::other(format!("failed to initialize ugi resolver client: {e}")))?,
    );
    tracing::debug!(ugi_resolver_url = %ugi_resolver_url, "ugi resolver configured");

    let engine = Arc::new(Engine {
        registry,
        lobby_store,
        session_verifier,
        authless,
    });

    Ok(Arc::new(AppState::new(engine, ugi_resolver)))
}
