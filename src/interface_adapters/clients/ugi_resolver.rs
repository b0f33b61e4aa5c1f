// HTTP adapter for the external UGI Resolver contract (§6).

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tokio::sync::RwLock;

use crate::domain::ports::{ResolvedUgi, UgiResolver};

#[derive(Debug, Deserialize)]
struct ResolveResponse {
    game_name: String,
    developer_name: String,
}

#[derive(Clone)]
pub struct HttpUgiResolver {
    http: reqwest::Client,
    base_url: String,
}

impl HttpUgiResolver {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl UgiResolver for HttpUgiResolver {
    async fn resolve(&self, ugi: &str) -> Option<ResolvedUgi> {
        let url = format!("{}/games/{}", self.base_url, ugi);
        let response = match self.http.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, ugi, "ugi resolver request failed");
                return None;
            }
        };

        if response.status() == StatusCode::NOT_FOUND {
            return None;
        }
        if !response.status().is_success() {
            tracing::warn!(status = %response.status(), ugi, "ugi resolver returned an error status");
            return None;
        }

        match response.json::<ResolveResponse>().await {
            Ok(body) => Some(ResolvedUgi {
                game_name: body.game_name,
                developer_name: body.developer_name,
            }),
            Err(e) => {
                tracing::warn!(error = %e, ugi, "ugi resolver returned an unparseable body");
                None
            }
        }
    }
}

/// Fixed-registration resolver for tests and the authless standalone mode:
/// games must be pre-registered via `register`, otherwise resolution fails
/// exactly as an unknown UGI would against the real store.
#[derive(Default)]
pub struct InMemoryUgiResolver {
    games: RwLock<HashMap<String, ResolvedUgi>>,
}

impl InMemoryUgiResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, ugi: impl Into<String>, game_name: impl Into<String>, developer_name: impl Into<String>) {
        self.games.write().await.insert(
            ugi.into(),
            ResolvedUgi {
                game_name: game_name.into(),
                developer_name: developer_name.into(),
            },
        );
    }
}

#[async_trait]
impl UgiResolver for InMemoryUgiResolver {
    async fn resolve(&self, ugi: &str) -> Option<ResolvedUgi> {
        self.games.read().await.get(ugi).cloned()
    }
}
