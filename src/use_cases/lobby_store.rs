// Lobby Store: per-(ugi, lobby-name) configuration records (§3, §4.3).

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::domain::client::ClientHandle;
use crate::domain::lobby::LobbyRecord;

#[derive(Default)]
pub struct LobbyStore {
    lobbies: RwLock<HashMap<(String, String), LobbyRecord>>,
}

#[derive(Debug)]
pub struct LobbyExists;

impl LobbyStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        &self,
        ugi: &str,
        lobby_id: &str,
        maximum_peers: u32,
        allow_host_reclaim: bool,
        allow_peers_to_reclaim: bool,
        owner_handle: ClientHandle,
        owner_ulid: String,
        owner_username: String,
        owner_pubkey: Option<String>,
        password_hash: Option<String>,
    ) -> Result<LobbyRecord, LobbyExists> {
        let mut lobbies = self.lobbies.write().await;
        let key = (ugi.to_string(), lobby_id.to_string());
        if lobbies.contains_key(&key) {
            return Err(LobbyExists);
        }
        let record = LobbyRecord {
            id: lobby_id.to_string(),
            maximum_peers,
            allow_host_reclaim,
            allow_peers_to_reclaim,
            current_owner_handle: owner_handle,
            current_owner_ulid: owner_ulid,
            current_owner_username: owner_username,
            current_owner_pubkey: owner_pubkey,
            password_hash,
            locked: false,
        };
        lobbies.insert(key, record.clone());
        Ok(record)
    }

    pub async fn get(&self, ugi: &str, lobby_id: &str) -> Option<LobbyRecord> {
        let lobbies = self.lobbies.read().await;
        lobbies
            .get(&(ugi.to_string(), lobby_id.to_string()))
            .cloned()
    }

    /// Deletes the lobby record. Called by the Teardown Coordinator once
    /// the member count for (ugi, lobby) reaches zero.
    pub async fn delete(&self, ugi: &str, lobby_id: &str) {
        let mut lobbies = self.lobbies.write().await;
        lobbies.remove(&(ugi.to_string(), lobby_id.to_string()));
    }

    /// All lobby ids in `ugi` whose record is public (`password_hash` empty).
    /// Callers combine this with the Registry's member counts to implement
    /// `public_lobbies_of` exactly (a lobby with a record but zero members
    /// cannot exist per the Lobby invariant, so no extra filtering is
    /// needed here).
    pub async fn public_lobbies_of(&self, ugi: &str) -> Vec<String> {
        let lobbies = self.lobbies.read().await;
        lobbies
            .iter()
            .filter(|((u, _), record)| u == ugi && record.is_public())
            .map(|((_, lobby), _)| lobby.clone())
            .collect()
    }
}
