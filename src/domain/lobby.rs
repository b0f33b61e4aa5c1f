use crate::domain::client::ClientHandle;

/// Per-(ugi, lobby-name) configuration record. Created by a successful
/// `CONFIG_HOST`, destroyed by the Teardown Coordinator once the last
/// member leaves.
#[derive(Debug, Clone)]
pub struct LobbyRecord {
    pub id: String,
    pub maximum_peers: u32,
    pub allow_host_reclaim: bool,
    pub allow_peers_to_reclaim: bool,
    pub current_owner_handle: ClientHandle,
    pub current_owner_ulid: String,
    pub current_owner_username: String,
    pub current_owner_pubkey: Option<String>,
    pub password_hash: Option<String>,
    pub locked: bool,
}

impl LobbyRecord {
    pub fn is_public(&self) -> bool {
        self.password_hash.is_none()
    }
}
