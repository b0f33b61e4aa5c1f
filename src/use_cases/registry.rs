// Client Registry: in-memory index of all connected clients (§4.3).

use std::collections::{HashMap, HashSet};

use tokio::sync::{mpsc, RwLock};
use tracing::error;

use crate::domain::client::{ClientHandle, ClientRecord, Role};
use crate::domain::protocol::{Delivery, Frame};

/// A connected client paired with the channel that serializes its outbound
/// frames (the Frame Transport "write lock", realized as a single-writer
/// channel rather than a mutex).
#[derive(Debug)]
pub struct RegisteredClient {
    pub record: ClientRecord,
    pub outbox: mpsc::UnboundedSender<Frame>,
}

#[derive(Default)]
struct RegistryInner {
    by_handle: HashMap<ClientHandle, RegisteredClient>,
    by_ulid: HashMap<String, ClientHandle>,
    ugi_members: HashMap<String, HashSet<ClientHandle>>,
    lobby_hosts: HashMap<(String, String), HashSet<ClientHandle>>,
    lobby_peers: HashMap<(String, String), HashSet<ClientHandle>>,
}

pub struct ClientRegistry {
    inner: RwLock<RegistryInner>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(RegistryInner::default()),
        }
    }

    /// Admits a client into the Registry at connection-upgrade time, in the
    /// `unconfigured` state, indexed by its (already resolved) `ugi`.
    pub async fn add(&self, record: ClientRecord, outbox: mpsc::UnboundedSender<Frame>) {
        let mut inner = self.inner.write().await;
        inner
            .ugi_members
            .entry(record.ugi.clone())
            .or_default()
            .insert(record.handle);
        inner
            .by_handle
            .insert(record.handle, RegisteredClient { record, outbox });
    }

    /// Marks a client authenticated: records identity and indexes by ulid.
    /// Returns `false` if the ulid is already in use by another connection.
    pub async fn mark_authenticated(
        &self,
        handle: ClientHandle,
        ulid: String,
        username: String,
        origin: String,
        expiry: u64,
    ) -> bool {
        let mut inner = self.inner.write().await;
        if inner.by_ulid.contains_key(&ulid) {
            return false;
        }
        let Some(client) = inner.by_handle.get_mut(&handle) else {
            return false;
        };
        client.record.ulid = Some(ulid.clone());
        client.record.username = Some(username);
        client.record.origin = Some(origin);
        client.record.expiry = Some(expiry);
        client.record.valid_session = true;
        inner.by_ulid.insert(ulid, handle);
        true
    }

    pub async fn set_host(&self, handle: ClientHandle, ugi: &str, lobby: &str, pubkey: Option<String>) {
        let mut inner = self.inner.write().await;
        if let Some(client) = inner.by_handle.get_mut(&handle) {
            client.record.role = Role::Host;
            client.record.lobby = Some(lobby.to_string());
            client.record.public_key = pubkey;
        }
        inner
            .lobby_hosts
            .entry((ugi.to_string(), lobby.to_string()))
            .or_default()
            .insert(handle);
    }

    pub async fn set_peer(&self, handle: ClientHandle, ugi: &str, lobby: &str, pubkey: Option<String>) {
        let mut inner = self.inner.write().await;
        if let Some(client) = inner.by_handle.get_mut(&handle) {
            client.record.role = Role::Peer;
            client.record.lobby = Some(lobby.to_string());
            client.record.public_key = pubkey;
        }
        inner
            .lobby_peers
            .entry((ugi.to_string(), lobby.to_string()))
            .or_default()
            .insert(handle);
    }

    /// Demotes a peer back to `unconfigured` and clears its lobby, used by
    /// the Teardown Coordinator's full-close path.
    pub async fn demote_peer(&self, handle: ClientHandle, ugi: &str, lobby: &str) {
        let mut inner = self.inner.write().await;
        if let Some(client) = inner.by_handle.get_mut(&handle) {
            client.record.role = Role::Unconfigured;
            client.record.lobby = None;
        }
        if let Some(set) = inner.lobby_peers.get_mut(&(ugi.to_string(), lobby.to_string())) {
            set.remove(&handle);
        }
    }

    /// Removes a client entirely (connection closed). Returns its last
    /// known record for the Teardown Coordinator to branch on.
    pub async fn remove(&self, handle: ClientHandle) -> Option<ClientRecord> {
        let mut inner = self.inner.write().await;
        let registered = inner.by_handle.remove(&handle)?;
        let record = registered.record;

        if let Some(set) = inner.ugi_members.get_mut(&record.ugi) {
            set.remove(&handle);
            if set.is_empty() {
                inner.ugi_members.remove(&record.ugi);
            }
        }
        if let Some(ulid) = &record.ulid {
            inner.by_ulid.remove(ulid);
        }
        if let Some(lobby) = &record.lobby {
            let key = (record.ugi.clone(), lobby.clone());
            match record.role {
                Role::Host => {
                    if let Some(set) = inner.lobby_hosts.get_mut(&key) {
                        set.remove(&handle);
                        if set.is_empty() {
                            inner.lobby_hosts.remove(&key);
                        }
                    }
                }
                Role::Peer => {
                    if let Some(set) = inner.lobby_peers.get_mut(&key) {
                        set.remove(&handle);
                        if set.is_empty() {
                            inner.lobby_peers.remove(&key);
                        }
                    }
                }
                Role::Unconfigured => {}
            }
        }

        Some(record)
    }

    pub async fn by_ulid(&self, ulid: &str) -> Option<ClientRecord> {
        let inner = self.inner.read().await;
        let handle = inner.by_ulid.get(ulid)?;
        inner.by_handle.get(handle).map(|c| c.record.clone())
    }

    pub async fn record_of(&self, handle: ClientHandle) -> Option<ClientRecord> {
        let inner = self.inner.read().await;
        inner.by_handle.get(&handle).map(|c| c.record.clone())
    }

    /// Returns the hosts of a (ugi, lobby). More than one entry is a fatal
    /// invariant violation (§4.3): it indicates a race in the admission
    /// path, and the process terminates loudly rather than limping on with
    /// inconsistent state.
    pub async fn hosts_in(&self, ugi: &str, lobby: &str) -> Vec<ClientRecord> {
        let inner = self.inner.read().await;
        let handles = inner
            .lobby_hosts
            .get(&(ugi.to_string(), lobby.to_string()))
            .cloned()
            .unwrap_or_default();
        let hosts: Vec<ClientRecord> = handles
            .into_iter()
            .filter_map(|h| inner.by_handle.get(&h).map(|c| c.record.clone()))
            .collect();
        if hosts.len() > 1 {
            error!(ugi, lobby, count = hosts.len(), "multiple hosts in one lobby: fatal invariant violation");
            std::process::abort();
        }
        hosts
    }

    pub async fn peers_in(&self, ugi: &str, lobby: &str) -> Vec<ClientRecord> {
        let inner = self.inner.read().await;
        inner
            .lobby_peers
            .get(&(ugi.to_string(), lobby.to_string()))
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .filter_map(|h| inner.by_handle.get(&h).map(|c| c.record.clone()))
            .collect()
    }

    pub async fn unassigned_in(&self, ugi: &str) -> Vec<ClientRecord> {
        let inner = self.inner.read().await;
        inner
            .ugi_members
            .get(ugi)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .filter_map(|h| inner.by_handle.get(&h).map(|c| c.record.clone()))
            .filter(|r| r.role == Role::Unconfigured)
            .collect()
    }

    pub async fn by_ulid_in_lobby(&self, ulid: &str, ugi: &str, lobby: &str) -> Option<ClientHandle> {
        let inner = self.inner.read().await;
        let handle = *inner.by_ulid.get(ulid)?;
        let client = inner.by_handle.get(&handle)?;
        if client.record.ugi == ugi && client.record.lobby.as_deref() == Some(lobby) {
            Some(handle)
        } else {
            None
        }
    }

    /// Delivers a frame to its target's outbox. A closed channel means the
    /// target already disconnected; this is a benign, logged-at-debug race.
    pub async fn deliver(&self, delivery: Delivery) {
        let inner = self.inner.read().await;
        if let Some(client) = inner.by_handle.get(&delivery.target) {
            if client.outbox.send(delivery.frame).is_err() {
                tracing::debug!(handle = delivery.target, "dropped delivery to disconnected client");
            }
        }
    }

    pub async fn deliver_all(&self, deliveries: Vec<Delivery>) {
        for delivery in deliveries {
            self.deliver(delivery).await;
        }
    }
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(handle: ClientHandle, ugi: &str) -> ClientRecord {
        ClientRecord::new(handle, ugi.to_string(), "Game".into(), "Dev".into(), "example.test".into())
    }

    #[tokio::test]
    async fn when_two_clients_share_ugi_then_unassigned_lists_both() {
        let registry = ClientRegistry::new();
        let (tx1, _rx1) = mpsc::unbounded_channel();
        let (tx2, _rx2) = mpsc::unbounded_channel();
        registry.add(record(1, "ugi-a"), tx1).await;
        registry.add(record(2, "ugi-a"), tx2).await;

        let unassigned = registry.unassigned_in("ugi-a").await;
        assert_eq!(unassigned.len(), 2);
    }

    #[tokio::test]
    async fn when_host_set_then_no_longer_unassigned() {
        let registry = ClientRegistry::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        registry.add(record(1, "ugi-a"), tx).await;
        registry.set_host(1, "ugi-a", "L1", None).await;

        assert!(registry.unassigned_in("ugi-a").await.is_empty());
        let hosts = registry.hosts_in("ugi-a", "L1").await;
        assert_eq!(hosts.len(), 1);
        assert_eq!(hosts[0].handle, 1);
    }

    #[tokio::test]
    async fn when_peer_demoted_then_removed_from_lobby_peers() {
        let registry = ClientRegistry::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        registry.add(record(1, "ugi-a"), tx).await;
        registry.set_peer(1, "ugi-a", "L1", None).await;
        assert_eq!(registry.peers_in("ugi-a", "L1").await.len(), 1);

        registry.demote_peer(1, "ugi-a", "L1").await;
        assert!(registry.peers_in("ugi-a", "L1").await.is_empty());
        let record = registry.record_of(1).await.expect("still registered");
        assert_eq!(record.role, Role::Unconfigured);
        assert!(record.lobby.is_none());
    }

    #[tokio::test]
    async fn when_client_removed_then_indices_are_cleared() {
        let registry = ClientRegistry::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        registry.add(record(1, "ugi-a"), tx).await;
        registry.mark_authenticated(1, "ulid-1".into(), "name".into(), "".into(), 0).await;
        registry.set_host(1, "ugi-a", "L1", None).await;

        let removed = registry.remove(1).await.expect("record returned");
        assert_eq!(removed.role, Role::Host);
        assert!(registry.by_ulid("ulid-1").await.is_none());
        assert!(registry.hosts_in("ugi-a", "L1").await.is_empty());
        assert!(registry.record_of(1).await.is_none());
    }

    #[tokio::test]
    async fn when_delivering_to_disconnected_client_then_no_panic() {
        let registry = ClientRegistry::new();
        let (tx, rx) = mpsc::unbounded_channel();
        registry.add(record(1, "ugi-a"), tx).await;
        drop(rx);

        registry
            .deliver(Delivery::unsolicited(1, crate::domain::protocol::OutboundEvent::AckHost))
            .await;
    }
}
