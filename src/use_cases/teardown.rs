// Teardown Coordinator (§4.2): runs exactly once per connection, when its
// read loop ends for any reason (clean close, error, timeout).

use crate::domain::client::{ClientHandle, Role};
use crate::domain::protocol::{Delivery, OutboundEvent};
use crate::use_cases::Engine;

pub async fn handle_disconnect(engine: &Engine, handle: ClientHandle) -> Vec<Delivery> {
    let Some(record) = engine.registry.remove(handle).await else {
        return Vec::new();
    };

    match record.role {
        Role::Unconfigured => Vec::new(),

        // Host-gone always fully closes the lobby (Open Question 1):
        // `allow_host_reclaim` governs CLAIM_HOST, which is not yet wired
        // up (§9, Open Question 2), so it has no bearing here.
        Role::Host => {
            let Some(lobby_id) = record.lobby else {
                return Vec::new();
            };
            let peers = engine.registry.peers_in(&record.ugi, &lobby_id).await;
            let unconfigured = engine.registry.unassigned_in(&record.ugi).await;
            let mut deliveries = Vec::with_capacity(peers.len() + unconfigured.len());
            for peer in &peers {
                deliveries.push(Delivery::unsolicited(
                    peer.handle,
                    OutboundEvent::LobbyClose {
                        lobby_id: lobby_id.clone(),
                    },
                ));
                engine
                    .registry
                    .demote_peer(peer.handle, &record.ugi, &lobby_id)
                    .await;
            }
            for client in &unconfigured {
                deliveries.push(Delivery::unsolicited(
                    client.handle,
                    OutboundEvent::LobbyClose {
                        lobby_id: lobby_id.clone(),
                    },
                ));
            }
            engine.lobby_store.delete(&record.ugi, &lobby_id).await;
            deliveries
        }

        Role::Peer => {
            let Some(lobby_id) = record.lobby else {
                return Vec::new();
            };
            let hosts = engine.registry.hosts_in(&record.ugi, &lobby_id).await;
            let mut deliveries = Vec::new();
            if let Some(host) = hosts.first() {
                deliveries.push(Delivery::unsolicited(
                    host.handle,
                    OutboundEvent::PeerGone {
                        ulid: record.ulid.unwrap_or_default(),
                    },
                ));
            } else {
                let peers_left = engine.registry.peers_in(&record.ugi, &lobby_id).await;
                if peers_left.is_empty() {
                    engine.lobby_store.delete(&record.ugi, &lobby_id).await;
                }
            }
            deliveries
        }
    }
}
