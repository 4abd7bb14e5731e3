//! Session registry for the two player slots.
//!
//! This module tracks which connections are currently admitted to the match:
//! - Slot assignment on admission (lowest free slot first, reject when full)
//! - Slot lookup by session for input routing
//! - Per-session outbound queues for broadcasting
//! - Idempotent removal from any task that notices a dead connection
//!
//! Removing a [`Client`] drops its outbound queue sender and its stop
//! signal, which ends the session's reader and writer tasks straight away.

use crate::game::Slot;
use log::info;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// Server-assigned identity of one admitted connection. Never reused.
pub type SessionId = u32;

/// An admitted connection and its player slot.
#[derive(Debug)]
pub struct Client {
    /// Unique session identifier assigned by the server
    pub id: SessionId,
    /// Peer address, for logging
    pub addr: SocketAddr,
    /// Paddle this session controls
    pub slot: Slot,
    /// Encoded state lines waiting to be written to the peer
    outbound: mpsc::Sender<Arc<str>>,
    /// Dropped together with the client to stop its reader and writer
    _stop: watch::Sender<()>,
}

impl Client {
    pub fn new(
        id: SessionId,
        addr: SocketAddr,
        slot: Slot,
        outbound: mpsc::Sender<Arc<str>>,
        stop: watch::Sender<()>,
    ) -> Self {
        Self {
            id,
            addr,
            slot,
            outbound,
            _stop: stop,
        }
    }
}

/// Maps live sessions to player slots.
///
/// At most [`PLAYER_SLOTS`](crate::game::PLAYER_SLOTS) sessions are
/// registered at any time. A slot freed by a disconnect goes to the next
/// admitted connection.
pub struct ClientManager {
    /// Admitted clients indexed by their session ID
    clients: HashMap<SessionId, Client>,
    /// Next session ID to hand out
    next_client_id: SessionId,
}

impl ClientManager {
    pub fn new() -> Self {
        Self {
            clients: HashMap::new(),
            next_client_id: 1,
        }
    }

    /// Lowest slot not held by any session.
    pub fn free_slot(&self) -> Option<Slot> {
        Slot::ALL
            .into_iter()
            .find(|slot| self.client_in_slot(*slot).is_none())
    }

    /// Admits a connection into the lowest free slot.
    ///
    /// Returns `None` when both slots are taken; the caller must then close
    /// the connection without reading from it.
    pub fn add_client(
        &mut self,
        addr: SocketAddr,
        outbound: mpsc::Sender<Arc<str>>,
        stop: watch::Sender<()>,
    ) -> Option<(SessionId, Slot)> {
        let slot = self.free_slot()?;

        let client_id = self.next_client_id;
        self.next_client_id += 1;

        info!(
            "Session {} from {} assigned to player {}",
            client_id,
            addr,
            slot.number()
        );
        self.clients
            .insert(client_id, Client::new(client_id, addr, slot, outbound, stop));

        Some((client_id, slot))
    }

    /// Removes a session. Returns true if it was still registered.
    pub fn remove_client(&mut self, client_id: &SessionId) -> bool {
        if let Some(client) = self.clients.remove(client_id) {
            info!(
                "Session {} ({}) left, player {} slot is free",
                client.id,
                client.addr,
                client.slot.number()
            );
            true
        } else {
            false
        }
    }

    pub fn slot_of(&self, client_id: SessionId) -> Option<Slot> {
        self.clients.get(&client_id).map(|client| client.slot)
    }

    pub fn client_in_slot(&self, slot: Slot) -> Option<&Client> {
        self.clients.values().find(|client| client.slot == slot)
    }

    pub fn is_slot_taken(&self, slot: Slot) -> bool {
        self.client_in_slot(slot).is_some()
    }

    /// Outbound queues of every session, for one broadcast pass.
    pub fn outbound_queues(&self) -> Vec<(SessionId, mpsc::Sender<Arc<str>>)> {
        self.clients
            .values()
            .map(|client| (client.id, client.outbound.clone()))
            .collect()
    }

    /// Returns the number of admitted sessions
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

impl Default for ClientManager {
    fn default() -> Self {
        Self::new()
    }
}
