pub mod event;

use dashmap::DashMap;
use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

pub use event::{HubEvent, IMAGE_SENT};

pub type ConnectionId = Uuid;

/// Registry of open sockets for one hub instance.
///
/// Each entry is the sending half of a channel drained by that socket's writer task,
/// so broadcasting never touches a socket directly. Channels carry finished text frames.
pub struct Hub {
    connections: DashMap<ConnectionId, UnboundedSender<String>>,
}

impl Hub {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
        }
    }

    pub fn register(&self, sender: UnboundedSender<String>) -> ConnectionId {
        let id = Uuid::now_v7();
        self.connections.insert(id, sender);
        id
    }

    /// Returns true if the connection was registered.
    pub fn unregister(&self, id: ConnectionId) -> bool {
        self.connections.remove(&id).is_some()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Deliver to every open connection, the sender included. Returns how many accepted it.
    pub fn broadcast_all(&self, event: &HubEvent) -> usize {
        match serde_json::to_string(event) {
            Ok(frame) => self.deliver(&frame, None),
            Err(e) => {
                tracing::error!("Failed to serialize hub event: {e}");
                0
            }
        }
    }

    pub fn broadcast_except(&self, skip: ConnectionId, event: &HubEvent) -> usize {
        match serde_json::to_string(event) {
            Ok(frame) => self.deliver(&frame, Some(skip)),
            Err(e) => {
                tracing::error!("Failed to serialize hub event: {e}");
                0
            }
        }
    }

    /// Forward a frame exactly as a client sent it to every open connection.
    pub fn relay(&self, frame: &str) -> usize {
        self.deliver(frame, None)
    }

    fn deliver(&self, frame: &str, skip: Option<ConnectionId>) -> usize {
        let mut delivered = 0;

        for entry in self.connections.iter() {
            if Some(*entry.key()) == skip {
                continue;
            }

            // A closed channel means the writer already exited; the reader will unregister it.
            match entry.value().send(frame.to_string()) {
                Ok(()) => delivered += 1,
                Err(_) => tracing::debug!("Skipping closed connection {}", entry.key()),
            }
        }

        delivered
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}
