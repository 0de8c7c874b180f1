use crate::connection::ConnectionEvent;
use crate::server_state::ConnectionId;
use std::collections::HashMap;

pub type ConnectionTx = tokio::sync::mpsc::Sender<ConnectionEvent>;

pub struct ConnectionTxStorage {
    connection_txs: HashMap<ConnectionId, ConnectionTx>,
}

impl ConnectionTxStorage {
    pub fn new() -> Self {
        Self {
            connection_txs: HashMap::new(),
        }
    }

    pub fn insert(&mut self, connection_id: ConnectionId, tx: ConnectionTx) {
        self.connection_txs.insert(connection_id, tx);
    }

    pub async fn send(&mut self, to: ConnectionId, event: ConnectionEvent) {
        if let Some(tx) = self.connection_txs.get_mut(&to) {
            if tx.send(event).await.is_err() {
                log::debug!("connection {} is gone, dropping event", to);
            }
        } else {
            log::warn!("no connection {}", to);
        }
    }

    pub fn remove(&mut self, connection_id: ConnectionId) -> Option<ConnectionTx> {
        self.connection_txs.remove(&connection_id)
    }
}
