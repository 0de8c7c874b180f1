use std::collections::{HashMap, HashSet};

pub type ConnectionId = u32;

/// Who is behind each connection and what it listens to.
pub struct ServerState {
    identities: HashMap<ConnectionId, String>,
    holders: HashMap<String, ConnectionId>,
    subscriptions: HashMap<ConnectionId, HashSet<String>>,
}

impl ServerState {
    pub fn new() -> Self {
        Self {
            identities: HashMap::new(),
            holders: HashMap::new(),
            subscriptions: HashMap::new(),
        }
    }

    /// The connection now speaks for `name`; returns the one that did before.
    pub fn bind(&mut self, connection_id: ConnectionId, name: &str) -> Option<ConnectionId> {
        self.identities.insert(connection_id, name.to_owned());
        self.subscriptions.entry(connection_id).or_default();
        self.holders.insert(name.to_owned(), connection_id)
    }

    pub fn identity(&self, connection_id: ConnectionId) -> Option<&str> {
        self.identities.get(&connection_id).map(String::as_str)
    }

    pub fn holder(&self, name: &str) -> Option<ConnectionId> {
        self.holders.get(name).copied()
    }

    pub fn subscribe(&mut self, connection_id: ConnectionId, destination: &str) {
        if let Some(subscriptions) = self.subscriptions.get_mut(&connection_id) {
            subscriptions.insert(destination.to_owned());
        }
    }

    pub fn is_subscribed(&self, connection_id: ConnectionId, destination: &str) -> bool {
        self.subscriptions
            .get(&connection_id)
            .map(|s| s.contains(destination))
            .unwrap_or(false)
    }

    pub fn subscribers<'a>(
        &'a self,
        destination: &'a str,
    ) -> impl Iterator<Item = ConnectionId> + 'a {
        self.subscriptions
            .iter()
            .filter(move |(_, s)| s.contains(destination))
            .map(|(id, _)| *id)
    }

    /// Forgets the connection. Returns the name it held, unless a newer
    /// connection has taken the name over since.
    pub fn disconnect(&mut self, connection_id: ConnectionId) -> Option<String> {
        self.subscriptions.remove(&connection_id);
        let name = self.identities.remove(&connection_id)?;
        if self.holders.get(&name) == Some(&connection_id) {
            self.holders.remove(&name);
            Some(name)
        } else {
            None
        }
    }
}
