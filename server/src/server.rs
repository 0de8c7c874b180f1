use std::time::Instant;
use tokio::sync::mpsc::{channel, Sender};

use drawsync_system::Frame;

use super::connection::{ConnectionCommand, ConnectionEvent};
use crate::connection_tx_storage::ConnectionTxStorage;
use crate::room::{Delivery, Room};
use crate::server_state::{ConnectionId, ServerState};

pub type ServerTx = Sender<ConnectionCommand>;

struct Server {
    room: Room,
    server_state: ServerState,
    connections: ConnectionTxStorage,
}

impl Server {
    fn new(room: Room) -> Self {
        Self {
            room,
            server_state: ServerState::new(),
            connections: ConnectionTxStorage::new(),
        }
    }

    async fn handle_connection_command(&mut self, command: ConnectionCommand) {
        match command {
            ConnectionCommand::Connect { from, tx, name } => {
                self.connections.insert(from, tx);
                match self.room.join(&name) {
                    Ok(deliveries) => {
                        // deliveries first: a kick must reach the previous holder
                        self.route(deliveries).await;
                        self.server_state.bind(from, &name);
                        self.connections
                            .send(from, ConnectionEvent::Connected)
                            .await;
                        log::info!("connection {} is {}", from, name);
                    }
                    Err(e) => {
                        log::info!("refusing {} on connection {}: {}", name, from, e);
                        self.connections
                            .send(
                                from,
                                ConnectionEvent::Rejected {
                                    reason: e.to_string(),
                                },
                            )
                            .await;
                        self.connections.remove(from);
                    }
                }
            }
            ConnectionCommand::Disconnect { from } => {
                self.connections.remove(from);
                if let Some(name) = self.server_state.disconnect(from) {
                    let deliveries = self.room.leave(&name);
                    self.route(deliveries).await;
                }
            }
            ConnectionCommand::Frame { from, frame } => match frame {
                Frame::Subscribe { destination } => {
                    log::trace!("connection {} subscribes {}", from, destination);
                    self.server_state.subscribe(from, &destination);
                }
                Frame::Send { destination, body } => {
                    let name = match self.server_state.identity(from) {
                        Some(name) => name.to_owned(),
                        None => {
                            log::warn!("send from unbound connection {}", from);
                            return;
                        }
                    };
                    let deliveries = self.room.handle(&name, &destination, &body, Instant::now());
                    self.route(deliveries).await;
                }
                Frame::Message { destination, .. } => {
                    log::warn!(
                        "connection {} sent a server-only frame for {}",
                        from,
                        destination
                    );
                }
            },
        }
    }

    async fn route(&mut self, deliveries: Vec<Delivery>) {
        for delivery in deliveries {
            match delivery {
                Delivery::Broadcast { destination, body } => {
                    let targets: Vec<ConnectionId> =
                        self.server_state.subscribers(destination).collect();
                    for to in targets {
                        self.deliver(to, destination, body.clone()).await;
                    }
                }
                Delivery::ToUser {
                    name,
                    destination,
                    body,
                } => {
                    if let Some(to) = self.server_state.holder(&name) {
                        if self.server_state.is_subscribed(to, destination) {
                            self.deliver(to, destination, body).await;
                        }
                    }
                }
                Delivery::Kick { name } => {
                    if let Some(to) = self.server_state.holder(&name) {
                        log::info!("closing connection {} of {}", to, name);
                        self.connections
                            .send(to, ConnectionEvent::Disconnected)
                            .await;
                    }
                }
            }
        }
    }

    async fn deliver(&mut self, to: ConnectionId, destination: &str, body: String) {
        let frame = Frame::Message {
            destination: destination.to_owned(),
            body,
        };
        self.connections.send(to, ConnectionEvent::Frame(frame)).await;
    }
}

pub fn spawn_server(room: Room) -> ServerTx {
    let (srv_tx, mut srv_rx) = channel::<ConnectionCommand>(1024);

    tokio::spawn(async move {
        let mut server = Box::new(Server::new(room));

        while let Some(command) = srv_rx.recv().await {
            server.handle_connection_command(command).await;
        }
        log::info!("room loop terminated");
    });

    srv_tx
}
