use actix::{Actor, ActorContext, AsyncContext, Handler, Message, Running, StreamHandler};
use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use actix_web_actors::ws::{CloseCode, CloseReason};
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::sync::mpsc;

use drawsync_system::{serde_json, Frame};

use crate::connection_tx_storage::ConnectionTx;
use crate::server::ServerTx;
use crate::server_state::ConnectionId;

static NEXT_CONNECTION_ID: AtomicU32 = AtomicU32::new(1);

#[derive(Debug)]
pub enum ConnectionCommand {
    Connect {
        from: ConnectionId,
        tx: ConnectionTx,
        name: String,
    },
    Disconnect {
        from: ConnectionId,
    },
    Frame {
        from: ConnectionId,
        frame: Frame,
    },
}

#[derive(Debug)]
pub enum ConnectionEvent {
    Connected,
    Rejected { reason: String },
    Frame(Frame),
    Disconnected,
}

#[derive(Message)]
#[rtype(result = "()")]
struct ConnectionActorMessage(ConnectionEvent);

struct ConnectionActor {
    id: ConnectionId,
    name: String,
    ingress: mpsc::UnboundedSender<ConnectionCommand>,
}

impl ConnectionActor {
    fn new(name: String, srv_tx: ServerTx) -> Self {
        let id = NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed);
        let (ingress, mut ingress_rx) = mpsc::unbounded_channel::<ConnectionCommand>();

        // Commands reach the room loop in the order the socket produced them,
        // and none is dropped while the loop is busy.
        tokio::spawn(async move {
            while let Some(command) = ingress_rx.recv().await {
                if srv_tx.send(command).await.is_err() {
                    log::warn!("connection {}: room loop is gone", id);
                    break;
                }
            }
        });

        Self { id, name, ingress }
    }

    fn forward(&self, command: ConnectionCommand) {
        if self.ingress.send(command).is_err() {
            log::warn!("connection {}: ingress closed", self.id);
        }
    }
}

impl Actor for ConnectionActor {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        let (tx, mut rx) = mpsc::channel::<ConnectionEvent>(64);

        self.forward(ConnectionCommand::Connect {
            from: self.id,
            tx,
            name: self.name.clone(),
        });

        let addr = ctx.address().recipient();
        let id = self.id;

        tokio::spawn(async move {
            log::debug!("connection {} green thread - started", id);
            while let Some(event) = rx.recv().await {
                // waits for the actor, so a long snapshot can't overflow its mailbox
                if addr.send(ConnectionActorMessage(event)).await.is_err() {
                    break;
                }
            }
            log::debug!("connection {} green thread - terminated", id);
        });
    }

    fn stopping(&mut self, _: &mut Self::Context) -> Running {
        self.forward(ConnectionCommand::Disconnect { from: self.id });
        Running::Stop
    }
}

/// Ingress
impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for ConnectionActor {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        let frame = match msg {
            Ok(ws::Message::Ping(msg)) => {
                ctx.pong(&msg);
                return;
            }
            Ok(ws::Message::Binary(bin)) => {
                log::trace!("ingress size: {}", bin.len());
                Frame::decode(&bin).map_err(|e| e.to_string())
            }
            Ok(ws::Message::Text(text)) => {
                serde_json::from_str::<Frame>(&text).map_err(|e| e.to_string())
            }
            Ok(ws::Message::Close(reason)) => {
                ctx.close(reason);
                ctx.stop();
                return;
            }
            Ok(_) => return,
            Err(e) => {
                log::warn!("connection {}: protocol error: {}", self.id, e);
                ctx.stop();
                return;
            }
        };

        match frame {
            Ok(frame) => {
                log::debug!("ingress {:?}", frame);
                self.forward(ConnectionCommand::Frame {
                    from: self.id,
                    frame,
                });
            }
            Err(e) => {
                log::warn!("connection {}: undecodable frame: {}", self.id, e);
                ctx.close(Some(CloseReason {
                    code: CloseCode::Invalid,
                    description: None,
                }));
                ctx.stop();
            }
        }
    }
}

/// Egress
impl Handler<ConnectionActorMessage> for ConnectionActor {
    type Result = ();

    fn handle(
        &mut self,
        msg: ConnectionActorMessage,
        ctx: &mut ws::WebsocketContext<Self>,
    ) -> Self::Result {
        match msg.0 {
            ConnectionEvent::Connected => {
                log::debug!("connection {} joined as {}", self.id, self.name);
            }
            ConnectionEvent::Rejected { reason } => {
                ctx.close(Some(CloseReason {
                    code: CloseCode::Policy,
                    description: Some(reason),
                }));
                ctx.stop();
            }
            ConnectionEvent::Frame(frame) => match frame.encode() {
                Ok(bytes) => ctx.binary(bytes),
                Err(e) => log::error!("connection {}: could not encode frame: {}", self.id, e),
            },
            ConnectionEvent::Disconnected => {
                ctx.close(None);
                ctx.stop();
            }
        }
    }
}

pub async fn ws_index(
    req: HttpRequest,
    stream: web::Payload,
    srv_tx: web::Data<ServerTx>,
) -> Result<HttpResponse, Error> {
    let name = req
        .match_info()
        .get("name")
        .map(str::trim)
        .unwrap_or_default()
        .to_owned();
    if name.is_empty() {
        return Ok(HttpResponse::BadRequest().body("a participant name is required"));
    }
    ws::start(
        ConnectionActor::new(name, srv_tx.get_ref().clone()),
        &req,
        stream,
    )
}
