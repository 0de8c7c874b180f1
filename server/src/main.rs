use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use clap::Parser;

use drawsync_server::config::{RoomConfig, ServerArgs};
use drawsync_server::connection::ws_index;
use drawsync_server::room::Room;
use drawsync_server::server::spawn_server;
use drawsync_server::words::WordBook;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = ServerArgs::parse();
    let words = match &args.words {
        Some(path) => WordBook::load(path)?,
        None => WordBook::builtin(),
    };
    let room = Room::new(RoomConfig::from(&args), words);
    let srv_tx = spawn_server(room);

    let origins = args.allowed_origins.clone();
    log::info!("listening on {}", args.bind);

    HttpServer::new(move || {
        let cors = if origins.is_empty() {
            Cors::permissive()
        } else {
            origins.iter().fold(
                Cors::default().allow_any_method().allow_any_header(),
                |cors, origin| cors.allowed_origin(origin),
            )
        };
        App::new()
            .wrap(cors)
            .app_data(web::Data::new(srv_tx.clone()))
            .route("/ws/{name}/", web::get().to(ws_index))
    })
    .bind(&args.bind)?
    .run()
    .await
}
