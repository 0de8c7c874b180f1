pub extern crate actix_web;

pub mod config;
pub mod connection;
mod connection_tx_storage;
pub mod room;
pub mod server;
mod server_state;
mod stroke_log;
pub mod words;
