mod config;
mod emitter;
mod error;
mod gateway;
pub mod history;
mod message;
mod roster;
mod session;
pub mod surface;
mod types;
mod undo;

pub use config::*;
pub use emitter::*;
pub use error::*;
pub use gateway::*;
pub use history::{Action, ActionHistory};
pub use message::*;
pub use roster::*;
pub use session::*;
pub use surface::{draw_segment, Surface};
pub use types::*;
pub use undo::*;

pub extern crate bincode;
pub extern crate euclid;
pub extern crate serde;
pub extern crate serde_json;
