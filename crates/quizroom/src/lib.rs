//! Realtime multiplayer quiz room server.
//!
//! Wires together the session/room/protocol/transport crates into one
//! `axum` server: a WebSocket stream for live play plus a small HTTP
//! mirror for recaps, analytics, and dashboards that don't want to hold
//! a socket open.

mod analytics;
mod config;
mod error;
mod handler;
mod http;
mod recap_store;
mod server;
mod snapshot;

pub use config::Config;
pub use error::QuizRoomError;
pub use server::run;

pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::QuizRoomError;
    pub use crate::server::run;
}