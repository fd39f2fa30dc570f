//! ircb - a single-connection IRC bot.
//!
//! One [`Connection`](connection::Connection) owns one server session: it
//! registers, authenticates its master through the network's identity
//! service, and routes every inbound line through the numeric, notice, mode
//! and privmsg handlers. Commands live in a two-namespace
//! [`Registry`](handlers::Registry) populated from compiled-in
//! [`Plugin`](handlers::Plugin)s.

pub mod auth;
pub mod config;
pub mod connection;
pub mod control;
pub mod error;
pub mod handlers;
pub mod karma;
pub mod links;
pub mod store;
pub mod telemetry;

pub use crate::connection::{Connection, ExitReason};

/// Identifies the bot in QUIT messages and `about`.
pub const VERSION: &str = concat!("ircb v", env!("CARGO_PKG_VERSION"));
