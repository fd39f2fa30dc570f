//! Integration test common infrastructure.
//!
//! A scripted IRC server the bot dials, helpers to start a bot against it,
//! and a one-shot HTTP responder for link titles.

pub mod bot;
pub mod http;
pub mod server;

#[allow(unused_imports)]
pub use bot::{TestBot, test_config};
#[allow(unused_imports)]
pub use server::{FakeServer, ServerSession};
