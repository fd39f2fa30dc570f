//! Command handlers.
//!
//! A [`Handler`] runs one named command. Handlers live in one of two
//! namespaces of the connection's [`Registry`]: public commands anyone may
//! run with the command prefix, and privileged commands reserved for the
//! authenticated master.

use std::sync::Arc;

use async_trait::async_trait;
use ircb_proto::ParsedMessage;

use crate::connection::Connection;
use crate::error::HandlerResult;

pub mod master;
pub mod public;
mod registry;

pub use self::registry::{Namespace, Plugin, Registrar, Registry};

/// A command.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, ctx: &Context<'_>) -> HandlerResult;
}

/// What a handler gets to work with.
pub struct Context<'a> {
    pub conn: &'a Arc<Connection>,
    /// The triggering message, command and arguments already extracted.
    pub msg: &'a ParsedMessage,
}

impl<'a> Context<'a> {
    pub fn new(conn: &'a Arc<Connection>, msg: &'a ParsedMessage) -> Self {
        Self { conn, msg }
    }

    pub fn args(&self) -> &[String] {
        &self.msg.arguments
    }

    /// Reply where the message came from.
    pub async fn reply(&self, text: impl AsRef<str>) -> HandlerResult {
        self.conn.reply(self.msg, text.as_ref()).await?;
        Ok(())
    }

    /// Message the master directly.
    pub async fn send_master(&self, text: impl AsRef<str>) -> HandlerResult {
        self.conn.send_master(text.as_ref()).await?;
        Ok(())
    }
}

/// Returned for lookups of unknown names.
pub struct NoopHandler;

#[async_trait]
impl Handler for NoopHandler {
    async fn handle(&self, ctx: &Context<'_>) -> HandlerResult {
        tracing::debug!(command = %ctx.msg.command, "no-op command ran");
        Ok(())
    }
}

/// The compiled-in command sets, in installation order.
pub fn builtin_plugins() -> Vec<Box<dyn Plugin>> {
    vec![
        Box::new(public::PublicCommands),
        Box::new(master::MasterCommands),
    ]
}
