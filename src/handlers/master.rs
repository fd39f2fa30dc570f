//! Commands reserved for the authenticated master.

use async_trait::async_trait;
use tracing::info;

use super::{Context, Handler, Namespace, Plugin, Registrar};
use crate::connection::{ExitReason, Feature};
use crate::error::HandlerResult;

/// do, r, part, join, quit, q, help, set.
pub struct MasterCommands;

impl Plugin for MasterCommands {
    fn name(&self) -> &'static str {
        "master"
    }

    fn register(&self, r: &mut Registrar<'_>) {
        r.privileged("do", DoHandler);
        r.privileged("r", RestartHandler);
        r.privileged("part", PartHandler);
        r.privileged("join", JoinHandler);
        r.privileged("quit", QuitHandler);
        r.privileged("q", QuitHandler);
        r.privileged("help", MasterHelpHandler);
        r.privileged("set", SetHandler);
    }
}

/// Write the arguments to the server as a raw line.
pub struct DoHandler;

#[async_trait]
impl Handler for DoHandler {
    async fn handle(&self, ctx: &Context<'_>) -> HandlerResult {
        let line = ctx.args().join(" ");
        info!(line = %line, "master raw line");
        ctx.conn.write(&line).await?;
        Ok(())
    }
}

/// Close with [`ExitReason::Restart`] so the supervisor starts us again.
pub struct RestartHandler;

#[async_trait]
impl Handler for RestartHandler {
    async fn handle(&self, ctx: &Context<'_>) -> HandlerResult {
        ctx.reply("brb").await?;
        ctx.conn.close(ExitReason::Restart).await?;
        Ok(())
    }
}

/// Leave the current channel, or the one named.
pub struct PartHandler;

#[async_trait]
impl Handler for PartHandler {
    async fn handle(&self, ctx: &Context<'_>) -> HandlerResult {
        let channel = if ctx.msg.is_channel() {
            ctx.reply(":(").await?;
            ctx.msg.to.as_str()
        } else {
            match ctx.args() {
                [channel] if channel.starts_with('#') => channel.as_str(),
                _ => return ctx.send_master("usage: part #channel").await,
            }
        };
        ctx.conn.write(&format!("PART :{channel}")).await?;
        ctx.send_master(format!("Parted channel: {channel:?}")).await
    }
}

pub struct JoinHandler;

#[async_trait]
impl Handler for JoinHandler {
    async fn handle(&self, ctx: &Context<'_>) -> HandlerResult {
        match ctx.args() {
            [channel] if channel.starts_with('#') => {
                ctx.conn.write(&format!("JOIN {channel}")).await?;
                ctx.send_master(format!("Joined channel: {channel:?}")).await
            }
            _ => ctx.send_master("usage: join #channel").await,
        }
    }
}

pub struct QuitHandler;

#[async_trait]
impl Handler for QuitHandler {
    async fn handle(&self, ctx: &Context<'_>) -> HandlerResult {
        info!(by = %ctx.msg.reply_to, "quit requested");
        ctx.conn.close(ExitReason::Quit).await?;
        Ok(())
    }
}

/// List the master commands.
pub struct MasterHelpHandler;

#[async_trait]
impl Handler for MasterHelpHandler {
    async fn handle(&self, ctx: &Context<'_>) -> HandlerResult {
        let names = ctx.conn.registry().names(Namespace::Privileged);
        ctx.reply(format!(
            "{} master commands: [{}]",
            names.len(),
            names.join(" ")
        ))
        .await
    }
}

/// `set links|define|history|karma on|off`.
pub struct SetHandler;

const SET_USAGE: &str = "usage: set optionname on|off";

#[async_trait]
impl Handler for SetHandler {
    async fn handle(&self, ctx: &Context<'_>) -> HandlerResult {
        let [option, value] = ctx.args() else {
            return ctx.reply(SET_USAGE).await;
        };
        let Ok(feature) = option.parse::<Feature>() else {
            return ctx.reply("no option like that").await;
        };
        let on = match value.as_str() {
            "on" => true,
            "off" => false,
            _ => return ctx.reply(SET_USAGE).await,
        };

        ctx.conn.set_feature(feature, on);
        info!(feature = %feature, on, "feature toggled");
        ctx.reply(format!("{feature}: {}", if on { "on" } else { "off" }))
            .await
    }
}
