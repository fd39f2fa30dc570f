//! Commands anyone can run with the command prefix.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::{Context, Handler, Namespace, Plugin, Registrar};
use crate::error::HandlerResult;

/// quiet, up, uptime, help, about, echo, karma, define, seen.
pub struct PublicCommands;

impl Plugin for PublicCommands {
    fn name(&self) -> &'static str {
        "public"
    }

    fn register(&self, r: &mut Registrar<'_>) {
        r.public("quiet", QuietHandler);
        r.public("up", UpHandler);
        r.public("uptime", HostUptimeHandler);
        r.public("help", HelpHandler);
        r.public("about", AboutHandler);
        r.public("echo", EchoHandler);
        r.public("karma", KarmaHandler);
        r.public("define", DefineHandler);
        r.public("seen", SeenHandler);
    }
}

/// Toggle outbound PRIVMSG suppression.
pub struct QuietHandler;

#[async_trait]
impl Handler for QuietHandler {
    async fn handle(&self, ctx: &Context<'_>) -> HandlerResult {
        if ctx.conn.toggle_mute() {
            info!(by = %ctx.msg.reply_to, "muted");
        } else {
            info!(by = %ctx.msg.reply_to, "no longer muted");
            ctx.reply("\x01ACTION gasps for air\x01").await?;
        }
        Ok(())
    }
}

/// Time since the connection was established.
pub struct UpHandler;

#[async_trait]
impl Handler for UpHandler {
    async fn handle(&self, ctx: &Context<'_>) -> HandlerResult {
        let up = ctx.conn.connected_for().unwrap_or_default();
        ctx.reply(format_duration(up)).await
    }
}

/// First line of the host's `uptime`, fetched off the read loop.
pub struct HostUptimeHandler;

#[async_trait]
impl Handler for HostUptimeHandler {
    async fn handle(&self, ctx: &Context<'_>) -> HandlerResult {
        let conn = ctx.conn.clone();
        let msg = ctx.msg.clone();
        tokio::spawn(async move {
            let output = tokio::process::Command::new("uptime").output().await;
            if conn.is_closing() {
                debug!("connection closed before uptime finished");
                return;
            }
            let result = match output {
                Ok(out) => {
                    let stdout = String::from_utf8_lossy(&out.stdout);
                    let first = stdout.lines().next().unwrap_or_default().trim().to_string();
                    if first.is_empty() {
                        return;
                    }
                    conn.reply(&msg, &first).await
                }
                Err(e) => {
                    warn!(error = %e, "uptime failed");
                    conn.send_master(&e.to_string()).await
                }
            };
            if let Err(e) = result {
                warn!(error = %e, "failed to send uptime");
            }
        });
        Ok(())
    }
}

/// List the public commands.
pub struct HelpHandler;

#[async_trait]
impl Handler for HelpHandler {
    async fn handle(&self, ctx: &Context<'_>) -> HandlerResult {
        let names = ctx.conn.registry().names(Namespace::Public);
        ctx.reply(format!("{} commands: [{}]", names.len(), names.join(" ")))
            .await
    }
}

pub struct AboutHandler;

#[async_trait]
impl Handler for AboutHandler {
    async fn handle(&self, ctx: &Context<'_>) -> HandlerResult {
        let prefix = ctx.conn.command_prefix();
        ctx.reply(format!(
            "I'm a robot ({}). Try {}help for a list of commands.",
            crate::VERSION,
            prefix
        ))
        .await
    }
}

pub struct EchoHandler;

#[async_trait]
impl Handler for EchoHandler {
    async fn handle(&self, ctx: &Context<'_>) -> HandlerResult {
        ctx.reply(ctx.args().join(" ")).await
    }
}

/// `karma [nick]`, defaulting to the sender.
pub struct KarmaHandler;

#[async_trait]
impl Handler for KarmaHandler {
    async fn handle(&self, ctx: &Context<'_>) -> HandlerResult {
        let name = match ctx.args().first().map(|a| a.trim()) {
            Some(name) if !name.is_empty() => name,
            _ => ctx.msg.reply_to.as_str(),
        };
        let karma = ctx.conn.store().karma(name).await?;
        ctx.reply(format!("{name}: {karma}")).await
    }
}

/// `define <word> <text>`. Lookups happen in the dispatcher for bare commands.
pub struct DefineHandler;

#[async_trait]
impl Handler for DefineHandler {
    async fn handle(&self, ctx: &Context<'_>) -> HandlerResult {
        if !ctx.conn.settings().define {
            return Ok(());
        }
        let args = ctx.args();
        if args.len() < 2 || args[0].is_empty() {
            return ctx.reply("usage: define [word] [text]").await;
        }

        let word = &args[0];
        if ctx.conn.registry().is_known(Namespace::Public, word) {
            return ctx
                .reply(format!("already defined as command: {word:?}"))
                .await;
        }

        let text = args[1..].join(" ");
        ctx.conn.store().define(word, &text).await?;
        info!(word = %word, by = %ctx.msg.reply_to, "defined");
        ctx.reply(format!("defined: {word:?}")).await
    }
}

/// `seen <nick>`: the last channel line recorded for a nick.
pub struct SeenHandler;

#[async_trait]
impl Handler for SeenHandler {
    async fn handle(&self, ctx: &Context<'_>) -> HandlerResult {
        if !ctx.conn.settings().history {
            return Ok(());
        }
        let Some(nick) = ctx.args().first().filter(|n| !n.is_empty()) else {
            return ctx.reply("usage: seen [nick]").await;
        };

        match ctx.conn.store().last_seen(nick).await? {
            Some(entry) => {
                let ago = chrono::Utc::now().timestamp().saturating_sub(entry.timestamp);
                let ago = format_duration(Duration::from_secs(ago.max(0) as u64));
                ctx.reply(format!(
                    "{nick} was last seen in {} {ago} ago: {}",
                    entry.channel, entry.text
                ))
                .await
            }
            None => ctx.reply(format!("I haven't seen {nick}")).await,
        }
    }
}

/// Compact `1d2h3m4s` rendering, seconds precision.
pub fn format_duration(d: Duration) -> String {
    let total = d.as_secs();
    let (days, rem) = (total / 86_400, total % 86_400);
    let (hours, rem) = (rem / 3_600, rem % 3_600);
    let (minutes, seconds) = (rem / 60, rem % 60);

    let mut out = String::new();
    if days > 0 {
        out.push_str(&format!("{days}d"));
    }
    if days > 0 || hours > 0 {
        out.push_str(&format!("{hours}h"));
    }
    if days > 0 || hours > 0 || minutes > 0 {
        out.push_str(&format!("{minutes}m"));
    }
    out.push_str(&format!("{seconds}s"));
    out
}
