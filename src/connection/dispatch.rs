//! Inbound line routing.
//!
//! PING is answered first. Everything else is parsed and routed by verb:
//! numerics, NOTICE (identity acknowledgments), MODE (auto-join), PRIVMSG
//! (master path, then public path) and the SASL exchange.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use ircb_proto::{ParsedMessage, parse};
use tracing::{Instrument, debug, info, warn};

use super::sasl::{self, SaslState};
use super::{Connection, ExitReason};
use crate::handlers::{Context, Handler, Namespace};
use crate::store::SeenEntry;
use crate::telemetry::{CommandTimer, spans};

const ERR_NICKNAMEINUSE: u16 = 433;

impl Connection {
    /// Handle one inbound line.
    pub(crate) async fn handle_line(self: &Arc<Self>, line: &str) {
        if let Some(pong) = pong_for(line) {
            if let Err(e) = self.write(&pong).await {
                warn!(error = %e, "failed to answer PING");
            }
            return;
        }

        let Some(mut msg) = parse(line) else {
            return;
        };
        let prefix = self.command_prefix();
        msg.extract_command(&prefix, &self.nick);
        self.route(msg).await;
    }

    async fn route(self: &Arc<Self>, msg: ParsedMessage) {
        if let Some(code) = msg.numeric() {
            self.on_numeric(code, &msg).await;
            return;
        }

        match msg.verb.as_str() {
            "NOTICE" => self.on_notice(&msg),
            "MODE" => self.on_mode(&msg).await,
            "PRIVMSG" => self.on_privmsg(&msg).await,
            "CAP" => self.on_cap(&msg).await,
            "AUTHENTICATE" => self.on_authenticate(&msg).await,
            "ERROR" => warn!(message = %msg.message, "server error"),
            _ => debug!(verb = %msg.verb, line = %msg.raw, "unhandled verb"),
        }
    }

    async fn on_numeric(self: &Arc<Self>, code: u16, msg: &ParsedMessage) {
        match code {
            ERR_NICKNAMEINUSE => {
                warn!(nick = %self.nick, "nickname already in use");
                if let Err(e) = self.close(ExitReason::NicknameInUse).await {
                    warn!(error = %e, "close failed");
                }
            }
            sasl::RPL_LOGGEDIN => info!(message = %msg.message, "logged in"),
            sasl::RPL_SASLSUCCESS => self.finish_sasl(SaslState::Done).await,
            sasl::ERR_NICKLOCKED
            | sasl::ERR_SASLFAIL
            | sasl::ERR_SASLTOOLONG
            | sasl::ERR_SASLABORTED
            | sasl::ERR_SASLALREADY => {
                warn!(code, message = %msg.message, "SASL authentication failed");
                self.finish_sasl(SaslState::Failed).await;
            }
            1..=7 | 372 | 375 | 376 | 366 => {
                debug!(code, message = %msg.message, "server info");
            }
            221 => info!(modes = %msg.message, "user mode"),
            331..=333 => info!(code, line = %msg.raw, "topic"),
            353 => info!(line = %msg.raw, "names"),
            _ => info!(code, message = %msg.message, "numeric"),
        }
    }

    fn on_notice(&self, msg: &ParsedMessage) {
        if msg.reply_to == self.auth.service() {
            self.auth.observe_notice(msg);
        } else {
            info!(from = %msg.reply_to, message = %msg.message, "notice");
        }
    }

    /// The first MODE line means registration is through: join the channels.
    async fn on_mode(&self, msg: &ParsedMessage) {
        debug!(line = %msg.raw, "mode");
        if self.joined.swap(true, Ordering::SeqCst) {
            return;
        }
        for channel in self.config.bot.channel_list() {
            info!(channel, "joining");
            if let Err(e) = self.write(&format!("JOIN {channel}")).await {
                warn!(channel, error = %e, "join failed");
            }
        }
    }

    async fn on_privmsg(self: &Arc<Self>, msg: &ParsedMessage) {
        if msg.reply_to == self.master_nick && self.master_command(msg).await {
            return;
        }
        self.public_command(msg).await;
    }

    /// Privileged path. Returns true when the message was consumed.
    async fn master_command(self: &Arc<Self>, msg: &ParsedMessage) -> bool {
        let Some(sub_prefix) = self.master_prefix.as_deref() else {
            return false;
        };
        let prefix = self.command_prefix();
        let prefixed = msg.message.starts_with(sub_prefix);
        let prefix_change = msg.command == prefix && msg.arguments.len() == 1;
        if !prefixed && !prefix_change {
            return false;
        }

        if !self.auth.is_trusted() {
            info!(master = %self.master_nick, "master not authenticated, challenging");
            if let Some(challenge) = self.auth.challenge()
                && let Err(e) = self.write(&challenge).await
            {
                warn!(error = %e, "failed to send challenge");
            }
            return true;
        }

        if !prefixed {
            let new_prefix = msg.arguments[0].clone();
            self.set_command_prefix(new_prefix.clone());
            info!(prefix = %new_prefix, "command prefix changed");
            if let Err(e) = self
                .send_master(&format!("**New command prefix: {new_prefix:?}"))
                .await
            {
                warn!(error = %e, "failed to confirm prefix change");
            }
            return true;
        }

        let body = &msg.message[sub_prefix.len()..];
        let mut tokens = body.split(' ');
        let command = tokens.next().unwrap_or_default().trim().to_string();
        if command.is_empty() {
            return false;
        }
        let arguments: Vec<String> = tokens
            .filter(|a| !a.trim().is_empty())
            .map(str::to_string)
            .collect();

        let mut master_msg = msg.clone();
        master_msg.message = body.to_string();
        master_msg.command = command;
        master_msg.arguments = arguments;

        match self
            .registry
            .lookup(Namespace::Privileged, &master_msg.command)
        {
            Some(handler) => {
                info!(command = %master_msg.command, args = master_msg.arguments.len(), "master command");
                self.run_command(handler, &master_msg).await;
            }
            None => {
                info!(command = %master_msg.command, "master command not found");
                let text = format!("master command not found: {:?}", master_msg.command);
                if let Err(e) = self.send_master(&text).await {
                    warn!(error = %e, "failed to report unknown master command");
                }
            }
        }
        true
    }

    /// Public path: history, karma, commands, definitions, links.
    async fn public_command(self: &Arc<Self>, msg: &ParsedMessage) {
        let settings = self.settings();

        if settings.history && msg.is_channel() && !msg.reply_to.is_empty() {
            let entry = SeenEntry::now(msg.to.as_str(), msg.message.as_str());
            if let Err(e) = self.store.record_seen(&msg.reply_to, entry).await {
                warn!(error = %e, "failed to record history");
            }
        }

        if settings.karma
            && msg.is_channel()
            && let Some(change) = crate::karma::parse(&msg.message)
        {
            match self.store.adjust_karma(&change.name, change.delta).await {
                Ok(total) => info!(name = %change.name, delta = change.delta, total, "karma"),
                Err(e) => warn!(name = %change.name, error = %e, "failed to update karma"),
            }
            return;
        }

        if msg.has_command() {
            if let Some(handler) = self.registry.lookup(Namespace::Public, &msg.command) {
                self.run_command(handler, msg).await;
                return;
            }

            if msg.arguments.is_empty() {
                match self.store.definition(&msg.command).await {
                    Ok(Some(definition)) => {
                        if let Err(e) = self.reply(msg, &definition).await {
                            warn!(error = %e, "failed to send definition");
                        }
                        return;
                    }
                    Ok(None) => {}
                    Err(e) => warn!(word = %msg.command, error = %e, "definition lookup failed"),
                }
            }
            debug!(command = %msg.command, "command not found");
        }

        if settings.links && msg.message.contains("http") {
            crate::links::spawn(self, msg);
        }
    }

    async fn run_command(self: &Arc<Self>, handler: Arc<dyn Handler>, msg: &ParsedMessage) {
        let target = msg.is_channel().then_some(msg.to.as_str());
        let span = spans::command(&msg.command, &msg.reply_to, target);
        let _timer = CommandTimer::new(msg.command.as_str());

        let ctx = Context::new(self, msg);
        if let Err(e) = handler.handle(&ctx).instrument(span).await {
            warn!(command = %msg.command, error = %e, code = e.error_code(), "command failed");
        }
    }

    async fn on_cap(&self, msg: &ParsedMessage) {
        let state = *self.sasl.lock();
        if state != SaslState::Requested {
            debug!(line = %msg.raw, "CAP");
            return;
        }

        if sasl::is_sasl_ack(&msg.message, &msg.raw) {
            *self.sasl.lock() = SaslState::Authenticating;
            if let Err(e) = self.write("AUTHENTICATE PLAIN").await {
                warn!(error = %e, "failed to start SASL");
            }
        } else if sasl::is_nak(&msg.raw) {
            warn!(caps = %msg.message, "server refused SASL");
            self.finish_sasl(SaslState::Failed).await;
        }
    }

    async fn on_authenticate(&self, msg: &ParsedMessage) {
        if msg.message != "+" || *self.sasl.lock() != SaslState::Authenticating {
            debug!(line = %msg.raw, "AUTHENTICATE");
            return;
        }
        let Some(password) = self.config.bot.sasl_password.as_deref() else {
            return;
        };

        let payload = sasl::plain_payload(&self.nick, password);
        for line in sasl::authenticate_lines(&payload) {
            if let Err(e) = self.write(&line).await {
                warn!(error = %e, "failed to send SASL credentials");
                return;
            }
        }
    }

    /// Record the outcome and end capability negotiation once.
    async fn finish_sasl(&self, outcome: SaslState) {
        {
            let mut state = self.sasl.lock();
            if !matches!(*state, SaslState::Requested | SaslState::Authenticating) {
                return;
            }
            *state = outcome;
        }
        if outcome == SaslState::Done {
            info!("SASL authentication succeeded");
        }
        if let Err(e) = self.write("CAP END").await {
            warn!(error = %e, "failed to send CAP END");
        }
    }
}

/// `PONG` for a line whose verb is exactly `PING`, with or without a source
/// prefix. The source is dropped from the reply.
fn pong_for(line: &str) -> Option<String> {
    let body = match line.strip_prefix(':') {
        Some(rest) => rest.split_once(' ')?.1,
        None => line,
    };
    match body.split_once(' ') {
        Some(("PING", params)) => Some(format!("PONG {params}")),
        None if body == "PING" => Some("PONG".to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pong_for_ping() {
        assert_eq!(pong_for("PING :irc.example.net").as_deref(), Some("PONG :irc.example.net"));
        assert_eq!(pong_for("PING mustangsally").as_deref(), Some("PONG mustangsally"));
        assert_eq!(pong_for("PING").as_deref(), Some("PONG"));
    }

    #[test]
    fn test_pong_for_prefixed_ping() {
        assert_eq!(pong_for(":irc.example.net PING :abc").as_deref(), Some("PONG :abc"));
    }

    #[test]
    fn test_pong_for_other_verbs() {
        assert_eq!(pong_for("PINGX a"), None);
        assert_eq!(pong_for(":alice!a@h PRIVMSG #one :PING me"), None);
        assert_eq!(pong_for(":irc.example.net PONG :abc"), None);
        assert_eq!(pong_for(":lonely"), None);
    }
}
