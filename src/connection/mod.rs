//! One bot session with one IRC server.
//!
//! A [`Connection`] is shared as `Arc<Connection>`: the read loop runs on the
//! task that called [`Connection::connect`], while detached tasks (link
//! titles, `uptime`, the control socket, the Ctrl-C handler) hold clones and
//! may write replies or call [`Connection::close`] at any time.

mod dispatch;
mod event_loop;
mod lifecycle;
mod sasl;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::{Duration, Instant};

use ircb_proto::{LineWriter, ParsedMessage, TransportError};
use parking_lot::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::auth::AuthTracker;
use crate::config::Config;
use crate::error::ConnectionError;
use crate::handlers::Registry;
use crate::store::Store;

pub use self::lifecycle::{ConnState, Lifecycle};
pub use self::sasl::SaslState;

/// Longest line servers are required to accept, terminator included.
pub const MAX_OUTBOUND_LEN: usize = 512;

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// The master asked us to quit.
    Quit,
    /// Stopped from outside (control socket, Ctrl-C).
    Stop,
    /// Stop and expect to be started again.
    Restart,
    /// The server refused our nick (433).
    NicknameInUse,
    /// The socket failed or the server hung up.
    ConnectionLost,
}

impl ExitReason {
    /// Process exit code; a supervisor restarts on 3.
    pub fn exit_code(self) -> u8 {
        match self {
            Self::Quit | Self::Stop => 0,
            Self::NicknameInUse | Self::ConnectionLost => 1,
            Self::Restart => 3,
        }
    }
}

/// Runtime-switchable features.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    Links,
    Define,
    History,
    Karma,
}

impl FromStr for Feature {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "links" => Ok(Self::Links),
            "define" => Ok(Self::Define),
            "history" => Ok(Self::History),
            "karma" => Ok(Self::Karma),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Links => "links",
            Self::Define => "define",
            Self::History => "history",
            Self::Karma => "karma",
        })
    }
}

/// Settings the master can change while connected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub command_prefix: String,
    pub links: bool,
    pub define: bool,
    pub history: bool,
    pub karma: bool,
}

impl Settings {
    fn from_config(config: &Config) -> Self {
        Self {
            command_prefix: config.bot.command_prefix.clone(),
            links: config.features.links,
            define: config.features.define,
            history: config.features.history,
            karma: config.features.karma,
        }
    }
}

pub struct Connection {
    config: Arc<Config>,
    nick: String,
    master_nick: String,
    master_prefix: Option<String>,
    settings: RwLock<Settings>,
    registry: Registry,
    auth: AuthTracker,
    store: Arc<dyn Store>,
    http: reqwest::Client,
    lifecycle: Mutex<Lifecycle>,
    writer: Mutex<Option<LineWriter>>,
    since: Mutex<Option<Instant>>,
    joined: AtomicBool,
    shutdown: CancellationToken,
    exit_reason: Mutex<Option<ExitReason>>,
    sasl: Mutex<SaslState>,
}

impl Connection {
    /// A disconnected session with the built-in commands.
    pub fn new(config: Config, store: Arc<dyn Store>) -> Result<Arc<Self>, ConnectionError> {
        Self::with_registry(config, store, Registry::with_builtins())
    }

    /// A disconnected session with a caller-supplied registry.
    pub fn with_registry(
        config: Config,
        store: Arc<dyn Store>,
        registry: Registry,
    ) -> Result<Arc<Self>, ConnectionError> {
        let http = crate::links::http_client().map_err(|e| ConnectionError::Http(e.to_string()))?;
        let nick = config.bot.nick.clone();
        let master_nick = config.bot.master_nick().to_string();
        let master_prefix = config.bot.master_prefix().map(str::to_string);
        let auth = AuthTracker::new(
            config.bot.auth_mode,
            config.bot.identity_service.clone(),
            nick.clone(),
            master_nick.clone(),
        );

        Ok(Arc::new(Self {
            settings: RwLock::new(Settings::from_config(&config)),
            config: Arc::new(config),
            nick,
            master_nick,
            master_prefix,
            registry,
            auth,
            store,
            http,
            lifecycle: Mutex::new(Lifecycle::new()),
            writer: Mutex::new(None),
            since: Mutex::new(None),
            joined: AtomicBool::new(false),
            shutdown: CancellationToken::new(),
            exit_reason: Mutex::new(None),
            sasl: Mutex::new(SaslState::Disabled),
        }))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Our nickname.
    pub fn nick(&self) -> &str {
        &self.nick
    }

    pub fn master_nick(&self) -> &str {
        &self.master_nick
    }

    /// Sub-prefix marking privileged commands, if configured.
    pub fn master_prefix(&self) -> Option<&str> {
        self.master_prefix.as_deref()
    }

    pub fn auth(&self) -> &AuthTracker {
        &self.auth
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Snapshot of the runtime settings.
    pub fn settings(&self) -> Settings {
        self.settings.read().clone()
    }

    pub fn command_prefix(&self) -> String {
        self.settings.read().command_prefix.clone()
    }

    pub fn set_command_prefix(&self, prefix: impl Into<String>) {
        self.settings.write().command_prefix = prefix.into();
    }

    pub fn set_feature(&self, feature: Feature, on: bool) {
        let mut settings = self.settings.write();
        match feature {
            Feature::Links => settings.links = on,
            Feature::Define => settings.define = on,
            Feature::History => settings.history = on,
            Feature::Karma => settings.karma = on,
        }
    }

    /// Flip outbound PRIVMSG suppression, returning true when now muted.
    /// Without a socket there is nothing to mute and this returns false.
    pub fn toggle_mute(&self) -> bool {
        match self.writer.lock().as_ref() {
            Some(writer) => writer.toggle_muted(),
            None => false,
        }
    }

    pub fn is_muted(&self) -> bool {
        self.writer
            .lock()
            .as_ref()
            .is_some_and(|writer| writer.is_muted())
    }

    /// Time since the socket opened.
    pub fn connected_for(&self) -> Option<Duration> {
        self.since.lock().map(|at| at.elapsed())
    }

    pub fn state(&self) -> ConnState {
        self.lifecycle.lock().state()
    }

    /// True once [`Connection::close`] has started.
    pub fn is_closing(&self) -> bool {
        self.state().is_closing()
    }

    /// Why the session ended, once it has.
    pub fn exit_reason(&self) -> Option<ExitReason> {
        *self.exit_reason.lock()
    }

    /// Cancelled when the connection starts closing.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    fn current_writer(&self) -> Result<LineWriter, TransportError> {
        self.writer.lock().clone().ok_or(TransportError::NotConnected)
    }

    /// Write one raw line.
    pub async fn write(&self, line: &str) -> Result<usize, TransportError> {
        let writer = self.current_writer()?;
        debug!(line = %line.trim_end(), "send");
        writer.write(line).await
    }

    /// Encode and send a PRIVMSG.
    pub async fn send(&self, msg: &ParsedMessage) -> Result<usize, TransportError> {
        let line = msg.encode();
        if line.len() + 2 > MAX_OUTBOUND_LEN {
            warn!(len = line.len(), to = %msg.to, "outbound line exceeds 512 bytes");
        }
        self.write(&line).await
    }

    /// Reply to `msg`: in the channel for channel traffic, to the sender
    /// otherwise. Empty text is dropped.
    pub async fn reply(&self, msg: &ParsedMessage, text: &str) -> Result<(), TransportError> {
        if text.is_empty() {
            return Ok(());
        }
        self.send(&ParsedMessage::outbound(msg.reply_target(), text))
            .await?;
        Ok(())
    }

    /// Message the master directly.
    pub async fn send_master(&self, text: &str) -> Result<(), TransportError> {
        if text.is_empty() {
            return Ok(());
        }
        self.send(&ParsedMessage::outbound(self.master_nick.as_str(), text))
            .await?;
        Ok(())
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("host", &self.config.server.host)
            .field("nick", &self.nick)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
