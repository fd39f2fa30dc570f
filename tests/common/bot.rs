//! Start a bot against a [`FakeServer`].

use std::sync::Arc;

use ircb::auth::AuthMode;
use ircb::config::{Config, StoreBackend};
use ircb::error::ConnectionError;
use ircb::store::MemoryStore;
use ircb::{Connection, ExitReason};
use tokio::task::JoinHandle;

use super::server::{FakeServer, ServerSession};

pub const NICK: &str = "mustangsally";

/// Plain TCP, memory store, two channels, master `aerth:$`.
pub fn test_config(address: &str) -> Config {
    let mut config = Config::default();
    config.server.host = address.to_string();
    config.server.tls = false;
    config.bot.nick = NICK.to_string();
    config.bot.master = "aerth:$".to_string();
    config.bot.command_prefix = "!".to_string();
    config.bot.channels = "#one,,#two".to_string();
    config.bot.auth_mode = AuthMode::Acc;
    config.database.backend = StoreBackend::Memory;
    config
}

/// A running bot and the task driving its read loop.
pub struct TestBot {
    pub conn: Arc<Connection>,
    #[allow(dead_code)]
    pub server: FakeServer,
    handle: JoinHandle<Result<ExitReason, ConnectionError>>,
}

impl TestBot {
    /// Bind a server, start a bot with `configure` applied and accept it.
    /// Registration lines are left unread unless `registered` is used.
    pub async fn start<F>(configure: F) -> anyhow::Result<(Self, ServerSession)>
    where
        F: FnOnce(&mut Config),
    {
        let server = FakeServer::bind().await?;
        let mut config = test_config(&server.address());
        configure(&mut config);

        let conn = Connection::new(config, Arc::new(MemoryStore::new()))?;
        let runner = Arc::clone(&conn);
        let handle = tokio::spawn(async move { runner.connect().await });
        let session = server.accept().await?;

        Ok((
            Self {
                conn,
                server,
                handle,
            },
            session,
        ))
    }

    /// Start with defaults and consume the registration lines.
    pub async fn registered() -> anyhow::Result<(Self, ServerSession)> {
        let (bot, mut session) = Self::start(|_| {}).await?;
        session.expect_registration(NICK).await?;
        Ok((bot, session))
    }

    /// Start, register, and acknowledge the master with NickServ.
    #[allow(dead_code)]
    pub async fn with_master() -> anyhow::Result<(Self, ServerSession)> {
        let (bot, mut session) = Self::registered().await?;
        session
            .send(&format!(
                ":NickServ!NickServ@services. NOTICE {NICK} :aerth ACC 3"
            ))
            .await?;
        session.sync().await?;
        anyhow::ensure!(bot.conn.auth().is_trusted(), "master not trusted");
        Ok((bot, session))
    }

    /// Wait for `connect` to return.
    pub async fn finish(self) -> anyhow::Result<Result<ExitReason, ConnectionError>> {
        let result = tokio::time::timeout(std::time::Duration::from_secs(5), self.handle).await??;
        Ok(result)
    }
}
