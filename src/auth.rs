//! Master authentication.
//!
//! The master is trusted for [`TRUST_WINDOW`] after the identity service
//! acknowledges them. Acknowledgments arrive as NOTICEs whose shape depends
//! on the configured [`AuthMode`].

use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use ircb_proto::{ParsedMessage, encode_privmsg};
use parking_lot::Mutex;
use serde::Deserialize;
use tracing::{debug, info};

/// How long an acknowledgment keeps the master trusted.
pub const TRUST_WINDOW: Duration = Duration::from_secs(5 * 60);

/// How the identity service is asked about the master.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// `ACC <nick>`, acknowledged with `<nick> ACC 3`.
    #[default]
    Acc,
    /// `STATUS <nick>`, acknowledged with `STATUS <nick> 1`.
    Status,
    /// No identity check; the master is always trusted.
    Disabled,
}

impl FromStr for AuthMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "acc" => Ok(Self::Acc),
            "status" => Ok(Self::Status),
            "disabled" | "none" | "off" => Ok(Self::Disabled),
            other => Err(format!("unknown auth mode '{other}' (acc, status, disabled)")),
        }
    }
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Acc => "acc",
            Self::Status => "status",
            Self::Disabled => "disabled",
        })
    }
}

/// Tracks when the master last proved their identity.
#[derive(Debug)]
pub struct AuthTracker {
    mode: AuthMode,
    service: String,
    nick: String,
    master: String,
    last: Mutex<Option<Instant>>,
}

impl AuthTracker {
    /// `service` is the identity service nick, `nick` our own nick and
    /// `master` the master's nick.
    pub fn new(
        mode: AuthMode,
        service: impl Into<String>,
        nick: impl Into<String>,
        master: impl Into<String>,
    ) -> Self {
        Self {
            mode,
            service: service.into(),
            nick: nick.into(),
            master: master.into(),
            last: Mutex::new(None),
        }
    }

    pub fn mode(&self) -> AuthMode {
        self.mode
    }

    /// Nick of the identity service.
    pub fn service(&self) -> &str {
        &self.service
    }

    /// True while the last acknowledgment is younger than [`TRUST_WINDOW`].
    pub fn is_trusted(&self) -> bool {
        self.is_trusted_at(Instant::now())
    }

    pub fn is_trusted_at(&self, now: Instant) -> bool {
        if self.mode == AuthMode::Disabled {
            return true;
        }
        match *self.last.lock() {
            Some(at) => now.saturating_duration_since(at) < TRUST_WINDOW,
            None => false,
        }
    }

    /// When the master was last acknowledged.
    pub fn last_authenticated(&self) -> Option<Instant> {
        *self.last.lock()
    }

    /// Mark the master as acknowledged at `at`.
    pub fn authenticate_at(&self, at: Instant) {
        *self.last.lock() = Some(at);
    }

    /// Feed a NOTICE from the identity service. Returns true when it
    /// acknowledged the master.
    pub fn observe_notice(&self, msg: &ParsedMessage) -> bool {
        let acknowledged = match self.mode {
            AuthMode::Acc => {
                let expected = format!(
                    "{svc}!{svc}@services. NOTICE {nick} :{master} ACC 3",
                    svc = self.service,
                    nick = self.nick,
                    master = self.master,
                );
                msg.raw.trim_start_matches(':') == expected
            }
            AuthMode::Status => msg.message.trim_end() == format!("STATUS {} 1", self.master),
            AuthMode::Disabled => true,
        };

        if acknowledged {
            self.authenticate_at(Instant::now());
            info!(master = %self.master, mode = %self.mode, "master authenticated");
        } else {
            debug!(line = %msg.raw, "identity notice ignored");
        }
        acknowledged
    }

    /// The line asking the identity service about the master, if the mode
    /// asks at all.
    pub fn challenge(&self) -> Option<String> {
        let query = match self.mode {
            AuthMode::Acc => format!("ACC {}", self.master),
            AuthMode::Status => format!("STATUS {}", self.master),
            AuthMode::Disabled => return None,
        };
        Some(encode_privmsg(&self.service, &query))
    }
}
