//! Command-line interface for the `ircb` binary.
//!
//! Flags override the config file; `ADDR`, `NICK` and `MASTER` in the
//! environment override it too.

use std::path::PathBuf;

use clap::Parser;
use ircb::auth::AuthMode;
use ircb::config::Config;

#[derive(Parser, Debug)]
#[command(name = "ircb", version, about = "Single-connection IRC bot")]
pub struct Cli {
    /// TOML config file. A missing `config.toml` means built-in defaults.
    #[arg(value_name = "CONFIG")]
    pub config: Option<PathBuf>,

    /// Server address, host:port.
    #[arg(long, env = "ADDR")]
    pub host: Option<String>,

    #[arg(long, env = "NICK")]
    pub nick: Option<String>,

    /// Master identity and privileged prefix, name:prefix.
    #[arg(long, env = "MASTER")]
    pub master: Option<String>,

    /// Public command prefix.
    #[arg(long)]
    pub prefix: Option<String>,

    /// Comma separated channels to join.
    #[arg(long)]
    pub channels: Option<String>,

    /// Connect with TLS.
    #[arg(long, overrides_with = "no_tls")]
    pub tls: bool,

    /// Connect without TLS.
    #[arg(long, overrides_with = "tls")]
    pub no_tls: bool,

    /// Skip server certificate validation.
    #[arg(long)]
    pub insecure: bool,

    /// acc, status or disabled.
    #[arg(long)]
    pub auth_mode: Option<AuthMode>,

    #[arg(long)]
    pub no_karma: bool,

    #[arg(long)]
    pub no_define: bool,

    #[arg(long)]
    pub no_history: bool,

    /// Fetch titles for posted links.
    #[arg(long)]
    pub links: bool,

    /// Debug logging.
    #[arg(short, long)]
    pub verbose: bool,

    /// Log as JSON lines.
    #[arg(long)]
    pub log_json: bool,
}

impl Cli {
    /// Apply flag overrides on top of a loaded config.
    pub fn apply(&self, config: &mut Config) {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(nick) = &self.nick {
            config.bot.nick = nick.clone();
        }
        if let Some(master) = &self.master {
            config.bot.master = master.clone();
        }
        if let Some(prefix) = &self.prefix {
            config.bot.command_prefix = prefix.clone();
        }
        if let Some(channels) = &self.channels {
            config.bot.channels = channels.clone();
        }
        if self.tls {
            config.server.tls = true;
        }
        if self.no_tls {
            config.server.tls = false;
        }
        if self.insecure {
            config.server.verify_cert = false;
        }
        if let Some(mode) = self.auth_mode {
            config.bot.auth_mode = mode;
        }
        if self.no_karma {
            config.features.karma = false;
        }
        if self.no_define {
            config.features.define = false;
        }
        if self.no_history {
            config.features.history = false;
        }
        if self.links {
            config.features.links = true;
        }
        if self.verbose {
            config.features.verbose = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("ircb").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_overrides_applied() {
        let cli = parse(&[
            "bot.toml",
            "--host",
            "irc.example.net:6667",
            "--no-tls",
            "--auth-mode",
            "status",
            "--no-karma",
            "--links",
        ]);
        assert_eq!(cli.config.as_deref(), Some(std::path::Path::new("bot.toml")));

        let mut config = Config::default();
        cli.apply(&mut config);
        assert_eq!(config.server.host, "irc.example.net:6667");
        assert!(!config.server.tls);
        assert_eq!(config.bot.auth_mode, AuthMode::Status);
        assert!(!config.features.karma);
        assert!(config.features.links);
        assert!(config.features.define);
    }

    #[test]
    fn test_last_tls_flag_wins() {
        let cli = parse(&["--no-tls", "--tls"]);
        assert!(cli.tls);
        assert!(!cli.no_tls);
    }

    #[test]
    fn test_rejects_bad_auth_mode() {
        assert!(Cli::try_parse_from(["ircb", "--auth-mode", "sometimes"]).is_err());
    }
}
