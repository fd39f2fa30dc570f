//! Default value functions for configuration.
//!
//! These match the values the bot has always shipped with, so an empty
//! config file produces a working freenode-style setup.

/// Returns `true` (for serde defaults).
pub fn default_true() -> bool {
    true
}

// =============================================================================
// Server Defaults
// =============================================================================

pub fn default_host() -> String {
    "chat.freenode.net:6697".to_string()
}

// =============================================================================
// Bot Defaults
// =============================================================================

pub fn default_nick() -> String {
    "mustangsally".to_string()
}

pub fn default_master() -> String {
    "aerth:$".to_string()
}

pub fn default_command_prefix() -> String {
    "!".to_string()
}

pub fn default_channels() -> String {
    "##ircb".to_string()
}

pub fn default_identity_service() -> String {
    "NickServ".to_string()
}

// =============================================================================
// Database Defaults
// =============================================================================

pub fn default_database_path() -> String {
    "ircb.db".to_string()
}
