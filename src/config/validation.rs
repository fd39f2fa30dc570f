//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use super::{Config, StoreBackend};
use std::path::Path;
use thiserror::Error;

/// Validation errors for configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("server.host must be host:port, got '{0}'")]
    InvalidHost(String),
    #[error("bot.nick is required")]
    MissingNick,
    #[error("bot.nick must not contain spaces or start with ':' or '#', got '{0}'")]
    InvalidNick(String),
    #[error("bot.master must be name:prefix with both parts set, got '{0}'")]
    InvalidMaster(String),
    #[error("bot.command_prefix is required")]
    MissingCommandPrefix,
    #[error("bot.identity_service is required")]
    MissingIdentityService,
    #[error("database.path parent directory does not exist: {0}")]
    DatabasePathInvalid(String),
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if ircb_proto::transport::split_host_port(&config.server.host).is_err() {
        errors.push(ValidationError::InvalidHost(config.server.host.clone()));
    }

    let nick = &config.bot.nick;
    if nick.is_empty() {
        errors.push(ValidationError::MissingNick);
    } else if nick.contains(' ') || nick.starts_with(':') || nick.starts_with('#') {
        errors.push(ValidationError::InvalidNick(nick.clone()));
    }

    let master = &config.bot.master;
    if config.bot.master_nick().is_empty() || config.bot.master_prefix().is_none() {
        errors.push(ValidationError::InvalidMaster(master.clone()));
    }

    if config.bot.command_prefix.is_empty() {
        errors.push(ValidationError::MissingCommandPrefix);
    }

    if config.bot.identity_service.is_empty() {
        errors.push(ValidationError::MissingIdentityService);
    }

    if config.database.backend == StoreBackend::Redb {
        let db_path = Path::new(&config.database.path);
        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            errors.push(ValidationError::DatabasePathInvalid(
                config.database.path.clone(),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
