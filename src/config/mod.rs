//! Configuration loading and management.
//!
//! This module is split into logical submodules:
//! - [`types`]: config struct definitions and loading
//! - [`defaults`]: serde default values
//! - [`validation`]: startup checks that report every problem at once

mod defaults;
mod types;
mod validation;

pub use types::{
    BotConfig, Config, ConfigError, ControlConfig, DatabaseConfig, FeaturesConfig, ServerConfig,
    StoreBackend,
};
pub use validation::{ValidationError, validate};
