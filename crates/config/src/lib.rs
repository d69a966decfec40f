//! Configuration loading, env substitution, environment overrides and
//! validation for mapion.
//!
//! Config files: `mapion.toml`, `mapion.yaml`, or `mapion.json`
//! Searched in `./` then `~/.config/mapion/`.
//!
//! Supports `${ENV_VAR}` substitution in all string values, and `MAPION_*`
//! environment variables override whatever the file provides.

pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    error::{Error, Result},
    loader::{
        apply_env_overrides, config_dir, discover_and_load, find_config_file, load_config,
    },
    schema::{MapionConfig, RegistryConfig, SessionConfig, TelegramConfig},
    validate::{Diagnostic, Severity, ValidationResult, validate},
};
