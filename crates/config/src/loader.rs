use std::path::{Path, PathBuf};

use {
    secrecy::Secret,
    tracing::{debug, warn},
};

use crate::{
    env_subst::substitute_env,
    error::{Error, Result},
    schema::MapionConfig,
};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &["mapion.toml", "mapion.yaml", "mapion.yml", "mapion.json"];

pub const ENV_BOT_TOKEN: &str = "MAPION_BOT_TOKEN";
pub const ENV_AUTH_URL: &str = "MAPION_AUTH_URL";
pub const ENV_CONSULTA_URL: &str = "MAPION_CONSULTA_URL";
pub const ENV_API_USERNAME: &str = "MAPION_API_USERNAME";
pub const ENV_API_PASSWORD: &str = "MAPION_API_PASSWORD";
pub const ENV_SESSION_IDLE_SECS: &str = "MAPION_SESSION_IDLE_SECS";

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> Result<MapionConfig> {
    let raw = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.display().to_string(),
        source,
    })?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config from standard locations, then apply `MAPION_*`
/// environment overrides.
///
/// Search order:
/// 1. `./mapion.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/mapion/mapion.{toml,yaml,yml,json}` (user-global)
///
/// Falls back to `MapionConfig::default()` when no file is found or the file
/// fails to parse; environment overrides are applied either way.
pub fn discover_and_load() -> Result<MapionConfig> {
    let config = match find_config_file() {
        Some(path) => {
            debug!(path = %path.display(), "loading config");
            match load_config(&path) {
                Ok(cfg) => cfg,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
                    MapionConfig::default()
                },
            }
        },
        None => {
            debug!("no config file found, using defaults");
            MapionConfig::default()
        },
    };
    apply_env_overrides(config)
}

/// Overlay `MAPION_*` environment variables on top of `config`.
pub fn apply_env_overrides(config: MapionConfig) -> Result<MapionConfig> {
    apply_env_overrides_with(config, |name| std::env::var(name).ok())
}

fn apply_env_overrides_with(
    mut config: MapionConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<MapionConfig> {
    let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(token) = var(ENV_BOT_TOKEN) {
        config.telegram.token = Secret::new(token);
    }
    if let Some(url) = var(ENV_AUTH_URL) {
        config.registry.auth_url = Some(url);
    }
    if let Some(url) = var(ENV_CONSULTA_URL) {
        config.registry.consulta_url = Some(url);
    }
    if let Some(username) = var(ENV_API_USERNAME) {
        config.registry.username = Some(username);
    }
    if let Some(password) = var(ENV_API_PASSWORD) {
        config.registry.password = Some(Secret::new(password));
    }
    if let Some(raw) = var(ENV_SESSION_IDLE_SECS) {
        config.session.idle_timeout_secs =
            raw.trim().parse().map_err(|e| Error::InvalidEnv {
                var: ENV_SESSION_IDLE_SECS.into(),
                message: format!("{e}"),
            })?;
    }

    Ok(config)
}

/// Find the first config file in standard locations.
pub fn find_config_file() -> Option<PathBuf> {
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    let dir = config_dir()?;
    CONFIG_FILENAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.exists())
}

/// Returns the user-global config directory (`~/.config/mapion/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "mapion").map(|d| d.config_dir().to_path_buf())
}

fn parse_config(raw: &str, path: &Path) -> Result<MapionConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => Err(Error::UnsupportedFormat(ext.to_string())),
    }
}
