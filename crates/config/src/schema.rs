use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MapionConfig {
    pub telegram: TelegramConfig,
    pub registry: RegistryConfig,
    pub session: SessionConfig,
}

/// Telegram bot settings.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Bot token from @BotFather.
    #[serde(serialize_with = "serialize_secret")]
    pub token: Secret<String>,

    /// Long-polling timeout passed to `getUpdates` (seconds).
    pub poll_timeout_secs: u32,
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("token", &"[REDACTED]")
            .field("poll_timeout_secs", &self.poll_timeout_secs)
            .finish()
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: Secret::new(String::new()),
            poll_timeout_secs: 30,
        }
    }
}

impl TelegramConfig {
    #[must_use]
    pub fn has_token(&self) -> bool {
        !self.token.expose_secret().trim().is_empty()
    }
}

/// Upstream plate registry settings.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Credential endpoint that issues bearer tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_url: Option<String>,

    /// Base URL for plate lookups; the plate is appended as the last path segment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consulta_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(
        serialize_with = "serialize_option_secret",
        skip_serializing_if = "Option::is_none"
    )]
    pub password: Option<Secret<String>>,

    /// How long an issued token is reused before re-authenticating.
    pub token_ttl_secs: u64,

    /// Timeout for each credential attempt.
    pub auth_timeout_secs: u64,

    /// Timeout for a single plate lookup.
    pub lookup_timeout_secs: u64,
}

impl std::fmt::Debug for RegistryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryConfig")
            .field("auth_url", &self.auth_url)
            .field("consulta_url", &self.consulta_url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("token_ttl_secs", &self.token_ttl_secs)
            .finish_non_exhaustive()
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            auth_url: None,
            consulta_url: None,
            username: None,
            password: None,
            token_ttl_secs: 30 * 60,
            auth_timeout_secs: 10,
            lookup_timeout_secs: 3,
        }
    }
}

impl RegistryConfig {
    /// Names of the required settings that are missing or blank.
    #[must_use]
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let blank = |v: &Option<String>| v.as_deref().is_none_or(|s| s.trim().is_empty());
        let mut missing = Vec::new();
        if blank(&self.auth_url) {
            missing.push("auth_url");
        }
        if blank(&self.consulta_url) {
            missing.push("consulta_url");
        }
        if blank(&self.username) {
            missing.push("username");
        }
        if self
            .password
            .as_ref()
            .is_none_or(|p| p.expose_secret().is_empty())
        {
            missing.push("password");
        }
        missing
    }
}

/// Search session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Idle window after the last query before the session expires.
    pub idle_timeout_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: 600,
        }
    }
}

fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

fn serialize_option_secret<S: serde::Serializer>(
    secret: &Option<Secret<String>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match secret {
        Some(s) => serializer.serialize_some(s.expose_secret()),
        None => serializer.serialize_none(),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let cfg = MapionConfig::default();
        assert!(!cfg.telegram.has_token());
        assert_eq!(cfg.telegram.poll_timeout_secs, 30);
        assert_eq!(cfg.registry.token_ttl_secs, 1800);
        assert_eq!(cfg.registry.auth_timeout_secs, 10);
        assert_eq!(cfg.registry.lookup_timeout_secs, 3);
        assert_eq!(cfg.session.idle_timeout_secs, 600);
    }

    #[test]
    fn deserialize_partial_toml() {
        let raw = r#"
            [telegram]
            token = "123:ABC"

            [registry]
            auth_url = "https://api.example.com/auth"
            username = "operador"
        "#;
        let cfg: MapionConfig = toml::from_str(raw).unwrap();
        assert_eq!(cfg.telegram.token.expose_secret(), "123:ABC");
        assert_eq!(
            cfg.registry.auth_url.as_deref(),
            Some("https://api.example.com/auth")
        );
        assert_eq!(cfg.registry.missing_fields(), vec!["consulta_url", "password"]);
        // defaults for unspecified fields
        assert_eq!(cfg.registry.lookup_timeout_secs, 3);
        assert_eq!(cfg.session.idle_timeout_secs, 600);
    }

    #[test]
    fn debug_redacts_secrets() {
        let cfg = MapionConfig {
            telegram: TelegramConfig {
                token: Secret::new("bot-secret".into()),
                ..Default::default()
            },
            registry: RegistryConfig {
                password: Some(Secret::new("hunter2".into())),
                ..Default::default()
            },
            ..Default::default()
        };
        let rendered = format!("{cfg:?}");
        assert!(!rendered.contains("bot-secret"));
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn blank_values_count_as_missing() {
        let cfg = RegistryConfig {
            auth_url: Some("  ".into()),
            consulta_url: Some("https://api.example.com/consulta".into()),
            username: Some("operador".into()),
            password: Some(Secret::new(String::new())),
            ..Default::default()
        };
        assert_eq!(cfg.missing_fields(), vec!["auth_url", "password"]);
    }
}
