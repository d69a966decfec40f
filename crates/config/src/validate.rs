//! Semantic checks on a loaded configuration.

use crate::schema::MapionConfig;

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Dotted path, e.g. "registry.auth_url"
    pub path: String,
    pub message: String,
}

/// Result of validating a configuration.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Count diagnostics by severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }
}

/// Validate a loaded config.
///
/// A missing bot token is an error (the bot cannot connect). Missing registry
/// settings are warnings: the bot still runs, but every lookup reports the
/// registry as unavailable.
#[must_use]
pub fn validate(config: &MapionConfig) -> ValidationResult {
    let mut diagnostics = Vec::new();

    if !config.telegram.has_token() {
        diagnostics.push(Diagnostic {
            severity: Severity::Error,
            path: "telegram.token".into(),
            message: "telegram bot token is required (set MAPION_BOT_TOKEN)".into(),
        });
    }

    for field in config.registry.missing_fields() {
        diagnostics.push(Diagnostic {
            severity: Severity::Warning,
            path: format!("registry.{field}"),
            message: "not configured; plate lookups will report the registry as unavailable"
                .into(),
        });
    }

    let registry = &config.registry;
    for (field, value) in [
        ("token_ttl_secs", registry.token_ttl_secs),
        ("auth_timeout_secs", registry.auth_timeout_secs),
        ("lookup_timeout_secs", registry.lookup_timeout_secs),
    ] {
        if value == 0 {
            diagnostics.push(Diagnostic {
                severity: Severity::Error,
                path: format!("registry.{field}"),
                message: "must be greater than zero".into(),
            });
        }
    }

    if config.session.idle_timeout_secs == 0 {
        diagnostics.push(Diagnostic {
            severity: Severity::Error,
            path: "session.idle_timeout_secs".into(),
            message: "must be greater than zero".into(),
        });
    }

    for (field, url) in [
        ("auth_url", registry.auth_url.as_deref()),
        ("consulta_url", registry.consulta_url.as_deref()),
    ] {
        if let Some(url) = url
            && !url.trim().is_empty()
            && !(url.starts_with("http://") || url.starts_with("https://"))
        {
            diagnostics.push(Diagnostic {
                severity: Severity::Error,
                path: format!("registry.{field}"),
                message: format!("expected an http(s) URL, got {url:?}"),
            });
        }
    }

    ValidationResult { diagnostics }
}

#[cfg(test)]
mod tests {
    use {super::*, secrecy::Secret};

    fn complete() -> MapionConfig {
        let mut cfg = MapionConfig::default();
        cfg.telegram.token = Secret::new("123:ABC".into());
        cfg.registry.auth_url = Some("https://api.example.com/auth".into());
        cfg.registry.consulta_url = Some("https://api.example.com/consulta".into());
        cfg.registry.username = Some("operador".into());
        cfg.registry.password = Some(Secret::new("segredo".into()));
        cfg
    }

    #[test]
    fn complete_config_has_no_diagnostics() {
        let result = validate(&complete());
        assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
    }

    #[test]
    fn empty_config_requires_bot_token() {
        let result = validate(&MapionConfig::default());
        assert!(result.has_errors());
        assert_eq!(result.count(Severity::Error), 1);
        assert_eq!(result.count(Severity::Warning), 4);
        assert!(
            result
                .diagnostics
                .iter()
                .any(|d| d.path == "telegram.token")
        );
    }

    #[test]
    fn missing_registry_settings_are_warnings_only() {
        let mut cfg = complete();
        cfg.registry.password = None;
        let result = validate(&cfg);
        assert!(!result.has_errors());
        assert_eq!(result.count(Severity::Warning), 1);
        assert_eq!(result.diagnostics[0].path, "registry.password");
    }

    #[test]
    fn zero_timeouts_are_errors() {
        let mut cfg = complete();
        cfg.registry.lookup_timeout_secs = 0;
        cfg.session.idle_timeout_secs = 0;
        let result = validate(&cfg);
        assert_eq!(result.count(Severity::Error), 2);
    }

    #[test]
    fn non_http_url_is_error() {
        let mut cfg = complete();
        cfg.registry.consulta_url = Some("ftp://api.example.com".into());
        let result = validate(&cfg);
        assert!(result.has_errors());
        assert_eq!(result.diagnostics[0].path, "registry.consulta_url");
    }
}
