use std::path::{Path, PathBuf};

use {
    anyhow::{Context, Result},
    clap::Subcommand,
    mapion_config::{MapionConfig, Severity, ValidationResult},
};

#[derive(Clone, Copy, Subcommand)]
pub enum ConfigAction {
    /// Validate the configuration and report errors/warnings.
    Check,
    /// Print the effective configuration with secrets redacted.
    Show,
    /// Print which config file would be loaded.
    Path,
}

/// Load the configuration from `explicit` if given, otherwise from the
/// standard locations. Environment overrides apply in both cases.
pub fn load(explicit: Option<&Path>) -> Result<(MapionConfig, Option<PathBuf>)> {
    match explicit {
        Some(path) => {
            let config = mapion_config::load_config(path)
                .with_context(|| format!("loading {}", path.display()))?;
            let config = mapion_config::apply_env_overrides(config)?;
            Ok((config, Some(path.to_path_buf())))
        },
        None => {
            let path = mapion_config::find_config_file();
            let config = mapion_config::discover_and_load()?;
            Ok((config, path))
        },
    }
}

pub fn handle_config(action: ConfigAction, explicit: Option<&Path>) -> Result<()> {
    let (config, path) = load(explicit)?;
    match action {
        ConfigAction::Check => check(&config, path.as_deref()),
        ConfigAction::Show => {
            println!("{config:#?}");
            Ok(())
        },
        ConfigAction::Path => {
            match path {
                Some(path) => println!("{}", path.display()),
                None => println!("no config file found; using defaults and environment"),
            }
            Ok(())
        },
    }
}

/// ANSI color codes.
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

fn check(config: &MapionConfig, path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => eprintln!("Checking {}\n", path.display()),
        None => eprintln!("No config file found; checking defaults and environment.\n"),
    }

    let result = mapion_config::validate(config);
    for line in render(&result) {
        eprintln!("{line}");
    }

    let errors = result.count(Severity::Error);
    let warnings = result.count(Severity::Warning);
    if errors == 0 && warnings == 0 {
        eprintln!("No issues found.");
    } else {
        eprintln!("\n{errors} error(s), {warnings} warning(s)");
    }

    if result.has_errors() {
        anyhow::bail!("configuration is invalid");
    }
    Ok(())
}

/// One colored line per diagnostic.
pub fn render(result: &ValidationResult) -> Vec<String> {
    result
        .diagnostics
        .iter()
        .map(|d| {
            let color = match d.severity {
                Severity::Error => RED,
                Severity::Warning => YELLOW,
            };
            format!(
                "  {BOLD}{color}{}{RESET} {}: {}",
                d.severity, d.path, d.message
            )
        })
        .collect()
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_path_is_loaded_and_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mapion.toml");
        std::fs::write(
            &path,
            r#"
[telegram]
token = "123:ABC"

[registry]
auth_url = "https://api.example.com/auth"
consulta_url = "https://api.example.com/consulta"
username = "operador"
password = "segredo"

[session]
idle_timeout_secs = 120
"#,
        )
        .unwrap();

        let (config, loaded_from) = load(Some(path.as_path())).unwrap();

        assert_eq!(loaded_from.as_deref(), Some(path.as_path()));
        assert_eq!(config.session.idle_timeout_secs, 120);
        assert!(config.telegram.has_token());
        assert!(check(&config, Some(path.as_path())).is_ok());
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        let err = load(Some(missing.as_path())).unwrap_err();
        assert!(err.to_string().contains("absent.toml"));
    }

    #[test]
    fn render_marks_severity_and_path() {
        let mut config = MapionConfig::default();
        config.session.idle_timeout_secs = 0;
        let lines = render(&mapion_config::validate(&config));

        assert!(
            lines
                .iter()
                .any(|l| l.contains("error") && l.contains("session.idle_timeout_secs"))
        );
        assert!(
            lines
                .iter()
                .any(|l| l.contains("warning") && l.contains("registry."))
        );
    }
}
