mod config_commands;

use std::{path::PathBuf, sync::Arc, time::Duration};

use {
    anyhow::Context,
    clap::{Parser, Subcommand},
    mapion_registry::{PlateLookup, RegistryClient},
    tracing::{info, warn},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use crate::config_commands::ConfigAction;

#[derive(Parser)]
#[command(name = "mapion", about = "Mapion: Telegram plate lookup bot", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file to load instead of searching the standard locations.
    #[arg(long, global = true, env = "MAPION_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the bot (default when no subcommand is provided).
    Run,
    /// Inspect or validate the configuration.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

async fn run_bot(cli: &Cli) -> anyhow::Result<()> {
    let (config, path) = config_commands::load(cli.config.as_deref())?;
    match &path {
        Some(path) => info!(path = %path.display(), "configuration loaded"),
        None => info!("no config file found, using defaults and environment"),
    }

    let validation = mapion_config::validate(&config);
    for d in &validation.diagnostics {
        warn!(severity = %d.severity, path = %d.path, "{}", d.message);
    }
    if validation.has_errors() {
        anyhow::bail!("invalid configuration; run `mapion config check` for details");
    }

    let registry = RegistryClient::from_config(&config.registry)
        .context("building registry client")?;
    let lookup: Arc<dyn PlateLookup> = Arc::new(registry);
    let idle_timeout = Duration::from_secs(config.session.idle_timeout_secs);

    let polling = mapion_telegram::start_polling(&config.telegram, lookup, idle_timeout)
        .await
        .context("starting telegram bot")?;
    let stopped = polling.cancel_token();

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("listening for ctrl-c")?;
            info!("shutdown requested");
        },
        () = stopped.cancelled() => {
            warn!("telegram polling stopped on its own");
        },
    }

    polling.shutdown().await;
    info!("mapion stopped");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_telemetry(&cli);

    match &cli.command {
        None | Some(Commands::Run) => {
            info!(version = env!("CARGO_PKG_VERSION"), "mapion starting");
            run_bot(&cli).await
        },
        Some(Commands::Config { action }) => {
            config_commands::handle_config(*action, cli.config.as_deref())
        },
    }
}
