mod config_commands;

use std::{path::PathBuf, sync::Arc};

use {
    anyhow::Context,
    chatnest_config::{ChatnestConfig, Severity},
    chatnest_gateway::McpDispatcher,
    chatnest_inbox::InboxService,
    clap::{Parser, Subcommand},
    tracing::{error, info, warn},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "chatnest", about = "Chatnest: unified Gmail, Slack and Telegram inbox")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Address to bind to (overrides config value).
    #[arg(long, global = true)]
    bind: Option<String>,
    /// Port to listen on (overrides config value).
    #[arg(long, global = true)]
    port: Option<u16>,
    /// Explicit config file instead of the usual search path.
    #[arg(long, global = true, env = "CHATNEST_CONFIG")]
    config: Option<PathBuf>,
    /// Serve demo data for every provider regardless of credentials.
    #[arg(long, global = true, default_value_t = false)]
    force_mock: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway (default when no subcommand is provided).
    Serve,
    /// Serve MCP JSON-RPC over stdin/stdout.
    Mcp,
    /// Configuration inspection.
    Config {
        #[command(subcommand)]
        action: config_commands::ConfigAction,
    },
}

/// Initialise tracing. Logs always go to stderr so that `mcp` keeps stdout
/// for protocol frames.
fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

/// Effective config: file (explicit or discovered), then environment, then
/// command-line flags.
fn load_config(cli: &Cli) -> anyhow::Result<ChatnestConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let mut cfg = chatnest_config::load_config(path)
                .with_context(|| format!("loading {}", path.display()))?;
            chatnest_config::apply_env_overrides(&mut cfg);
            cfg
        },
        None => chatnest_config::discover_and_load(),
    };
    if let Some(bind) = &cli.bind {
        config.server.bind.clone_from(bind);
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if cli.force_mock {
        config.force_mock = true;
    }
    Ok(config)
}

fn log_diagnostics(config: &ChatnestConfig) {
    for d in chatnest_config::validate::validate(config).diagnostics {
        match d.severity {
            Severity::Error => error!(path = %d.path, category = d.category, "{}", d.message),
            Severity::Warning => warn!(path = %d.path, category = d.category, "{}", d.message),
            Severity::Info => info!(path = %d.path, category = d.category, "{}", d.message),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_telemetry(&cli);

    let config = load_config(&cli)?;

    match cli.command {
        Some(Commands::Config { action }) => config_commands::handle_config(action, &config),
        // Default: start gateway when no subcommand is provided
        None | Some(Commands::Serve) => {
            info!(version = env!("CARGO_PKG_VERSION"), "chatnest starting");
            log_diagnostics(&config);
            let inbox = Arc::new(InboxService::from_config(&config));
            chatnest_gateway::start_gateway(&config, inbox).await
        },
        Some(Commands::Mcp) => {
            log_diagnostics(&config);
            let inbox = Arc::new(InboxService::from_config(&config));
            let dispatcher = McpDispatcher::new(inbox, env!("CARGO_PKG_VERSION"));
            chatnest_gateway::mcp::serve_stdio(&dispatcher).await
        },
    }
}
