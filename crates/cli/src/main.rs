mod config;

use anyhow::Result;
use brokersync_api::AppState;
use brokersync_core::BrokerKind;
use brokersync_data::TokenStore;
use brokersync_engine::{BrokerAdapters, SyncOrchestrator};
use clap::{Parser, Subcommand, ValueEnum};
use config::{AppConfig, Overrides};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "brokersync")]
#[command(about = "Broker trade sync: log in to a broker and pull normalized trades")]
#[command(version)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Log output format
    #[arg(long, value_enum, default_value = "text")]
    log_format: LogFormat,

    /// Path to a TOML config file
    #[arg(short, long, env = "BROKERSYNC_CONFIG")]
    config: Option<PathBuf>,

    /// Kite Connect API key
    #[arg(long, env = "ZERODHA_API_KEY", hide_env_values = true)]
    zerodha_api_key: Option<String>,

    /// Kite Connect API secret
    #[arg(long, env = "ZERODHA_API_SECRET", hide_env_values = true)]
    zerodha_api_secret: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API server
    Serve {
        /// Bind address (overrides PORT and the config file)
        #[arg(short, long)]
        bind: Option<String>,

        /// Port to listen on, on all interfaces
        #[arg(long, env = "PORT")]
        port: Option<u16>,

        /// Comma separated CORS origins
        #[arg(long, env = "ALLOWED_ORIGINS", value_delimiter = ',')]
        allowed_origins: Vec<String>,
    },

    /// Print the Kite login URL
    LoginUrl,

    /// Run one sync against a fresh in-process token store
    Sync {
        /// User id
        #[arg(short, long)]
        user: String,

        /// Broker name (e.g. "mock", "zerodha-real")
        #[arg(short, long, default_value = "mock")]
        broker: String,

        /// Log in to the mock broker before syncing
        #[arg(long)]
        mock_login: bool,
    },

    /// List supported brokers and what they can do
    Brokers,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    match cli.log_format {
        LogFormat::Text => fmt().with_env_filter(filter).with_target(false).init(),
        LogFormat::Json => fmt().json().with_env_filter(filter).init(),
    }

    let mut config = AppConfig::load(cli.config.as_deref())?;
    let mut overrides = Overrides {
        zerodha_api_key: cli.zerodha_api_key,
        zerodha_api_secret: cli.zerodha_api_secret,
        ..Default::default()
    };

    match cli.command {
        Commands::Serve {
            bind,
            port,
            allowed_origins,
        } => {
            overrides.bind = bind;
            overrides.port = port;
            overrides.allowed_origins = allowed_origins;
            config.apply(overrides);
            serve(config).await?;
        }
        Commands::LoginUrl => {
            config.apply(overrides);
            if config.zerodha.api_key.is_empty() {
                tracing::warn!("ZERODHA_API_KEY is not set, the login URL will be rejected by Kite");
            }
            println!("{}", orchestrator(&config)?.login_url());
        }
        Commands::Sync {
            user,
            broker,
            mock_login,
        } => {
            config.apply(overrides);
            sync_once(&config, &user, &broker, mock_login).await?;
        }
        Commands::Brokers => {
            println!("Supported brokers:");
            for kind in BrokerKind::ALL {
                let caps = kind.capabilities();
                println!(
                    "  {:<14} expiry: {:?}, refresh: {:?}",
                    kind.tag(),
                    caps.expiry,
                    caps.refresh
                );
            }
        }
    }

    Ok(())
}

fn orchestrator(config: &AppConfig) -> Result<SyncOrchestrator> {
    let adapters = BrokerAdapters::new(config.zerodha.clone(), config.mock.clone())?;
    Ok(SyncOrchestrator::new(Arc::new(TokenStore::new()), adapters))
}

async fn serve(config: AppConfig) -> Result<()> {
    let orchestrator = Arc::new(orchestrator(&config)?);
    let state = Arc::new(AppState::new(orchestrator));

    tracing::info!(
        bind = %config.server.bind,
        origins = ?config.server.allowed_origins,
        "Starting broker sync server"
    );
    brokersync_api::start_server(state, &config.server.bind, &config.server.allowed_origins).await
}

async fn sync_once(config: &AppConfig, user: &str, broker: &str, mock_login: bool) -> Result<()> {
    let orchestrator = orchestrator(config)?;

    if mock_login {
        let kind: BrokerKind = broker.parse()?;
        if kind != BrokerKind::Mock {
            anyhow::bail!("--mock-login only applies to the mock broker, not {}", kind);
        }
        let token = orchestrator.mock_login(user).await;
        tracing::info!(user_id = %token.user_id, expires_at = %token.expires_at, "Mock login complete");
    }

    let trades = orchestrator.sync_trades(user, broker).await?;
    println!("{}", serde_json::to_string_pretty(&trades)?);
    tracing::info!(count = trades.len(), "Sync complete");
    Ok(())
}
