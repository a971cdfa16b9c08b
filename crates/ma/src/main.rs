mod config;

use clap::{Parser, Subcommand};
use config::{Config, Overrides};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_LOG_FILTER: &str = "ma=info,ma_serve=info,ma_core=info,tower_http=info";

#[derive(Parser)]
#[command(name = "ma", about = "Mutual aid offer and request lifecycle service")]
struct Cli {
    /// Optional TOML file layered between the defaults and the environment.
    #[arg(long, global = true, env = "MUTUAL_AID_CONFIG")]
    config: Option<PathBuf>,
    #[command(flatten)]
    overrides: Overrides,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API and the notification dispatcher.
    Serve,
    /// Create or update the database schema and exit.
    Migrate,
    /// Print the OpenAPI document.
    Openapi,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = match Config::load(cli.config.as_deref(), &cli.overrides) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("config error: {err}");
            return ExitCode::FAILURE;
        }
    };
    init_tracing(config.log_json);

    match cli.command {
        Command::Serve => serve(config).await,
        Command::Migrate => match migrate(&config.db_path) {
            Ok(()) => {
                tracing::info!(db_path = %config.db_path, "schema up to date");
                ExitCode::SUCCESS
            }
            Err(err) => {
                tracing::error!(db_path = %config.db_path, error = %err, "migration failed");
                ExitCode::FAILURE
            }
        },
        Command::Openapi => {
            println!("{}", ma_serve::openapi::generate_spec());
            ExitCode::SUCCESS
        }
    }
}

async fn serve(config: Config) -> ExitCode {
    if let Err(err) = migrate(&config.db_path) {
        tracing::error!(db_path = %config.db_path, error = %err, "failed to prepare database");
        return ExitCode::FAILURE;
    }
    let state = ma_serve::AppState::new(
        config.db_path.clone(),
        config.notification_capacity,
        config.profile_cache_ttl(),
    );
    let addr = SocketAddr::new(config.bind, config.port);
    match ma_serve::serve(state, addr).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(%addr, error = %err, "server stopped");
            ExitCode::FAILURE
        }
    }
}

fn migrate(db_path: &str) -> Result<(), String> {
    if let Some(parent) = Path::new(db_path).parent() {
        std::fs::create_dir_all(parent).map_err(|err| err.to_string())?;
    }
    ma_db::schema::open_and_migrate(db_path)
        .map(|_| ())
        .map_err(|err| err.to_string())
}

fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(false)
                    .with_span_list(false),
            )
            .init();
    } else {
        registry.with(fmt::layer()).init();
    }
}
