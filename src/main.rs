use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use leli_notification_server::notifications::{NotificationService, SqliteNotificationStore};
use leli_notification_server::server::{
    run_server, RequestsLoggingLevel, ServerConfig, StaticTokenIdentity,
};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

fn parse_token_pair(s: &str) -> Result<(String, String)> {
    match s.split_once('=') {
        Some((token, user_id)) if !token.is_empty() && !user_id.is_empty() => {
            Ok((token.to_string(), user_id.to_string()))
        }
        _ => bail!("Expected token=user_id, got: {}", s),
    }
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to the SQLite notifications database file.
    #[clap(value_parser = parse_path)]
    pub notifications_db: PathBuf,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3005)]
    pub port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Maximum notifications retained per user; the oldest read ones are
    /// evicted first when exceeded.
    #[clap(long, default_value_t = 100)]
    pub user_cap: usize,

    /// Auth token mapping as token=user_id, repeatable.
    #[clap(long = "token", value_parser = parse_token_pair)]
    pub tokens: Vec<(String, String)>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()?;

    info!(
        "Opening SQLite notifications database at {:?}...",
        cli_args.notifications_db
    );
    let store = Arc::new(SqliteNotificationStore::with_user_cap(
        &cli_args.notifications_db,
        cli_args.user_cap,
    )?);

    let service = Arc::new(NotificationService::new(store));
    let identity_provider = Arc::new(StaticTokenIdentity::new(cli_args.tokens));

    let config = ServerConfig {
        port: cli_args.port,
        requests_logging_level: cli_args.logging_level,
    };

    info!("Ready to serve at port {}!", config.port);
    run_server(config, service, identity_provider).await
}
