//! CLI argument parsing, validation, and startup helpers.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::ServerConfig;
use crate::db::Database;
use crate::email::Mailer;

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "accountd",
    about = "User accounts with opaque bearer-token sessions"
)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "3000")]
    pub port: u16,

    /// Path to SQLite database file, or ":memory:"
    #[arg(short, long, env = "DATABASE", default_value = "accountd.db")]
    pub database: String,

    /// Days a session token stays valid without being used
    #[arg(long, env = "SESSION_WINDOW_DAYS", default_value = "7",
        value_parser = clap::value_parser!(u64).range(1..))]
    pub session_window_days: u64,

    /// Seconds between expired-token sweeps
    #[arg(long, env = "CLEANUP_INTERVAL_SECS", default_value = "3600",
        value_parser = clap::value_parser!(u64).range(1..))]
    pub cleanup_interval_secs: u64,

    /// Directory for uploaded files
    #[arg(long, env = "UPLOAD_DIR", default_value = "uploads")]
    pub upload_dir: PathBuf,

    /// Client URL used in emailed links
    #[arg(long, env = "CLIENT_ORIGIN", default_value = "http://localhost:8080")]
    pub client_origin: String,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

impl Args {
    pub fn session_window(&self) -> Duration {
        Duration::from_secs(self.session_window_days * SECONDS_PER_DAY)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }
}

/// Initialize logging based on the specified format.
/// `RUST_LOG` selects levels, defaulting to `info`.
pub fn init_logging(format: &LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Pretty => builder.init(),
        LogFormat::Json => builder.json().init(),
        LogFormat::Compact => builder.compact().init(),
    }
}

/// Open the database, logging errors if it fails.
pub async fn open_database(path: &str) -> Option<Database> {
    match Database::open(path).await {
        Ok(db) => {
            info!(path = %path, "Database opened");
            Some(db)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            None
        }
    }
}

/// Build ServerConfig from validated arguments.
pub fn build_config(args: &Args, db: Database, mailer: Arc<dyn Mailer>) -> ServerConfig {
    ServerConfig {
        db,
        session_window: args.session_window(),
        cleanup_interval: args.cleanup_interval(),
        mailer,
        upload_dir: args.upload_dir.clone(),
        client_origin: args.client_origin.clone(),
    }
}
