pub mod api;
pub mod auth;
pub mod cleanup;
pub mod cli;
pub mod db;
pub mod email;
pub mod i18n;
pub mod password;
pub mod storage;
pub mod tokens;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use api::{create_api_router, render_errors};
use auth::authenticate;
use axum::{Router, middleware};
use db::Database;
use email::{EmailService, Mailer};
use storage::AvatarStorage;
use tokens::TokenService;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::{error, info};

pub struct ServerConfig {
    /// Database connection (cloneable, uses connection pool internally)
    pub db: Database,
    /// Idle time after which a session token stops verifying
    pub session_window: Duration,
    /// Time between expired-token sweeps
    pub cleanup_interval: Duration,
    /// Outgoing mail transport
    pub mailer: Arc<dyn Mailer>,
    /// Root of uploaded files; avatars live in its `profile` subdirectory
    pub upload_dir: PathBuf,
    /// Client URL used to build links in emails
    pub client_origin: String,
}

impl ServerConfig {
    pub fn token_service(&self) -> TokenService {
        TokenService::new(&self.db, self.session_window)
    }

    pub fn avatar_storage(&self) -> AvatarStorage {
        AvatarStorage::new(&self.upload_dir)
    }
}

/// Create the application router with the given configuration.
///
/// Every request passes the authentication gate, which attaches the caller's
/// identity when a valid bearer token is present and never rejects.
pub fn create_app(config: &ServerConfig) -> Router {
    let tokens = config.token_service();
    let avatars = config.avatar_storage();
    let email = EmailService::new(config.mailer.clone(), config.client_origin.clone());

    let api_router = create_api_router(config.db.clone(), tokens.clone(), email, avatars.clone());

    Router::new()
        .nest("/api", api_router)
        .nest_service("/images", ServeDir::new(avatars.profile_dir()))
        .layer(middleware::from_fn_with_state(tokens, authenticate))
        .layer(middleware::from_fn(render_errors))
        .layer(TraceLayer::new_for_http())
}

/// Spawn the cleanup scheduler. Its first sweep runs right away.
/// The scheduler stops when `cancel` fires.
pub fn init_cleanup(
    config: &ServerConfig,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    let tokens = config.token_service();
    cleanup::spawn_cleanup_scheduler(tokens, config.cleanup_interval, cancel)
}

/// Run the server on the given listener until `shutdown` fires.
///
/// Creates the upload folders and starts the cleanup scheduler, which is
/// stopped together with the server.
pub async fn run_server(
    config: ServerConfig,
    listener: TcpListener,
    shutdown: CancellationToken,
) -> Result<(), std::io::Error> {
    config.avatar_storage().create_folders().await?;

    let scheduler = init_cleanup(&config, shutdown.child_token());
    let app = create_app(&config);

    let signal = shutdown.clone();
    let result = axum::serve(listener, app)
        .with_graceful_shutdown(async move { signal.cancelled().await })
        .await;

    shutdown.cancel();
    if let Err(e) = scheduler.await {
        error!(error = %e, "Cleanup scheduler task failed");
    }
    info!("Server stopped");
    result
}
