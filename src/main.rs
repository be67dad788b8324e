use std::sync::Arc;

use mimalloc::MiMalloc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use wavepipe::config::Config;
use wavepipe::db::{self, Backend, Entity, SqliteBackend, User};
use wavepipe::error::StoreError;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cfg = Config::load()?;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cfg.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_target(false),
        )
        .init();

    info!(
        database_url = %cfg.database_url,
        listen_addr = %cfg.listen_addr,
        loglevel = %cfg.loglevel,
        bcrypt_cost = cfg.bcrypt_cost
    );

    let listener = TcpListener::bind(&cfg.listen_addr).await?;
    let dsn = cfg.database_url.clone();

    db::with_backend(SqliteBackend::new(), &dsn, |backend| async move {
        let backend: Arc<dyn Backend> = backend;
        bootstrap_admin(&cfg, backend.as_ref()).await?;

        let state = wavepipe::router::AppState::new(backend);
        let app = wavepipe::router::wavepipe_router(state);

        info!("HTTP server listening on {}", cfg.listen_addr);
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        info!("HTTP server stopped");
        Ok::<_, Box<dyn std::error::Error>>(())
    })
    .await
}

/// Create the configured admin account unless that username already exists.
async fn bootstrap_admin(cfg: &Config, backend: &dyn Backend) -> Result<(), StoreError> {
    let Some((username, password)) = cfg.admin_credentials() else {
        return Ok(());
    };

    let mut user = User::with_username(username);
    match user.load(backend).await {
        Ok(()) => {
            info!(username, "admin account already present");
            return Ok(());
        }
        Err(StoreError::NotFound) => {}
        Err(e) => return Err(e),
    }

    user.set_password(password, cfg.bcrypt_cost)?;
    user.save(backend).await?;
    info!(username, id = user.id, "admin account created");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
