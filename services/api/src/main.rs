use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use common::database::{health_check, init_pool, run_migrations};
use redline_api::{
    AppState, MIGRATOR, config::Settings, identity::IdentityClient, routes,
    storage::ObjectStorage,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting Redline API service");

    let settings = Settings::load()?;

    // Initialize database connection pool
    let pool = init_pool(&settings.database).await?;

    if health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    if settings.database.run_migrations {
        run_migrations(&pool, &MIGRATOR).await?;
        info!("Database migrations applied");
    }

    let storage = ObjectStorage::from_settings(&settings.storage).await;
    let identity = IdentityClient::new(reqwest::Client::new(), &settings.identity);

    let bind_address = settings.server.bind_address();
    let app = routes::create_router(AppState::new(pool, settings, identity, storage));

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!("API service listening on {}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("API service stopped");
    Ok(())
}

/// Resolve on Ctrl-C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
