use std::sync::Arc;

use anyhow::Context;
use sqlx::PgPool;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use campaign_refunds::api;
use campaign_refunds::app_state::AppState;
use campaign_refunds::config::Config;
use campaign_refunds::db::pool::{get_db_pool, run_migrations};
use campaign_refunds::db::postgres::PgStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("failed to load configuration")?;
    let _guard = init_tracing(&config)?;

    let pool = get_db_pool(&config)
        .await
        .context("failed to connect to the database")?;
    if config.run_migrations {
        run_migrations(&pool).await.context("failed to run migrations")?;
        info!("Migrations applied");
    }

    let addr = config.server_addr;
    let state = AppState::new(Arc::new(PgStore::new(pool.clone())), config);
    let app = api::router(state);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server running at http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(pool))
        .await
        .context("server encountered an error")?;

    info!("Shutdown complete");
    Ok(())
}

/// Console output always; a daily rolling file too when `LOG_DIR` is set.
/// The returned guard flushes the file writer and must live until exit.
fn init_tracing(config: &Config) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info,sqlx=warn"));

    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true));

    match &config.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create log directory {}", dir.display()))?;
            let file_appender = tracing_appender::rolling::daily(dir, "campaign_refunds.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            registry
                .with(fmt::layer().with_ansi(false).with_writer(non_blocking))
                .init();
            Ok(Some(guard))
        }
        None => {
            registry.init();
            Ok(None)
        }
    }
}

async fn shutdown_signal(pool: PgPool) {
    if let Err(e) = signal::ctrl_c().await {
        tracing::error!("failed to listen for Ctrl+C: {}", e);
    }
    info!("Received Ctrl+C, closing database pool...");
    pool.close().await;
    info!("Database pool closed");
}
