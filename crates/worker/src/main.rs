//! Background worker: runs the collaboration cleanup sweep on an interval.

use docket_collab::{CleanupSweep, CollabConfig};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docket_worker=debug,docket_collab=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = docket_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    docket_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database connection pool created");

    docket_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    let sweep = CleanupSweep::new(pool, CollabConfig::default());
    let cancel = CancellationToken::new();
    let sweep_cancel = cancel.clone();
    let sweep_task = tokio::spawn(async move { sweep.run(sweep_cancel).await });

    tokio::signal::ctrl_c()
        .await
        .expect("Failed to listen for shutdown signal");
    tracing::info!("Shutdown signal received, stopping cleanup sweep");
    cancel.cancel();
    let _ = sweep_task.await;
}
