//! Matchday API Server
//!
//! This binary starts the Matchday server: the REST API plus the background
//! sync scheduler, reminder scanner, and notification consumer.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{Level, info, warn};
use tracing_subscriber::FmtSubscriber;

use matchday_core::{
    DeliveryPolicy, EventStore, InMemoryQueue, NotificationJob, ReconcileService, ReminderConfig,
    ReminderScheduler, RetryPolicy, SchedulerConfig, SyncErrorHandler, load_sources_config,
};
use matchday_db::{
    CacheBackend, LockBackend, QueueBackend, RedisCache, RedisDelayQueue, RedisLock,
    SportsRepository, connect,
};
use matchday_sources::SourceKind;

use matchday_server::{AppState, Scheduler, ServerConfig, create_router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Parse command line arguments
    let config = ServerConfig::parse();

    // Connect to database
    info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    info!("Database connection established");

    let repo = SportsRepository::new(pool);

    // Connect to Redis, or fall back to in-process backends
    let (cache, lock, queue) = match &config.redis_url {
        Some(url) => {
            let conn = connect(url).await.context("Failed to connect to Redis")?;
            info!("Redis connection established");
            (
                CacheBackend::Redis(RedisCache::new(conn.clone())),
                LockBackend::Redis(RedisLock::new(conn.clone())),
                QueueBackend::Redis(RedisDelayQueue::new(conn, DeliveryPolicy::default())),
            )
        }
        None => {
            warn!("No REDIS_URL configured, running with in-process cache, lock, and queue");
            (
                CacheBackend::Disabled,
                LockBackend::Disabled,
                QueueBackend::Memory(InMemoryQueue::default()),
            )
        }
    };

    // Load source configuration
    let sources_config = load_sources_config(config.sources_config.clone())?;
    info!(
        sources = sources_config.sources.len(),
        enabled = sources_config.enabled_sources().len(),
        "Loaded source configuration"
    );

    // Build the scheduler
    let scheduler_config = SchedulerConfig {
        run_initial_sync: !config.skip_initial_sync,
        ..SchedulerConfig::default()
    };
    let reconcile = ReconcileService::new(repo.clone());
    let handler = SyncErrorHandler::new(repo.clone(), RetryPolicy::from_env());
    let mut scheduler = Scheduler::new(
        reconcile,
        handler,
        cache.clone(),
        lock.clone(),
        scheduler_config,
    );
    // Disabled sources are still registered so the status API lists them
    for entry in &sources_config.sources {
        let adapter = SourceKind::from_kind(&entry.kind, cache.clone())
            .with_context(|| format!("Failed to build adapter for source '{}'", entry.name))?;
        scheduler
            .add_source(entry.clone(), adapter)
            .with_context(|| format!("Invalid schedule for source '{}'", entry.name))?;
    }

    // Create shutdown token for graceful shutdown
    let shutdown_token = CancellationToken::new();

    // Background workers: cron scheduler, reminder scanner, queue consumer
    {
        let scheduler = scheduler.clone();
        let cancel = shutdown_token.clone();
        tokio::spawn(async move {
            scheduler.run(cancel).await;
        });
    }
    {
        let reminders = ReminderScheduler::new(repo.clone(), queue.clone(), ReminderConfig::default());
        let cancel = shutdown_token.clone();
        tokio::spawn(async move {
            reminders.run(cancel).await;
        });
    }
    {
        let store = repo.clone();
        let cancel = shutdown_token.clone();
        tokio::spawn(async move {
            let result = queue
                .process(
                    move |job: NotificationJob| {
                        let store = store.clone();
                        async move {
                            info!(
                                reminder_id = %job.reminder_id,
                                event = %job.event_title,
                                channel = %job.channel,
                                "reminder dispatched"
                            );
                            store.mark_reminder_sent(job.reminder_id).await
                        }
                    },
                    cancel,
                )
                .await;
            if let Err(e) = result {
                warn!(error = %e, "notification consumer exited with error");
            }
        });
    }

    // Create application state
    let app_state = AppState::new(scheduler, repo, shutdown_token.clone());

    // Build router
    let app = create_router(app_state, &config.cors_origins);

    // Bind to address
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("Invalid address")?;

    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!("Starting Matchday API server on http://{}", addr);
    info!("Swagger UI available at http://{}/swagger-ui", addr);

    // Start server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_token))
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");

    // Cancel the shutdown token to signal workers
    shutdown_token.cancel();

    // Give workers time to finish current jobs
    tokio::time::sleep(Duration::from_secs(2)).await;
}
