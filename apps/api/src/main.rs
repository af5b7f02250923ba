use std::sync::Arc;

use anyhow::Context;
use dotenv::dotenv;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{self, TraceLayer};
use tracing::{error, info, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use notification_cell::{EmailWorkerService, MailTransport, Notifier, SmtpMailer, VisitReminderService, WorkerConfig};
use przychodnia_api::{bootstrap, create_router};
use shared_config::AppConfig;
use shared_database::{connect, run_migrations, AppState, EmailQueue};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug,sqlx=warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Przychodnia API server");

    let config = Arc::new(AppConfig::from_env());

    let pool = connect(&config).await.context("Connecting to Postgres failed")?;
    run_migrations(&pool).await.context("Running migrations failed")?;
    bootstrap::run(&pool, &config).await?;

    let email_queue = EmailQueue::new(&config.redis_url).context("Creating email queue failed")?;
    let state = AppState::new(config.clone(), pool.clone(), email_queue.clone());

    // Background workers
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let mailer: Arc<dyn MailTransport> =
        Arc::new(SmtpMailer::new(&config.smtp).context("Configuring SMTP transport failed")?);
    let worker_config = WorkerConfig {
        concurrency: config.email_worker_concurrency,
        ..WorkerConfig::default()
    };
    let mut workers = Arc::new(EmailWorkerService::new(worker_config, email_queue.clone(), mailer))
        .start(shutdown_rx.clone());

    let reminders = VisitReminderService::new(pool.clone(), Notifier::new(email_queue));
    workers.push(reminders.spawn_daily(config.reminder_hour, shutdown_rx));

    // Set up CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build the application router
    let app = create_router(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new()
                    .level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new()
                    .level(Level::INFO)),
        )
        .layer(cors);

    // Run the server
    let listener = TcpListener::bind(&config.bind_address)
        .await
        .with_context(|| format!("Binding {} failed", config.bind_address))?;
    info!("Listening on {}", config.bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped, waiting for background workers");
    let _ = shutdown_tx.send(true);
    for handle in workers {
        if let Err(e) = handle.await {
            error!("Background task ended abnormally: {}", e);
        }
    }

    pool.close().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown signal received");
}
