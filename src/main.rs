use std::time::Duration;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ward_connect::config::{LogConfig, Settings};
use ward_connect::notification::create_push_gateway;
use ward_connect::server::{create_app, AppState};
use ward_connect::store::create_store;
use ward_connect::tasks::NotificationWorker;
use ward_connect::uploads::ImageStore;

/// Upper bound on draining the notification outbox at shutdown
const WORKER_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let settings = Settings::new().context("Failed to load configuration")?;

    // Initialize tracing
    init_tracing(&settings.log);
    tracing::info!("Configuration loaded");

    // The service does not start without its store
    let backend = create_store(&settings.database)
        .await
        .context("Failed to initialize document store")?;

    let images = ImageStore::open(&settings.uploads).with_context(|| {
        format!(
            "Failed to prepare upload directory '{}'",
            settings.uploads.dir
        )
    })?;

    let gateway = create_push_gateway(&settings.push);

    // Create application state
    let (state, outbox) = AppState::new(settings.clone(), backend, gateway, images);
    tracing::info!(
        notification_mode = %settings.notifications.mode,
        "Application state initialized"
    );

    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    // Start notification worker in background
    let worker_handle = outbox.map(|outbox| {
        let worker =
            NotificationWorker::new(state.dispatcher.clone(), outbox, shutdown_tx.subscribe());
        tokio::spawn(worker.run())
    });

    // Create Axum app
    let app = create_app(state);

    // Start server
    let addr = settings.server_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Server listening on {}", addr);

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal_handler(shutdown_tx))
        .await?;

    // Wait for queued notifications to go out
    if let Some(handle) = worker_handle {
        tracing::info!("Waiting for notification worker to finish...");
        match tokio::time::timeout(WORKER_SHUTDOWN_TIMEOUT, handle).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!(error = %e, "Notification worker panicked"),
            Err(_) => tracing::warn!(
                timeout_secs = WORKER_SHUTDOWN_TIMEOUT.as_secs(),
                "Notification worker did not finish in time"
            ),
        }
    }

    tracing::info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(log: &LogConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,ward_connect=debug"));

    let registry = tracing_subscriber::registry().with(env_filter);

    if log.is_json() {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal_handler(shutdown_tx: broadcast::Sender<()>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }

    // Let the notification worker drain its outbox
    let _ = shutdown_tx.send(());
}
