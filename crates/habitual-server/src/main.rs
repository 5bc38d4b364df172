mod config;
mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};

use habitual_db::Database;
use habitual_reminder::{Dispatcher, ReminderScheduler, TelegramGateway};

use crate::config::Config;
use crate::routes::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "habitual=debug,habitual_reminder=debug,habitual_db=info,tower_http=debug".into()
            }),
        )
        .init();

    let config = Config::from_env()?;

    // Init database
    let db = Arc::new(Database::open(&config.db_path)?);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let scheduler = match config.telegram.clone() {
        Some(telegram) => {
            let gateway = TelegramGateway::new(telegram)?;
            let dispatcher = Dispatcher::new(db.clone(), Arc::new(gateway), config.send_timeout)
                .with_max_in_flight(config.max_in_flight);
            Some(ReminderScheduler::new(dispatcher, config.timezone))
        }
        None => {
            warn!("TELEGRAM_BOT_TOKEN is not set; reminders are disabled");
            None
        }
    };

    // Reminder loop, one cycle per minute
    let reminder_task = scheduler.clone().map(|scheduler| {
        let mut rx = shutdown_rx.clone();
        tokio::spawn(scheduler.run(async move {
            let _ = rx.changed().await;
        }))
    });

    let app = routes::router(AppState {
        scheduler,
        timezone: config.timezone,
    });

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Habitual server listening on {}", addr);
    info!("Reminder timezone: {}", config.timezone);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_tx))
        .await?;

    if let Some(task) = reminder_task {
        // A cycle in flight finishes its current habit list before the loop exits
        task.await?;
    }

    Ok(())
}

async fn shutdown_signal(shutdown_tx: watch::Sender<bool>) {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
    let _ = shutdown_tx.send(true);
}
