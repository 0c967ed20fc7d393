use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use dotenvy::dotenv;
use log::{error, info};
use tokio::sync::watch;

use chime::core::Config;
use chime::features::reminders::{
    JsonFileBackend, LinePushDispatcher, LogReporter, NotificationStore, ReminderScheduler,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    let config = Config::from_env()?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    info!("Starting chime reminder daemon...");

    let backend = JsonFileBackend::new(&config.storage_path);
    let store = Arc::new(
        NotificationStore::new(Box::new(backend), config.timezone).map_err(|e| {
            error!("Failed to open notification storage at {}: {e}", config.storage_path);
            anyhow::anyhow!("storage initialization failed: {}", e)
        })?,
    );
    info!(
        "Notification storage ready at {} ({} record(s))",
        config.storage_path,
        store.count().await
    );

    let dispatcher = Arc::new(LinePushDispatcher::new(config.line_channel_token.clone()));
    let scheduler = Arc::new(
        ReminderScheduler::new(store, dispatcher, Arc::new(LogReporter))
            .with_check_interval(Duration::from_secs(config.check_interval_secs))
            .with_dispatch_timeout(Duration::from_secs(config.dispatch_timeout_secs)),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler_task = {
        let scheduler = scheduler.clone();
        tokio::spawn(async move {
            scheduler.run(shutdown_rx).await;
        })
    };

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, finishing the in-flight pass...");
    let _ = shutdown_tx.send(true);

    if let Err(e) = scheduler_task.await {
        error!("Scheduler task ended abnormally: {e}");
    }

    info!("Goodbye");
    Ok(())
}
