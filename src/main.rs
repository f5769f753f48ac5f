use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vpnbot::{
    bot::{self, BotContext},
    config::{AppConfig, USER_ID_ENV},
    telegram::TelegramClient,
    vpn::ScriptGenerator,
};

/// Buffered updates between the poller and the session loop
const EVENT_QUEUE: usize = 100;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine; real deployments use the process environment.
    dotenvy::dotenv().ok();

    // Initialize logging first
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vpnbot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting vpnbot v{}", env!("CARGO_PKG_VERSION"));

    let config = AppConfig::load().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;
    info!("Configuration loaded");

    if config.telegram.allowed_user_id.is_none() {
        warn!(
            "{} not set; every user will be denied access",
            USER_ID_ENV
        );
    }

    let telegram = Arc::new(TelegramClient::new(&config.telegram)?);
    let me = telegram.get_me().await.map_err(|e| {
        error!("Bot token rejected by Telegram: {}", e);
        e
    })?;
    info!(
        "Authorized on account {}",
        me.username.as_deref().unwrap_or(&me.first_name)
    );

    let generator = Arc::new(ScriptGenerator::from_config(&config.generator));
    let ctx = BotContext::from_config(&config, telegram.clone(), generator);

    let (tx, rx) = mpsc::channel(EVENT_QUEUE);
    let poller = {
        let telegram = telegram.clone();
        tokio::spawn(async move { telegram.run_poller(tx).await })
    };

    // Stopping the poller drops the sender, which ends the session loop.
    let stop_polling = poller.abort_handle();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
            return;
        }
        info!("Shutdown requested");
        stop_polling.abort();
    });

    bot::run(&ctx, rx, config.bot.max_concurrent_events).await;

    info!("vpnbot stopped");
    Ok(())
}
