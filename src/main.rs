use anyhow::Context;
use std::sync::Arc;
use teloxide::Bot;
use trade_relay::bot::{run_repl, CommandHandler, LogNotifier, Notifier, TelegramNotifier};
use trade_relay::config::RelayConfig;
use trade_relay::exchange::FeedConnector;
use trade_relay::trades::RelayState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Local .env is optional; real deployments set the environment directly
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = RelayConfig::from_env().context("Failed to load configuration")?;

    tracing::info!("Starting trade relay bot...");
    tracing::info!("  Exchange feed: {}", config.ws_url);
    tracing::info!("  Pairs: {}", config.pairs);
    tracing::info!("  Bot token: {}", config.bot_token);
    tracing::info!(
        "  Reconnect delay: {}s",
        config.reconnect_delay.as_secs_f64()
    );

    let pairs = Arc::new(config.pairs.clone());
    let state = Arc::new(RelayState::new(&pairs));
    let bot = Bot::new(config.bot_token.expose_secret());

    let notifier: Arc<dyn Notifier> = match config.operator_chat_id {
        Some(chat_id) => {
            tracing::info!("  Operator chat: {}", chat_id);
            Arc::new(TelegramNotifier::new(bot.clone(), chat_id))
        }
        None => {
            tracing::warn!("OPERATOR_CHAT_ID not set - connection notices will only be logged");
            tracing::warn!("Send /id to the bot to find your chat id");
            Arc::new(LogNotifier)
        }
    };

    let connector = FeedConnector::new(
        config.ws_url.clone(),
        pairs.clone(),
        state.clone(),
        notifier,
    )
    .with_reconnect_delay(config.reconnect_delay);
    let feed_handle = tokio::spawn(async move { connector.run().await });

    let handler = CommandHandler::new(pairs, state);

    tokio::select! {
        _ = run_repl(bot, handler) => {
            tracing::info!("Bot polling stopped");
        }
        result = tokio::signal::ctrl_c() => {
            match result {
                Ok(()) => tracing::info!("Received shutdown signal (Ctrl+C)"),
                Err(err) => tracing::error!("Failed to listen for shutdown signal: {}", err),
            }
        }
    }

    feed_handle.abort();
    tracing::info!("Trade relay stopped");
    Ok(())
}
