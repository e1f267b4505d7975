use anyhow::Result;
use std::sync::Arc;
use teloxide::dispatching::dialogue::InMemStorage;
use teloxide::prelude::*;
use teloxide::update_listeners::webhooks;
use tracing::{info, warn};

use stroyhelper::bot::{schema, BotContext};
use stroyhelper::config::BotConfig;
use stroyhelper::dialogue::DialogueState;
use stroyhelper::localization::init_localization;
use stroyhelper::logging::init_logging;
use stroyhelper::retry::with_retry;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    let config = BotConfig::from_env()?;
    init_logging(config.log_format);

    info!("Starting StroyHelper bot");

    init_localization()?;
    info!(
        data_dir = %config.data_dir.display(),
        knowledge_base_dir = %config.knowledge_base_dir.display(),
        admins = config.admin_ids.len(),
        "Configuration loaded"
    );

    let bot = Bot::new(config.bot_token.clone());
    let webhook = config.webhook.clone();
    let recovery = config.recovery.clone();
    let ctx = Arc::new(BotContext::new(config));

    let mut dispatcher = Dispatcher::builder(bot.clone(), schema())
        .dependencies(dptree::deps![InMemStorage::<DialogueState>::new(), ctx])
        .default_handler(|upd| async move {
            warn!(update = ?upd, "Unhandled update");
        })
        .error_handler(LoggingErrorHandler::with_custom_text(
            "An error has occurred in the dispatcher",
        ))
        .enable_ctrlc_handler()
        .build();

    match webhook {
        Some(webhook) => {
            info!(url = %webhook.url, listen_addr = %webhook.listen_addr, "Starting webhook listener");
            let listener = with_retry(&recovery, "webhook setup", || {
                webhooks::axum(
                    bot.clone(),
                    webhooks::Options::new(webhook.listen_addr, webhook.url.clone()),
                )
            })
            .await?;
            dispatcher
                .dispatch_with_listener(
                    listener,
                    LoggingErrorHandler::with_custom_text("An error from the update listener"),
                )
                .await;
        }
        None => {
            with_retry(&recovery, "webhook removal", || {
                bot.delete_webhook().drop_pending_updates(true).send()
            })
            .await?;
            info!("Starting long polling");
            dispatcher.dispatch().await;
        }
    }

    info!("Bot stopped");
    Ok(())
}
