use std::sync::Arc;

use premium_bots::{
    config::PremiumConfig,
    db::Db,
    migrations,
    premium::{ExpiryScheduler, State, schema},
    subscription::SubscriptionManager,
};
use teloxide::{dispatching::dialogue::InMemStorage, prelude::*};
use tokio::sync::oneshot;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    pretty_env_logger::init();
    log::info!("Starting premium channel bot...");

    let config = match PremiumConfig::from_env() {
        Ok(config) => Arc::new(config),
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    };
    log::info!("Loaded {} premium channels", config.catalog.len());

    let pool = match migrations::connect(&config.database_url).await {
        Ok(pool) => Arc::new(pool),
        Err(e) => {
            log::error!("Failed to open database {}: {}", config.database_url, e);
            std::process::exit(1);
        }
    };
    let db = Db::new(pool.clone());
    let subscriptions = SubscriptionManager::new(pool);

    let bot = Bot::new(&config.bot_token);

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let scheduler = ExpiryScheduler::new(bot.clone(), subscriptions.clone(), config.clone());
    let scheduler_handle = tokio::spawn(scheduler.run(shutdown_rx));

    Dispatcher::builder(bot, schema())
        .dependencies(dptree::deps![
            InMemStorage::<State>::new(),
            config,
            db,
            subscriptions
        ])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    let _ = shutdown_tx.send(());
    if let Err(e) = scheduler_handle.await {
        log::error!("Expiry scheduler panicked: {}", e);
    }
    log::info!("Premium channel bot stopped");
}
