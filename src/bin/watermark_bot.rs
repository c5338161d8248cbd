use std::sync::Arc;

use premium_bots::{
    config::WatermarkConfig,
    db::Db,
    migrations,
    watermark::{ArchiveChannel, State, schema, workspace},
};
use teloxide::{dispatching::dialogue::InMemStorage, prelude::*};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    pretty_env_logger::init();
    log::info!("Starting video watermark bot...");

    let config = match WatermarkConfig::from_env() {
        Ok(config) => Arc::new(config),
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    };

    let db = match migrations::connect(&config.database_url).await {
        Ok(pool) => Db::new(Arc::new(pool)),
        Err(e) => {
            log::error!("Failed to open database {}: {}", config.database_url, e);
            std::process::exit(1);
        }
    };

    let archive = match ArchiveChannel::load(&db, config.database_channel_id).await {
        Ok(archive) => archive,
        Err(e) => {
            log::error!("Failed to load archive channel: {}", e);
            std::process::exit(1);
        }
    };
    match archive.get().await {
        Some(channel_id) => log::info!("Archiving processed videos to {}", channel_id),
        None => log::info!("No archive channel configured"),
    }

    if let Err(e) = workspace::clear_stale(&config.work_dir).await {
        log::warn!("Failed to clean {}: {}", config.work_dir.display(), e);
    }

    let bot = Bot::new(&config.bot_token);

    Dispatcher::builder(bot, schema())
        .dependencies(dptree::deps![
            InMemStorage::<State>::new(),
            config.clone(),
            db,
            archive
        ])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    if let Err(e) = workspace::clear_stale(&config.work_dir).await {
        log::warn!("Failed to clean {}: {}", config.work_dir.display(), e);
    }
    log::info!("Video watermark bot stopped");
}
