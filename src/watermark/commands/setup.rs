use std::sync::Arc;

use serde_json::json;
use teloxide::prelude::*;

use crate::{
    config::{WatermarkConfig, normalize_channel_id},
    db::{ActivityStatus, Db},
    errors::HandlerResult,
    watermark::archive::ArchiveChannel,
};

/// Handle /setup command
/// Usage: /setup <channel_id>
pub async fn setup(
    bot: Bot,
    msg: Message,
    channel: String,
    config: Arc<WatermarkConfig>,
    db: Db,
    archive: ArchiveChannel,
) -> HandlerResult {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    if !config.may_setup(user.id) {
        bot.send_message(msg.chat.id, "Only the bot admin can change the archive channel.")
            .await?;
        return Ok(());
    }

    let parts: Vec<&str> = channel.split_whitespace().collect();
    if parts.len() != 1 {
        bot.send_message(msg.chat.id, "Usage: /setup channel_id").await?;
        return Ok(());
    }

    let channel_id = match normalize_channel_id(parts[0]) {
        Ok(id) => id,
        Err(e) => {
            bot.send_message(msg.chat.id, e.to_string()).await?;
            return Ok(());
        }
    };

    // The bot must be able to post there before it becomes the archive
    let test = bot
        .send_message(
            channel_id,
            "✅ Watermark bot connected. Processed videos will be archived here.",
        )
        .await;

    match test {
        Ok(_) => {
            archive.set(&db, channel_id).await?;
            bot.send_message(
                msg.chat.id,
                format!(
                    "Database channel successfully set up! Channel ID: {}",
                    channel_id
                ),
            )
            .await?;
            db.record(
                user.id.0 as i64,
                "setup",
                ActivityStatus::Success,
                Some(json!({ "channel_id": channel_id.0 })),
            )
            .await;
        }
        Err(e) => {
            log::warn!("Setup of archive channel {} failed: {}", channel_id, e);
            bot.send_message(
                msg.chat.id,
                format!(
                    "Failed to set up channel: {}\n\nMake sure the bot is an admin in the channel.",
                    e
                ),
            )
            .await?;
            db.record(
                user.id.0 as i64,
                "setup",
                ActivityStatus::Error,
                Some(json!({ "channel_id": channel_id.0, "error": e.to_string() })),
            )
            .await;
        }
    }
    Ok(())
}
