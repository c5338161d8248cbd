mod setup;

use std::sync::Arc;

use teloxide::{prelude::*, types::ParseMode};

use crate::{
    config::WatermarkConfig,
    db::{ActivityStatus, Db},
    errors::HandlerResult,
    watermark::{schema::MyDialogue, texts},
};

pub use setup::setup;

fn sender(msg: &Message) -> i64 {
    msg.from.as_ref().map_or(msg.chat.id.0, |u| u.id.0 as i64)
}

pub async fn start(bot: Bot, dialogue: MyDialogue, msg: Message, db: Db) -> HandlerResult {
    dialogue.exit().await?;
    bot.send_message(msg.chat.id, texts::START).await?;
    db.record(sender(&msg), "start", ActivityStatus::Success, None)
        .await;
    Ok(())
}

pub async fn help(bot: Bot, msg: Message, config: Arc<WatermarkConfig>) -> HandlerResult {
    bot.send_message(msg.chat.id, texts::help(config.max_video_bytes / (1024 * 1024)))
        .parse_mode(ParseMode::Html)
        .await?;
    Ok(())
}

pub async fn cancel(bot: Bot, dialogue: MyDialogue, msg: Message) -> HandlerResult {
    dialogue.exit().await?;
    bot.send_message(msg.chat.id, "Cancelled. Send another video to start again.")
        .await?;
    Ok(())
}

pub async fn clear_preferences(bot: Bot, msg: Message, db: Db) -> HandlerResult {
    let user_id = sender(&msg);

    match db.clear_prefs(user_id).await {
        Ok(true) => {
            bot.send_message(msg.chat.id, "Your saved preferences have been cleared.")
                .await?;
            db.record(user_id, "clear_preferences", ActivityStatus::Success, None)
                .await;
        }
        Ok(false) => {
            bot.send_message(msg.chat.id, "You have no saved preferences.")
                .await?;
        }
        Err(e) => {
            log::error!("Error clearing preferences of {}: {}", user_id, e);
            bot.send_message(
                msg.chat.id,
                "Failed to clear your preferences. Please try again.",
            )
            .await?;
            db.record(
                user_id,
                "clear_preferences",
                ActivityStatus::Error,
                Some(serde_json::json!({ "error": e.to_string() })),
            )
            .await;
        }
    }
    Ok(())
}
