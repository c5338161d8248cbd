use std::sync::Arc;

use teloxide::prelude::*;

use crate::{
    config::WatermarkConfig,
    db::Db,
    errors::{BotResult, HandlerResult},
    video::{Opacity, WatermarkPosition},
    watermark::{
        archive::ArchiveChannel,
        callback::WatermarkAction,
        handlers::{
            chat_of,
            screenshots::take_screenshots,
            video::show_options,
            watermark::{self, WatermarkJob},
        },
        keyboards,
        schema::{MyDialogue, State, UploadedVideo},
        texts,
    },
};

/// Parse the button and acknowledge it when `pick` accepts it for the current
/// step. Anything else gets the expiry notice.
async fn expect<T>(
    bot: &Bot,
    query: &CallbackQuery,
    pick: impl FnOnce(WatermarkAction) -> Option<T>,
) -> BotResult<Option<T>> {
    let picked = query
        .data
        .as_deref()
        .and_then(|data| data.parse::<WatermarkAction>().ok())
        .and_then(pick);

    match picked {
        Some(value) => {
            bot.answer_callback_query(query.id.clone()).await?;
            Ok(Some(value))
        }
        None => {
            stale(bot, query).await?;
            Ok(None)
        }
    }
}

async fn stale(bot: &Bot, query: &CallbackQuery) -> HandlerResult {
    bot.answer_callback_query(query.id.clone())
        .text(texts::BUTTON_EXPIRED)
        .await?;
    Ok(())
}

/// Button pressed with no video in progress, or one from an earlier step
pub async fn stale_button(bot: Bot, query: CallbackQuery) -> HandlerResult {
    stale(&bot, &query).await
}

pub async fn option_chosen(
    bot: Bot,
    dialogue: MyDialogue,
    query: CallbackQuery,
    video: UploadedVideo,
    config: Arc<WatermarkConfig>,
    db: Db,
    archive: ArchiveChannel,
) -> HandlerResult {
    let chat_id = chat_of(&query);
    let user_id = query.from.id.0;

    let Some(action) = expect(&bot, &query, |action| match action {
        WatermarkAction::Screenshots
        | WatermarkAction::Watermark
        | WatermarkAction::QuickWatermark
        | WatermarkAction::BackToOptions => Some(action),
        _ => None,
    })
    .await?
    else {
        return Ok(());
    };

    match action {
        WatermarkAction::Screenshots => {
            take_screenshots(&bot, chat_id, user_id, &config, &db, &video).await
        }
        WatermarkAction::Watermark => {
            dialogue.update(State::ChoosingPosition { video }).await?;
            bot.send_message(chat_id, "Choose watermark position:")
                .reply_markup(keyboards::positions())
                .await?;
            Ok(())
        }
        WatermarkAction::QuickWatermark => {
            let prefs = db.get_prefs(user_id as i64).await?;
            let Some(prefs) = prefs else {
                bot.send_message(
                    chat_id,
                    "No saved watermark settings found. Please use the regular watermark option first.",
                )
                .await?;
                return Ok(());
            };
            let Some((text, position, opacity)) = prefs.complete() else {
                bot.send_message(
                    chat_id,
                    "Saved settings are incomplete. Please use the regular watermark option first.",
                )
                .await?;
                return Ok(());
            };

            let job = WatermarkJob {
                video: &video,
                text,
                position,
                opacity,
            };
            watermark::run(&bot, chat_id, user_id, &config, &db, &archive, &job, "quick_watermark")
                .await?;
            bot.send_message(chat_id, "What would you like to do next?")
                .reply_markup(keyboards::back_to_options())
                .await?;
            Ok(())
        }
        _ => show_options(&bot, chat_id, user_id, &db).await,
    }
}

pub async fn position_chosen(
    bot: Bot,
    dialogue: MyDialogue,
    query: CallbackQuery,
    video: UploadedVideo,
) -> HandlerResult {
    let Some(position) = expect(&bot, &query, |action| match action {
        WatermarkAction::Position(position) => Some(position),
        _ => None,
    })
    .await?
    else {
        return Ok(());
    };

    dialogue
        .update(State::ChoosingOpacity { video, position })
        .await?;
    bot.send_message(chat_of(&query), format!("Position: {}\n\nChoose watermark opacity:", position))
        .reply_markup(keyboards::opacities())
        .await?;
    Ok(())
}

pub async fn opacity_chosen(
    bot: Bot,
    dialogue: MyDialogue,
    query: CallbackQuery,
    (video, position): (UploadedVideo, WatermarkPosition),
) -> HandlerResult {
    let Some(opacity) = expect(&bot, &query, |action| match action {
        WatermarkAction::Opacity(opacity) => Some(opacity),
        _ => None,
    })
    .await?
    else {
        return Ok(());
    };

    dialogue
        .update(State::ChoosingSave {
            video,
            position,
            opacity,
        })
        .await?;
    bot.send_message(
        chat_of(&query),
        format!("Opacity: {}\n\nDo you want to save these watermark settings?", opacity),
    )
    .reply_markup(keyboards::save_choice())
    .await?;
    Ok(())
}

/// Saving stores position and opacity right away; the text follows once typed.
pub async fn save_chosen(
    bot: Bot,
    dialogue: MyDialogue,
    query: CallbackQuery,
    (video, position, opacity): (UploadedVideo, WatermarkPosition, Opacity),
    db: Db,
) -> HandlerResult {
    let Some(mut save) = expect(&bot, &query, |action| match action {
        WatermarkAction::Save(save) => Some(save),
        _ => None,
    })
    .await?
    else {
        return Ok(());
    };

    if save {
        if let Err(e) = db.save_prefs(query.from.id.0 as i64, position, opacity).await {
            log::error!("Error saving watermark settings for {}: {}", query.from.id, e);
            save = false;
        }
    }

    dialogue
        .update(State::AwaitingText {
            video,
            position,
            opacity,
            save,
        })
        .await?;
    bot.send_message(chat_of(&query), "Please enter the text for the watermark:")
        .await?;
    Ok(())
}
