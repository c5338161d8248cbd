mod browse;
mod payment;
mod review;

use std::sync::Arc;

use teloxide::{
    ApiError, RequestError,
    prelude::*,
    types::{InlineKeyboardMarkup, InputFile, InputMedia, InputMediaPhoto, ParseMode},
};
use url::Url;

use crate::{
    config::PremiumConfig,
    db::Db,
    errors::{BotResult, HandlerResult},
    premium::{callback::CallbackAction, schema::MyDialogue},
};

pub use payment::screenshot_received;
pub(crate) use payment::send_for_review;
pub(crate) use review::deliver_access;

/// Entry point for every inline button press.
pub async fn callback_received(
    bot: Bot,
    dialogue: MyDialogue,
    query: CallbackQuery,
    config: Arc<PremiumConfig>,
    db: Db,
) -> HandlerResult {
    let action = match query.data.as_deref().map(str::parse::<CallbackAction>) {
        Some(Ok(action)) => action,
        Some(Err(e)) => {
            log::warn!("Ignoring callback from {}: {}", query.from.id, e);
            bot.answer_callback_query(query.id.clone())
                .text("This button is no longer valid.")
                .await?;
            return Ok(());
        }
        None => {
            bot.answer_callback_query(query.id.clone()).await?;
            return Ok(());
        }
    };
    log::debug!("Callback {} from {}", action, query.from.id);

    if action.is_admin_only() && !config.is_admin(query.from.id) {
        bot.answer_callback_query(query.id.clone())
            .text("You are not authorized to perform this action.")
            .show_alert(true)
            .await?;
        return Ok(());
    }

    match action {
        CallbackAction::Approve { payment_id } => {
            return review::approve(&bot, &query, &config, &db, payment_id).await;
        }
        CallbackAction::Reject { payment_id } => {
            return review::reject(&bot, &query, &config, &db, payment_id).await;
        }
        _ => {}
    }

    bot.answer_callback_query(query.id.clone()).await?;

    match action {
        CallbackAction::Menu => browse::show_menu(&bot, &query, &config).await,
        CallbackAction::Channel { key } => browse::show_channel(&bot, &query, &config, &key, 0).await,
        CallbackAction::Preview { key, index } => {
            browse::show_channel(&bot, &query, &config, &key, index).await
        }
        CallbackAction::Subscribe { key } => {
            payment::start_payment(&bot, &query, &config, &db, &key, false).await
        }
        CallbackAction::Renew { key } => {
            payment::start_payment(&bot, &query, &config, &db, &key, true).await
        }
        CallbackAction::Pay { method, payment_id } => {
            payment::choose_method(&bot, &query, &config, &db, method, payment_id).await
        }
        CallbackAction::Screenshot { payment_id } => {
            payment::expect_screenshot(&bot, &dialogue, &query, &db, payment_id).await
        }
        CallbackAction::Approve { .. } | CallbackAction::Reject { .. } => Ok(()),
    }
}

fn chat_of(query: &CallbackQuery) -> ChatId {
    query
        .regular_message()
        .map(|m| m.chat.id)
        .unwrap_or_else(|| query.from.id.into())
}

/// Edits that change nothing are not errors for us
fn ignore_not_modified<T>(result: Result<T, RequestError>) -> BotResult<()> {
    match result {
        Ok(_) | Err(RequestError::Api(ApiError::MessageNotModified)) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Replace the content of the message behind `query`. Photo messages keep
/// being photo messages (swapping the image when `image_url` is given); when
/// the message cannot be edited into the requested form a new one is sent.
async fn present(
    bot: &Bot,
    query: &CallbackQuery,
    image_url: Option<&str>,
    text: String,
    markup: InlineKeyboardMarkup,
) -> HandlerResult {
    let chat_id = chat_of(query);
    let message = query.regular_message();
    let has_photo = message.is_some_and(|m| m.photo().is_some());

    match (message, image_url) {
        (Some(m), Some(url)) if has_photo => {
            let media = InputMedia::Photo(
                InputMediaPhoto::new(InputFile::url(Url::parse(url)?))
                    .caption(text)
                    .parse_mode(ParseMode::Html),
            );
            ignore_not_modified(
                bot.edit_message_media(chat_id, m.id, media)
                    .reply_markup(markup)
                    .await,
            )
        }
        (Some(m), None) if has_photo => ignore_not_modified(
            bot.edit_message_caption(chat_id, m.id)
                .caption(text)
                .parse_mode(ParseMode::Html)
                .reply_markup(markup)
                .await,
        ),
        (Some(m), None) => ignore_not_modified(
            bot.edit_message_text(chat_id, m.id, text)
                .parse_mode(ParseMode::Html)
                .reply_markup(markup)
                .await,
        ),
        (_, Some(url)) => {
            bot.send_photo(chat_id, InputFile::url(Url::parse(url)?))
                .caption(text)
                .parse_mode(ParseMode::Html)
                .reply_markup(markup)
                .await?;
            Ok(())
        }
        (None, None) => {
            bot.send_message(chat_id, text)
                .parse_mode(ParseMode::Html)
                .reply_markup(markup)
                .await?;
            Ok(())
        }
    }
}
