use std::sync::Arc;

use teloxide::{
    prelude::*,
    types::{InputFile, ParseMode},
};
use url::Url;

use crate::{
    config::PremiumConfig,
    db::{Db, Payment, PaymentMethod, PaymentStatus},
    errors::{BotError, BotResult, HandlerResult},
    premium::{
        handlers::{chat_of, present},
        keyboards,
        schema::{MyDialogue, State},
        texts,
    },
};

/// Open a pending payment for the plan and ask for a payment method.
/// Renewals come from reminder messages, which are left untouched.
pub async fn start_payment(
    bot: &Bot,
    query: &CallbackQuery,
    config: &PremiumConfig,
    db: &Db,
    key: &str,
    renewal: bool,
) -> HandlerResult {
    let Some(plan) = config.catalog.get(key) else {
        bot.send_message(chat_of(query), "This channel is no longer available.")
            .await?;
        return Ok(());
    };

    let user = &query.from;
    db.upsert_user(
        user.id.0 as i64,
        user.username.as_deref(),
        Some(&user.first_name),
        user.last_name.as_deref(),
    )
    .await?;
    let payment_id = db
        .create_payment(user.id.0 as i64, key, i64::from(plan.price))
        .await?;
    log::info!(
        "Payment {} opened by {} for {} (renewal: {})",
        payment_id,
        user.id,
        key,
        renewal
    );

    let text = texts::payment_prompt(plan, renewal);
    let markup = keyboards::payment_methods(key, payment_id);

    if renewal {
        bot.send_message(chat_of(query), text)
            .parse_mode(ParseMode::Html)
            .reply_markup(markup)
            .await?;
        Ok(())
    } else {
        present(bot, query, None, text, markup).await
    }
}

/// The payment must exist, be pending and belong to whoever pressed the
/// button. Otherwise the user is told why and `None` is returned.
async fn own_pending_payment(
    bot: &Bot,
    chat_id: ChatId,
    user: UserId,
    db: &Db,
    payment_id: i64,
) -> BotResult<Option<Payment>> {
    let payment = db
        .get_payment(payment_id)
        .await?
        .filter(|p| p.user_id == user.0 as i64);

    match payment {
        Some(p) if p.status == PaymentStatus::Pending => Ok(Some(p)),
        Some(p) => {
            bot.send_message(
                chat_id,
                format!("This payment has already been {}.", p.status),
            )
            .await?;
            Ok(None)
        }
        None => {
            bot.send_message(chat_id, "Payment not found. Please start again with /start.")
                .await?;
            Ok(None)
        }
    }
}

pub async fn choose_method(
    bot: &Bot,
    query: &CallbackQuery,
    config: &PremiumConfig,
    db: &Db,
    method: PaymentMethod,
    payment_id: i64,
) -> HandlerResult {
    let chat_id = chat_of(query);
    let Some(payment) = own_pending_payment(bot, chat_id, query.from.id, db, payment_id).await? else {
        return Ok(());
    };
    let Some(plan) = config.catalog.get(&payment.channel_key) else {
        bot.send_message(chat_id, "This channel is no longer available.")
            .await?;
        return Ok(());
    };

    db.set_payment_method(payment_id, method).await?;

    match method {
        PaymentMethod::Upi => {
            bot.send_message(chat_id, texts::upi_instructions(plan, &config.payment.upi_id))
                .parse_mode(ParseMode::Html)
                .reply_markup(keyboards::screenshot(payment_id))
                .await?;
        }
        PaymentMethod::Qr => {
            let qr = Url::parse(&config.payment.qr_code_url)?;
            bot.send_photo(chat_id, InputFile::url(qr))
                .caption(texts::qr_instructions(plan))
                .parse_mode(ParseMode::Html)
                .reply_markup(keyboards::screenshot(payment_id))
                .await?;
        }
    }
    Ok(())
}

pub async fn expect_screenshot(
    bot: &Bot,
    dialogue: &MyDialogue,
    query: &CallbackQuery,
    db: &Db,
    payment_id: i64,
) -> HandlerResult {
    let chat_id = chat_of(query);
    if own_pending_payment(bot, chat_id, query.from.id, db, payment_id)
        .await?
        .is_none()
    {
        return Ok(());
    }

    dialogue.update(State::AwaitingScreenshot { payment_id }).await?;
    bot.send_message(chat_id, texts::screenshot_prompt())
        .parse_mode(ParseMode::Html)
        .await?;
    Ok(())
}

/// Message received while a payment screenshot is expected
pub async fn screenshot_received(
    bot: Bot,
    dialogue: MyDialogue,
    msg: Message,
    payment_id: i64,
    config: Arc<PremiumConfig>,
    db: Db,
) -> HandlerResult {
    // Largest size comes last
    let Some(photo) = msg.photo().and_then(|sizes| sizes.last()) else {
        bot.send_message(
            msg.chat.id,
            "Please send the payment screenshot as a photo, or /cancel to stop.",
        )
        .await?;
        return Ok(());
    };
    let file_id = photo.file.id.clone();

    match db.attach_screenshot(payment_id, &file_id).await {
        Ok(()) => {}
        Err(BotError::InvalidState(_) | BotError::NotFound(_)) => {
            dialogue.exit().await?;
            bot.send_message(msg.chat.id, "This payment is no longer waiting for a screenshot.")
                .await?;
            return Ok(());
        }
        Err(e) => return Err(e),
    }
    dialogue.exit().await?;

    bot.send_message(msg.chat.id, texts::screenshot_received())
        .parse_mode(ParseMode::Html)
        .await?;

    let payment = db
        .get_payment(payment_id)
        .await?
        .ok_or_else(|| BotError::not_found(format!("payment {}", payment_id)))?;
    send_for_review(&bot, &config, &db, &payment, file_id).await?;

    log::info!("Payment {} submitted for review", payment_id);
    Ok(())
}

/// Post the screenshot to the admin with Approve/Reject buttons
pub(crate) async fn send_for_review(
    bot: &Bot,
    config: &PremiumConfig,
    db: &Db,
    payment: &Payment,
    screenshot: String,
) -> HandlerResult {
    let username = db
        .get_user(payment.user_id)
        .await?
        .and_then(|u| u.username);

    bot.send_photo(config.admin_id, InputFile::file_id(screenshot))
        .caption(texts::admin_review(
            payment,
            config.catalog.name_of(&payment.channel_key),
            username.as_deref(),
        ))
        .parse_mode(ParseMode::Html)
        .reply_markup(keyboards::admin_review(payment.id))
        .await?;
    Ok(())
}
