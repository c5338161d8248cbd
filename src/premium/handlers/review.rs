use chrono::Utc;
use teloxide::{prelude::*, types::ParseMode};

use crate::{
    catalog::ChannelPlan,
    config::PremiumConfig,
    db::{Db, Payment, PaymentStatus},
    errors::{BotError, HandlerResult},
    premium::{
        access::{self, Delivery},
        handlers::ignore_not_modified,
        texts,
    },
    subscription::Subscription,
};

/// Answer the admin's button press when the payment could not be resolved.
/// The payment is left as it was, so nothing needs to be undone.
async fn refuse(bot: &Bot, query: &CallbackQuery, payment_id: i64, error: BotError) -> HandlerResult {
    let notice = match error {
        BotError::InvalidState(_) => "This payment has already been processed.".to_string(),
        BotError::NotFound(_) => "Payment not found.".to_string(),
        BotError::InvalidParameters(msg) => msg,
        e => {
            log::error!("Failed to resolve payment {}: {}", payment_id, e);
            "Could not process this payment, it is still pending. Please try again.".to_string()
        }
    };

    bot.answer_callback_query(query.id.clone())
        .text(notice)
        .show_alert(true)
        .await?;
    Ok(())
}

pub async fn approve(
    bot: &Bot,
    query: &CallbackQuery,
    config: &PremiumConfig,
    db: &Db,
    payment_id: i64,
) -> HandlerResult {
    let approval = match db.approve_payment(payment_id, &config.catalog, Utc::now()).await {
        Ok(approval) => approval,
        Err(e) => return refuse(bot, query, payment_id, e).await,
    };
    bot.answer_callback_query(query.id.clone())
        .text("Payment approved")
        .await?;

    let subscription = approval.activation.subscription();
    let delivery = deliver_access(bot, &approval.plan, subscription).await;

    let verdict = texts::approval_verdict(subscription.expires_at, delivery);
    mark_reviewed(bot, query, config, db, &approval.payment, &verdict).await
}

pub async fn reject(
    bot: &Bot,
    query: &CallbackQuery,
    config: &PremiumConfig,
    db: &Db,
    payment_id: i64,
) -> HandlerResult {
    let payment = match db.resolve_payment(payment_id, PaymentStatus::Rejected).await {
        Ok(payment) => payment,
        Err(e) => return refuse(bot, query, payment_id, e).await,
    };
    bot.answer_callback_query(query.id.clone())
        .text("Payment rejected")
        .await?;

    let verdict = match bot
        .send_message(access::user_id(payment.user_id), texts::rejected_user())
        .parse_mode(ParseMode::Html)
        .await
    {
        Ok(_) => "❌ <b>Rejected</b>",
        Err(e) => {
            log::warn!("Could not notify user {} about rejection: {}", payment.user_id, e);
            "❌ <b>Rejected</b>, user could not be notified."
        }
    };

    mark_reviewed(bot, query, config, db, &payment, verdict).await
}

/// Send the subscriber an invite link and the expiry date. Failures are
/// logged and reported back; without a link or a message the admin has to
/// reach the user by hand.
pub(crate) async fn deliver_access(
    bot: &Bot,
    plan: &ChannelPlan,
    subscription: &Subscription,
) -> Delivery {
    let user = access::user_id(subscription.user_id);

    let link = match plan.channel_id {
        Some(channel_id) => match access::grant_access(bot, channel_id, user).await {
            Ok(link) => Some(link),
            Err(e) => {
                log::error!("Failed to create invite link for {} in {}: {}", user, plan.key, e);
                None
            }
        },
        None => {
            log::warn!("Plan {} has no channel configured", plan.key);
            None
        }
    };

    let notified = match bot
        .send_message(
            user,
            texts::approved_user(&plan.name, subscription.expires_at, link.as_deref()),
        )
        .parse_mode(ParseMode::Html)
        .await
    {
        Ok(_) => true,
        Err(e) => {
            log::warn!("Could not send access details to user {}: {}", user, e);
            false
        }
    };

    Delivery {
        invited: link.is_some(),
        notified,
    }
}

/// Replace the review buttons under the admin's message with the outcome
async fn mark_reviewed(
    bot: &Bot,
    query: &CallbackQuery,
    config: &PremiumConfig,
    db: &Db,
    payment: &Payment,
    verdict: &str,
) -> HandlerResult {
    let Some(message) = query.regular_message() else {
        return Ok(());
    };

    let username = db.get_user(payment.user_id).await?.and_then(|u| u.username);
    let caption = format!(
        "{}\n\n{}",
        texts::admin_review(
            payment,
            config.catalog.name_of(&payment.channel_key),
            username.as_deref()
        ),
        verdict
    );

    let result = if message.photo().is_some() {
        bot.edit_message_caption(message.chat.id, message.id)
            .caption(caption)
            .parse_mode(ParseMode::Html)
            .await
    } else {
        bot.edit_message_text(message.chat.id, message.id, caption)
            .parse_mode(ParseMode::Html)
            .await
    };
    ignore_not_modified(result)
}
