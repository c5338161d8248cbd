use std::sync::Arc;

use teloxide::{
    prelude::*,
    types::ParseMode,
};

use crate::{
    config::PremiumConfig,
    db::Db,
    errors::HandlerResult,
    premium::{handlers::send_for_review, texts},
};

/// Screenshots re-posted with review buttons per /pending call
const MAX_REPOSTED: usize = 10;

/// Handle /pending command - admin only
pub async fn pending(bot: Bot, msg: Message, config: Arc<PremiumConfig>, db: Db) -> HandlerResult {
    let is_admin = msg.from.as_ref().is_some_and(|u| config.is_admin(u.id));
    if !is_admin {
        // Silently ignore for non-admins
        return Ok(());
    }

    let payments = db.pending_payments().await?;
    bot.send_message(msg.chat.id, texts::pending_list(&payments, &config.catalog))
        .parse_mode(ParseMode::Html)
        .await?;

    for payment in payments.iter().take(MAX_REPOSTED) {
        let Some(file_id) = payment.screenshot_file_id.clone() else {
            continue;
        };
        if let Err(e) = send_for_review(&bot, &config, &db, payment, file_id).await {
            log::error!("Failed to repost payment {}: {}", payment.id, e);
        }
    }
    Ok(())
}
