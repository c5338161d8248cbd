use std::sync::Arc;

use chrono::Utc;
use teloxide::{prelude::*, types::ParseMode};

use crate::{
    config::PremiumConfig, errors::HandlerResult, premium::texts,
    subscription::SubscriptionManager,
};

pub async fn subscriptions(
    bot: Bot,
    msg: Message,
    config: Arc<PremiumConfig>,
    subscriptions: SubscriptionManager,
) -> HandlerResult {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };

    let active = subscriptions
        .active_subscriptions(user.id.0 as i64, Utc::now())
        .await?;

    let text = if active.is_empty() {
        texts::no_active_subscriptions().to_string()
    } else {
        texts::subscriptions_list(&active, &config.catalog)
    };

    bot.send_message(msg.chat.id, text)
        .parse_mode(ParseMode::Html)
        .await?;
    Ok(())
}
