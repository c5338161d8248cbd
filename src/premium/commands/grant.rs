use std::sync::Arc;

use chrono::Utc;
use teloxide::prelude::*;

use crate::{
    catalog::MAX_VALIDITY_DAYS,
    config::PremiumConfig,
    errors::HandlerResult,
    premium::{handlers::deliver_access, texts},
    subscription::{Activation, SubscriptionManager},
};

const USAGE: &str = "Usage: /grant <user_id> <channel_key> [days]\nExample: /grant 578503618 study_data_1 30";

#[derive(Debug, PartialEq)]
struct GrantArgs {
    user_id: i64,
    channel_key: String,
    days: Option<u32>,
}

fn parse_args(args: &str) -> Result<GrantArgs, String> {
    let parts: Vec<&str> = args.split_whitespace().collect();
    if !(2..=3).contains(&parts.len()) {
        return Err(USAGE.to_string());
    }

    let user_id = parts[0]
        .parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or("Invalid user_id. Must be a number.")?;

    let days = match parts.get(2) {
        Some(raw) => Some(
            raw.parse::<u32>()
                .ok()
                .filter(|d| (1..=MAX_VALIDITY_DAYS).contains(d))
                .ok_or_else(|| {
                    format!("Invalid days. Must be a number from 1 to {}.", MAX_VALIDITY_DAYS)
                })?,
        ),
        None => None,
    };

    Ok(GrantArgs {
        user_id,
        channel_key: parts[1].to_string(),
        days,
    })
}

/// Handle /grant command - admin only
/// Usage: /grant <user_id> <channel_key> [days]
pub async fn grant(
    bot: Bot,
    msg: Message,
    args: String,
    config: Arc<PremiumConfig>,
    subscriptions: SubscriptionManager,
) -> HandlerResult {
    let is_admin = msg.from.as_ref().is_some_and(|u| config.is_admin(u.id));
    if !is_admin {
        // Silently ignore for non-admins
        return Ok(());
    }

    let args = match parse_args(&args) {
        Ok(args) => args,
        Err(e) => {
            bot.send_message(msg.chat.id, e).await?;
            return Ok(());
        }
    };

    let Some(plan) = config.catalog.get(&args.channel_key) else {
        let keys: Vec<&str> = config.catalog.iter().map(|p| p.key.as_str()).collect();
        bot.send_message(
            msg.chat.id,
            format!("Unknown channel. Available: {}", keys.join(", ")),
        )
        .await?;
        return Ok(());
    };

    let days = args.days.unwrap_or(plan.validity_days);
    let activation = match subscriptions
        .activate(args.user_id, &plan.key, days, Utc::now())
        .await
    {
        Ok(activation) => activation,
        Err(e) => {
            bot.send_message(msg.chat.id, format!("Error: {}", e)).await?;
            return Ok(());
        }
    };
    log::info!("Admin granted {} days of {} to {}", days, plan.key, args.user_id);

    let subscription = activation.subscription();
    let delivery = deliver_access(&bot, plan, subscription).await;

    let text = format!(
        "Subscription {}!\n\nUser: {}\nChannel: {}\nDays: {}\nExpires: {}\nInvite link sent: {}",
        match activation {
            Activation::Created(_) => "granted",
            Activation::Extended(_) => "extended",
        },
        args.user_id,
        plan.name,
        days,
        texts::format_date(subscription.expires_at),
        if delivery.invited && delivery.notified { "yes" } else { "no" }
    );
    bot.send_message(msg.chat.id, text).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_user_channel_and_optional_days() {
        assert_eq!(
            parse_args("578503618 study_data_1 30").unwrap(),
            GrantArgs {
                user_id: 578503618,
                channel_key: "study_data_1".into(),
                days: Some(30),
            }
        );
        assert_eq!(parse_args("  12   maths ").unwrap().days, None);
    }

    #[test]
    fn rejects_bad_arguments() {
        assert_eq!(parse_args("").unwrap_err(), USAGE);
        assert_eq!(parse_args("12").unwrap_err(), USAGE);
        assert_eq!(parse_args("12 a 3 extra").unwrap_err(), USAGE);
        assert!(parse_args("abc maths").unwrap_err().starts_with("Invalid user_id"));
        assert!(parse_args("-5 maths").unwrap_err().starts_with("Invalid user_id"));
        assert!(parse_args("12 maths 0").unwrap_err().starts_with("Invalid days"));
        assert!(parse_args("12 maths x").unwrap_err().starts_with("Invalid days"));
    }

    #[test]
    fn days_are_capped_at_ten_years() {
        assert_eq!(parse_args("12 maths 3650").unwrap().days, Some(3650));
        assert!(parse_args("12 maths 3651").unwrap_err().starts_with("Invalid days"));
        assert!(parse_args("12 maths 4294967295").unwrap_err().contains("1 to 3650"));
    }
}
