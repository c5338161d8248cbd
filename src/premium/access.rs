//! Channel membership for subscribers.
//!
//! Bots cannot add users to a channel directly. Access is granted with a
//! personal single-use invite link and revoked by banning the user and
//! lifting the ban right away, which removes them without blocking a later
//! re-subscription.

use chrono::{Duration, Utc};
use teloxide::{ApiError, RequestError, prelude::*};

use crate::errors::BotResult;

/// How long a personal invite link stays usable
pub const INVITE_LINK_TTL_HOURS: i64 = 24;

/// What reached the subscriber after an activation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    /// A personal invite link was created
    pub invited: bool,
    /// The approval message reached the user
    pub notified: bool,
}

pub fn user_id(raw: i64) -> UserId {
    UserId(raw as u64)
}

/// Create a single-use invite link for `user`. A ban left over from an
/// earlier expiry is lifted first so the link actually works.
pub async fn grant_access(bot: &Bot, channel_id: ChatId, user: UserId) -> BotResult<String> {
    bot.unban_chat_member(channel_id, user)
        .only_if_banned(true)
        .await?;

    let link = bot
        .create_chat_invite_link(channel_id)
        .name(format!("sub-{}", user.0))
        .member_limit(1)
        .expire_date(Utc::now() + Duration::hours(INVITE_LINK_TTL_HOURS))
        .await?;

    log::info!("Invite link created for user {} in channel {}", user, channel_id);
    Ok(link.invite_link)
}

/// Remove `user` from the channel. A user who already left counts as removed.
pub async fn revoke_access(bot: &Bot, channel_id: ChatId, user: UserId) -> BotResult<()> {
    match bot.ban_chat_member(channel_id, user).await {
        Ok(_) => {}
        Err(RequestError::Api(ApiError::UserNotFound)) => {
            log::info!("User {} is no longer in channel {}", user, channel_id);
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    }
    bot.unban_chat_member(channel_id, user).await?;

    log::info!("Removed user {} from channel {}", user, channel_id);
    Ok(())
}
