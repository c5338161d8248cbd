//! Daily subscription maintenance: expire lapsed subscriptions, remove their
//! users from the channel and remind users whose access ends soon.

use std::{future::Future, sync::Arc};

use chrono::{DateTime, Duration, NaiveTime, Utc};
use teloxide::{
    prelude::*,
    types::{InlineKeyboardMarkup, ParseMode},
};
use tokio::sync::oneshot;

use crate::{
    config::PremiumConfig,
    errors::BotResult,
    premium::{access, keyboards, texts},
    subscription::{Subscription, SubscriptionManager, day_window},
};

/// Counters of one maintenance run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    pub expired: usize,
    pub reminded: usize,
    pub failed: usize,
}

/// Time left until the next `hour`:00 UTC strictly after `now`.
pub fn until_next_run(now: DateTime<Utc>, hour: u32) -> Duration {
    let time = NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or(NaiveTime::MIN);
    let today = now.date_naive().and_time(time).and_utc();
    let next = if today > now {
        today
    } else {
        today + Duration::days(1)
    };
    next - now
}

/// Telegram calls the maintenance run depends on
pub trait Subscribers: Send + Sync {
    /// Remove `user` from the channel
    fn revoke(&self, channel_id: ChatId, user: UserId) -> impl Future<Output = BotResult<()>> + Send;

    /// Send an HTML message with a keyboard
    fn send(
        &self,
        user: UserId,
        text: String,
        markup: InlineKeyboardMarkup,
    ) -> impl Future<Output = BotResult<()>> + Send;
}

impl Subscribers for Bot {
    async fn revoke(&self, channel_id: ChatId, user: UserId) -> BotResult<()> {
        access::revoke_access(self, channel_id, user).await
    }

    async fn send(&self, user: UserId, text: String, markup: InlineKeyboardMarkup) -> BotResult<()> {
        self.send_message(user, text)
            .parse_mode(ParseMode::Html)
            .reply_markup(markup)
            .await?;
        Ok(())
    }
}

pub struct ExpiryScheduler<S = Bot> {
    telegram: S,
    subscriptions: SubscriptionManager,
    config: Arc<PremiumConfig>,
}

impl<S: Subscribers> ExpiryScheduler<S> {
    pub fn new(telegram: S, subscriptions: SubscriptionManager, config: Arc<PremiumConfig>) -> Self {
        Self {
            telegram,
            subscriptions,
            config,
        }
    }

    /// Run once right away, then daily at the configured hour until
    /// `shutdown` fires.
    pub async fn run(self, mut shutdown: oneshot::Receiver<()>) {
        log::info!(
            "Expiry scheduler started, daily run at {:02}:00 UTC",
            self.config.schedule_hour_utc
        );

        loop {
            match self.run_once(Utc::now()).await {
                Ok(report) => log::info!(
                    "Subscription check done: {} expired, {} reminded, {} failed",
                    report.expired,
                    report.reminded,
                    report.failed
                ),
                Err(e) => log::error!("Subscription check failed: {}", e),
            }

            let wait = until_next_run(Utc::now(), self.config.schedule_hour_utc)
                .to_std()
                .unwrap_or_default();
            log::debug!("Next subscription check in {:?}", wait);

            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = &mut shutdown => {
                    log::info!("Expiry scheduler stopped");
                    return;
                }
            }
        }
    }

    /// One maintenance pass. A failure on one subscription is logged and
    /// does not stop the others.
    pub async fn run_once(&self, now: DateTime<Utc>) -> BotResult<RunReport> {
        let mut report = RunReport::default();

        for sub in self.subscriptions.expired(now).await? {
            match self.expire(&sub).await {
                Ok(()) => report.expired += 1,
                Err(e) => {
                    report.failed += 1;
                    log::error!("Failed to expire subscription {}: {}", sub.id, e);
                }
            }
        }

        let (start, end) = day_window(now, self.config.reminder_days);
        for sub in self.subscriptions.expiring_between(start, end).await? {
            match self.remind(&sub, now).await {
                Ok(()) => report.reminded += 1,
                Err(e) => {
                    report.failed += 1;
                    log::error!("Failed to remind about subscription {}: {}", sub.id, e);
                }
            }
        }

        Ok(report)
    }

    /// Revoke first and only then mark the subscription expired, so a failed
    /// removal is retried on the next run.
    async fn expire(&self, sub: &Subscription) -> BotResult<()> {
        let catalog = &self.config.catalog;
        let user = access::user_id(sub.user_id);

        match catalog.get(&sub.channel_key).and_then(|p| p.channel_id) {
            Some(channel_id) => self.telegram.revoke(channel_id, user).await?,
            None => log::warn!(
                "Subscription {} expired but {} has no channel configured",
                sub.id,
                sub.channel_key
            ),
        }

        self.subscriptions.mark_expired(sub.id).await?;
        log::info!("Subscription {} of user {} expired", sub.id, sub.user_id);

        if let Err(e) = self
            .telegram
            .send(
                user,
                texts::expired_notice(catalog.name_of(&sub.channel_key)),
                keyboards::renewal(&sub.channel_key),
            )
            .await
        {
            log::warn!("Could not notify user {} about expiry: {}", sub.user_id, e);
        }
        Ok(())
    }

    async fn remind(&self, sub: &Subscription, now: DateTime<Utc>) -> BotResult<()> {
        let name = self.config.catalog.name_of(&sub.channel_key);

        self.telegram
            .send(
                access::user_id(sub.user_id),
                texts::renewal_reminder(name, sub.expires_at, self.config.reminder_days),
                keyboards::renewal(&sub.channel_key),
            )
            .await?;

        self.subscriptions.mark_reminded(sub.id, now).await?;
        log::info!("Sent renewal reminder for subscription {}", sub.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashSet, sync::Mutex};

    use chrono::TimeZone;

    use super::*;
    use crate::{
        catalog::Catalog,
        config::PaymentDetails,
        errors::BotError,
        migrations::memory_pool,
        subscription::SubscriptionStatus,
    };

    /// Records every call; removals and messages fail for the listed users.
    struct FakeTelegram {
        subscriptions: SubscriptionManager,
        failing_revokes: HashSet<u64>,
        failing_sends: HashSet<u64>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeTelegram {
        fn new(subscriptions: SubscriptionManager) -> Self {
            Self {
                subscriptions,
                failing_revokes: HashSet::new(),
                failing_sends: HashSet::new(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl Subscribers for FakeTelegram {
        async fn revoke(&self, channel_id: ChatId, user: UserId) -> BotResult<()> {
            // status at the moment of removal, to check the ordering
            let statuses: Vec<_> = self
                .subscriptions
                .user_subscriptions(user.0 as i64)
                .await?
                .into_iter()
                .map(|s| s.status)
                .collect();
            self.calls
                .lock()
                .unwrap()
                .push(format!("revoke {} from {} while {:?}", user.0, channel_id, statuses));

            if self.failing_revokes.contains(&user.0) {
                return Err(BotError::general("kick failed"));
            }
            Ok(())
        }

        async fn send(&self, user: UserId, text: String, _markup: InlineKeyboardMarkup) -> BotResult<()> {
            if self.failing_sends.contains(&user.0) {
                return Err(BotError::general("bot was blocked by the user"));
            }
            let kind = if text.contains("has expired") { "expired" } else { "reminder" };
            self.calls.lock().unwrap().push(format!("{} to {}", kind, user.0));
            Ok(())
        }
    }

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    fn config() -> Arc<PremiumConfig> {
        let catalog = Catalog::default_plans(|key| match key {
            "CHANNEL_ID_1" => Some("-1001".to_string()),
            "CHANNEL_ID_2" => Some("-1002".to_string()),
            _ => None,
        })
        .unwrap();

        Arc::new(PremiumConfig {
            bot_token: "token".into(),
            admin_id: UserId(1),
            database_url: "sqlite::memory:".into(),
            catalog,
            payment: PaymentDetails {
                upi_id: "pay@upi".into(),
                qr_code_url: "https://example.com/qr.png".into(),
            },
            welcome_image_url: "https://example.com/welcome.jpg".into(),
            reminder_days: 3,
            schedule_hour_utc: 0,
        })
    }

    async fn status_of(subscriptions: &SubscriptionManager, user_id: i64) -> SubscriptionStatus {
        subscriptions.user_subscriptions(user_id).await.unwrap()[0].status
    }

    #[test]
    fn next_run_is_later_today_or_tomorrow() {
        let morning = at(2024, 5, 10, 6) + Duration::minutes(30);
        assert_eq!(until_next_run(morning, 9), Duration::minutes(150));
        assert_eq!(until_next_run(morning, 0), Duration::minutes(17 * 60 + 30));

        let exactly = at(2024, 5, 10, 9);
        assert_eq!(until_next_run(exactly, 9), Duration::days(1));
    }

    #[tokio::test]
    async fn failed_removal_keeps_subscription_for_next_run() {
        let subscriptions = SubscriptionManager::new(Arc::new(memory_pool().await));
        let now = at(2024, 6, 15, 0);
        subscriptions.activate(11, "study_data_1", 30, at(2024, 5, 1, 0)).await.unwrap();
        subscriptions.activate(12, "study_data_2", 30, at(2024, 5, 2, 0)).await.unwrap();
        // plan without a channel
        subscriptions.activate(13, "study_data_3", 30, at(2024, 5, 3, 0)).await.unwrap();
        // expires 18 Jun, three days ahead
        subscriptions.activate(14, "study_data_1", 30, at(2024, 5, 19, 12)).await.unwrap();

        let mut telegram = FakeTelegram::new(subscriptions.clone());
        telegram.failing_revokes.insert(12);
        let scheduler = ExpiryScheduler::new(telegram, subscriptions.clone(), config());

        let report = scheduler.run_once(now).await.unwrap();
        assert_eq!(
            report,
            RunReport {
                expired: 2,
                reminded: 1,
                failed: 1
            }
        );

        assert_eq!(status_of(&subscriptions, 11).await, SubscriptionStatus::Expired);
        assert_eq!(status_of(&subscriptions, 12).await, SubscriptionStatus::Active);
        assert_eq!(status_of(&subscriptions, 13).await, SubscriptionStatus::Expired);
        assert_eq!(status_of(&subscriptions, 14).await, SubscriptionStatus::Active);

        assert_eq!(
            scheduler.telegram.calls(),
            [
                "revoke 11 from -1001 while [Active]",
                "expired to 11",
                "revoke 12 from -1002 while [Active]",
                "expired to 13",
                "reminder to 14",
            ]
        );

        // the failed removal is retried, the reminder is not repeated
        let report = scheduler.run_once(now).await.unwrap();
        assert_eq!(
            report,
            RunReport {
                expired: 0,
                reminded: 0,
                failed: 1
            }
        );
        assert_eq!(
            scheduler.telegram.calls().last().map(String::as_str),
            Some("revoke 12 from -1002 while [Active]")
        );
    }

    #[tokio::test]
    async fn unreachable_users_are_still_expired_but_not_marked_reminded() {
        let subscriptions = SubscriptionManager::new(Arc::new(memory_pool().await));
        let now = at(2024, 6, 15, 0);

        subscriptions.activate(21, "study_data_1", 30, at(2024, 5, 1, 0)).await.unwrap();
        subscriptions.activate(22, "study_data_2", 30, at(2024, 5, 19, 12)).await.unwrap();

        let mut telegram = FakeTelegram::new(subscriptions.clone());
        telegram.failing_sends.extend([21, 22]);
        let scheduler = ExpiryScheduler::new(telegram, subscriptions.clone(), config());

        let report = scheduler.run_once(now).await.unwrap();
        assert_eq!(
            report,
            RunReport {
                expired: 1,
                reminded: 0,
                failed: 1
            }
        );
        assert_eq!(status_of(&subscriptions, 21).await, SubscriptionStatus::Expired);

        let reminder = &subscriptions.user_subscriptions(22).await.unwrap()[0];
        assert_eq!(reminder.reminded_at, None);
    }
}
