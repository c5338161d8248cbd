use chrono::{DateTime, Duration, NaiveTime, Utc};
use sqlx::{Row, SqliteConnection, SqlitePool, sqlite::SqliteRow};
use std::str::FromStr;
use std::sync::Arc;
use strum::{AsRefStr, Display, EnumString};

use crate::db::timestamp;
use crate::errors::{BotError, BotResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Expired,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Subscription {
    pub id: i64,
    pub user_id: i64,
    pub channel_key: String,
    pub status: SubscriptionStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub reminded_at: Option<DateTime<Utc>>,
}

impl Subscription {
    pub fn days_left(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at - now).num_days().max(0)
    }
}

/// Outcome of activating a plan for a user
#[derive(Debug, Clone, PartialEq)]
pub enum Activation {
    Created(Subscription),
    Extended(Subscription),
}

impl Activation {
    pub fn subscription(&self) -> &Subscription {
        match self {
            Activation::Created(s) | Activation::Extended(s) => s,
        }
    }
}

const SUBSCRIPTION_COLUMNS: &str =
    "id, user_id, channel_key, status, created_at, expires_at, reminded_at";

fn subscription_from_row(row: &SqliteRow) -> BotResult<Subscription> {
    Ok(Subscription {
        id: row.get("id"),
        user_id: row.get("user_id"),
        channel_key: row.get("channel_key"),
        status: SubscriptionStatus::from_str(row.get::<&str, _>("status"))?,
        created_at: timestamp(row.get("created_at")),
        expires_at: timestamp(row.get("expires_at")),
        reminded_at: row.get::<Option<i64>, _>("reminded_at").map(timestamp),
    })
}

/// Bounds of the UTC calendar day `days` after `now`, both inclusive.
pub fn day_window(now: DateTime<Utc>, days: i64) -> (DateTime<Utc>, DateTime<Utc>) {
    let day = (now + Duration::days(days)).date_naive();
    let start = day.and_time(NaiveTime::MIN).and_utc();
    let end = start + Duration::days(1) - Duration::seconds(1);
    (start, end)
}

/// `from` moved forward by `validity_days`, refusing periods past chrono's range
fn extend(from: DateTime<Utc>, validity_days: u32) -> BotResult<DateTime<Utc>> {
    from.checked_add_signed(Duration::days(i64::from(validity_days)))
        .ok_or_else(|| {
            BotError::invalid_parameters(format!(
                "{} days from {} is out of range",
                validity_days, from
            ))
        })
}

/// Create or extend a subscription on `conn`, so callers can make it part of
/// a larger transaction.
pub(crate) async fn activate_on(
    conn: &mut SqliteConnection,
    user_id: i64,
    channel_key: &str,
    validity_days: u32,
    now: DateTime<Utc>,
) -> BotResult<Activation> {
    let current = sqlx::query(&format!(
        "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions \
         WHERE user_id = ? AND channel_key = ? AND status = 'active' AND expires_at > ? \
         ORDER BY expires_at DESC LIMIT 1"
    ))
    .bind(user_id)
    .bind(channel_key)
    .bind(now.timestamp())
    .fetch_optional(&mut *conn)
    .await?
    .as_ref()
    .map(subscription_from_row)
    .transpose()?;

    if let Some(mut subscription) = current {
        // Extend from current expiration
        subscription.expires_at = extend(subscription.expires_at, validity_days)?;
        subscription.reminded_at = None;

        sqlx::query("UPDATE subscriptions SET expires_at = ?, reminded_at = NULL WHERE id = ?")
            .bind(subscription.expires_at.timestamp())
            .bind(subscription.id)
            .execute(&mut *conn)
            .await?;

        log::info!(
            "Subscription {} of user {} to {} extended until {}",
            subscription.id,
            user_id,
            channel_key,
            subscription.expires_at
        );
        return Ok(Activation::Extended(subscription));
    }

    let expires_at = extend(now, validity_days)?;
    let result = sqlx::query(
        "INSERT INTO subscriptions (user_id, channel_key, status, created_at, expires_at) VALUES (?, ?, 'active', ?, ?)",
    )
    .bind(user_id)
    .bind(channel_key)
    .bind(now.timestamp())
    .bind(expires_at.timestamp())
    .execute(&mut *conn)
    .await?;

    log::info!(
        "Subscription added for user {} to {}: expires at {}",
        user_id,
        channel_key,
        expires_at
    );

    Ok(Activation::Created(Subscription {
        id: result.last_insert_rowid(),
        user_id,
        channel_key: channel_key.to_string(),
        status: SubscriptionStatus::Active,
        created_at: timestamp(now.timestamp()),
        expires_at: timestamp(expires_at.timestamp()),
        reminded_at: None,
    }))
}

/// Subscription manager handles premium subscriptions storage
#[derive(Clone)]
pub struct SubscriptionManager {
    pool: Arc<SqlitePool>,
}

impl SubscriptionManager {
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self { pool }
    }

    /// Activate a plan after an approved payment. An active subscription to the
    /// same channel is extended from its current expiry instead of starting over.
    pub async fn activate(
        &self,
        user_id: i64,
        channel_key: &str,
        validity_days: u32,
        now: DateTime<Utc>,
    ) -> BotResult<Activation> {
        let mut tx = self.pool.begin().await?;
        let activation = activate_on(&mut tx, user_id, channel_key, validity_days, now).await?;
        tx.commit().await?;
        Ok(activation)
    }

    pub async fn get(&self, subscription_id: i64) -> BotResult<Option<Subscription>> {
        let row = sqlx::query(&format!(
            "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions WHERE id = ?"
        ))
        .bind(subscription_id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        row.as_ref().map(subscription_from_row).transpose()
    }

    pub async fn user_subscriptions(&self, user_id: i64) -> BotResult<Vec<Subscription>> {
        let rows = sqlx::query(&format!(
            "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions WHERE user_id = ? ORDER BY expires_at"
        ))
        .bind(user_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        rows.iter().map(subscription_from_row).collect()
    }

    /// Subscriptions the user can currently use. Rows the expiry job has not
    /// reached yet are filtered out by their expiry time.
    pub async fn active_subscriptions(&self, user_id: i64, now: DateTime<Utc>) -> BotResult<Vec<Subscription>> {
        Ok(self
            .user_subscriptions(user_id)
            .await?
            .into_iter()
            .filter(|s| s.status == SubscriptionStatus::Active && s.expires_at > now)
            .collect())
    }

    /// Active, not yet reminded subscriptions expiring within `[start, end]`
    pub async fn expiring_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> BotResult<Vec<Subscription>> {
        let rows = sqlx::query(&format!(
            "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions \
             WHERE status = 'active' AND reminded_at IS NULL AND expires_at >= ? AND expires_at <= ? \
             ORDER BY expires_at"
        ))
        .bind(start.timestamp())
        .bind(end.timestamp())
        .fetch_all(self.pool.as_ref())
        .await?;

        rows.iter().map(subscription_from_row).collect()
    }

    /// Subscriptions still marked active although their time ran out
    pub async fn expired(&self, now: DateTime<Utc>) -> BotResult<Vec<Subscription>> {
        let rows = sqlx::query(&format!(
            "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions \
             WHERE status = 'active' AND expires_at < ? ORDER BY expires_at"
        ))
        .bind(now.timestamp())
        .fetch_all(self.pool.as_ref())
        .await?;

        rows.iter().map(subscription_from_row).collect()
    }

    pub async fn mark_expired(&self, subscription_id: i64) -> BotResult<()> {
        sqlx::query("UPDATE subscriptions SET status = 'expired' WHERE id = ?")
            .bind(subscription_id)
            .execute(self.pool.as_ref())
            .await?;
        Ok(())
    }

    pub async fn mark_reminded(&self, subscription_id: i64, now: DateTime<Utc>) -> BotResult<()> {
        sqlx::query("UPDATE subscriptions SET reminded_at = ? WHERE id = ?")
            .bind(now.timestamp())
            .bind(subscription_id)
            .execute(self.pool.as_ref())
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::migrations::memory_pool;

    async fn manager() -> SubscriptionManager {
        SubscriptionManager::new(Arc::new(memory_pool().await))
    }

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn day_window_covers_whole_utc_day() {
        let (start, end) = day_window(at(2024, 1, 30, 15), 3);
        assert_eq!(start, at(2024, 2, 2, 0));
        assert_eq!(end, Utc.with_ymd_and_hms(2024, 2, 2, 23, 59, 59).unwrap());
    }

    #[tokio::test]
    async fn activation_creates_then_extends() {
        let manager = manager().await;
        let now = at(2024, 3, 1, 12);

        let first = manager.activate(7, "study_data_1", 30, now).await.unwrap();
        let Activation::Created(created) = &first else {
            panic!("expected a new subscription, got {:?}", first);
        };
        assert_eq!(created.expires_at, at(2024, 3, 31, 12));
        assert_eq!(created.days_left(now), 30);

        let later = at(2024, 3, 20, 12);
        let renewed = manager.activate(7, "study_data_1", 30, later).await.unwrap();
        let Activation::Extended(extended) = &renewed else {
            panic!("expected an extension, got {:?}", renewed);
        };
        assert_eq!(extended.id, created.id);
        assert_eq!(extended.expires_at, at(2024, 4, 30, 12));

        let other_channel = manager.activate(7, "study_data_2", 45, later).await.unwrap();
        assert!(matches!(other_channel, Activation::Created(_)));
        assert_eq!(manager.user_subscriptions(7).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn out_of_range_validity_is_refused_without_writing() {
        let manager = manager().await;
        let now = at(2024, 3, 1, 12);

        let err = manager.activate(1, "study_data_1", u32::MAX, now).await.unwrap_err();
        assert!(matches!(err, BotError::InvalidParameters(_)));
        assert!(manager.user_subscriptions(1).await.unwrap().is_empty());

        let created = manager.activate(1, "study_data_1", 30, now).await.unwrap();
        let err = manager.activate(1, "study_data_1", u32::MAX, now).await.unwrap_err();
        assert!(matches!(err, BotError::InvalidParameters(_)));

        let stored = manager.get(created.subscription().id).await.unwrap().unwrap();
        assert_eq!(stored.expires_at, at(2024, 3, 31, 12));
    }

    #[tokio::test]
    async fn renewal_after_expiry_starts_from_now() {
        let manager = manager().await;
        let start = at(2024, 1, 1, 0);
        manager.activate(3, "a", 10, start).await.unwrap();

        let after_expiry = at(2024, 2, 1, 0);
        let activation = manager.activate(3, "a", 10, after_expiry).await.unwrap();
        assert!(matches!(activation, Activation::Created(_)));
        assert_eq!(activation.subscription().expires_at, at(2024, 2, 11, 0));
    }

    #[tokio::test]
    async fn expired_and_active_queries() {
        let manager = manager().await;
        let now = at(2024, 6, 15, 0);
        let old = manager.activate(1, "a", 5, at(2024, 6, 1, 0)).await.unwrap();
        let fresh = manager.activate(1, "b", 30, at(2024, 6, 10, 0)).await.unwrap();

        let expired = manager.expired(now).await.unwrap();
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].id, old.subscription().id);

        let active = manager.active_subscriptions(1, now).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, fresh.subscription().id);

        manager.mark_expired(old.subscription().id).await.unwrap();
        assert!(manager.expired(now).await.unwrap().is_empty());
        let stored = manager.get(old.subscription().id).await.unwrap().unwrap();
        assert_eq!(stored.status, SubscriptionStatus::Expired);
    }

    #[tokio::test]
    async fn reminders_are_sent_once_per_period() {
        let manager = manager().await;
        let now = at(2024, 5, 1, 0);
        let sub = manager.activate(9, "a", 3, now).await.unwrap();
        manager.activate(9, "b", 10, now).await.unwrap();

        let (start, end) = day_window(now, 3);
        let due = manager.expiring_between(start, end).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, sub.subscription().id);

        manager.mark_reminded(due[0].id, now).await.unwrap();
        assert!(manager.expiring_between(start, end).await.unwrap().is_empty());

        // renewing clears the reminder flag for the next period
        let renewed = manager.activate(9, "a", 3, now).await.unwrap();
        assert_eq!(renewed.subscription().reminded_at, None);
        let (start, end) = day_window(now, 6);
        assert_eq!(manager.expiring_between(start, end).await.unwrap().len(), 1);
    }
}
