//! Record store for users, payments and watermark bot state.
//! Works with raw SQL; rows are mapped into the typed records below.

use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::{Row, SqliteConnection, SqlitePool, sqlite::SqliteRow};
use strum::{AsRefStr, Display, EnumString};

use crate::{
    catalog::{Catalog, ChannelPlan},
    errors::{BotError, BotResult},
    subscription::{self, Activation},
    video::{Opacity, WatermarkPosition},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum PaymentMethod {
    Upi,
    Qr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Payment {
    pub id: i64,
    pub user_id: i64,
    pub channel_key: String,
    pub amount: i64,
    pub method: Option<PaymentMethod>,
    pub status: PaymentStatus,
    pub screenshot_file_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserRecord {
    pub user_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub last_seen: DateTime<Utc>,
}

/// Saved watermark settings. `text` is only known once the user typed it.
#[derive(Debug, Clone, PartialEq)]
pub struct WatermarkPrefs {
    pub position: WatermarkPosition,
    pub opacity: Opacity,
    pub text: Option<String>,
}

impl WatermarkPrefs {
    /// Complete settings can be reapplied without asking anything.
    pub fn complete(&self) -> Option<(&str, WatermarkPosition, Opacity)> {
        self.text
            .as_deref()
            .map(|text| (text, self.position, self.opacity))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum ActivityStatus {
    Success,
    Error,
}

pub(crate) fn timestamp(value: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(value, 0).unwrap_or_default()
}

fn payment_from_row(row: &SqliteRow) -> BotResult<Payment> {
    let method = row
        .get::<Option<String>, _>("method")
        .map(|m| PaymentMethod::from_str(&m))
        .transpose()?;

    Ok(Payment {
        id: row.get("id"),
        user_id: row.get("user_id"),
        channel_key: row.get("channel_key"),
        amount: row.get("amount"),
        method,
        status: PaymentStatus::from_str(row.get::<&str, _>("status"))?,
        screenshot_file_id: row.get("screenshot_file_id"),
        created_at: timestamp(row.get("created_at")),
    })
}

const PAYMENT_COLUMNS: &str =
    "id, user_id, channel_key, amount, method, status, screenshot_file_id, created_at";

async fn fetch_payment(conn: &mut SqliteConnection, payment_id: i64) -> BotResult<Option<Payment>> {
    let row = sqlx::query(&format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = ?"))
        .bind(payment_id)
        .fetch_optional(&mut *conn)
        .await?;

    row.as_ref().map(payment_from_row).transpose()
}

async fn resolve_on(
    conn: &mut SqliteConnection,
    payment_id: i64,
    status: PaymentStatus,
) -> BotResult<Payment> {
    if status == PaymentStatus::Pending {
        return Err(BotError::invalid_parameters("A payment cannot be resolved to pending"));
    }

    let result = sqlx::query(
        "UPDATE payments SET status = ?, updated_at = ? WHERE id = ? AND status = 'pending'",
    )
    .bind(status.as_ref())
    .bind(Utc::now().timestamp())
    .bind(payment_id)
    .execute(&mut *conn)
    .await?;

    let payment = fetch_payment(conn, payment_id)
        .await?
        .ok_or_else(|| BotError::not_found(format!("payment {}", payment_id)))?;

    if result.rows_affected() == 0 {
        return Err(BotError::invalid_state(format!(
            "Payment {} is already {}",
            payment_id, payment.status
        )));
    }
    Ok(payment)
}

/// A payment approved together with the subscription it paid for
#[derive(Debug, Clone)]
pub struct Approval {
    pub payment: Payment,
    pub plan: ChannelPlan,
    pub activation: Activation,
}

#[derive(Clone)]
pub struct Db {
    pool: Arc<SqlitePool>,
}

impl Db {
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> Arc<SqlitePool> {
        self.pool.clone()
    }

    // ==================== Users ====================

    /// Register the user on first contact and refresh profile fields afterwards
    pub async fn upsert_user(
        &self,
        user_id: i64,
        username: Option<&str>,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> BotResult<()> {
        let now = Utc::now().timestamp();

        sqlx::query(
            r#"
            INSERT INTO users (user_id, username, first_name, last_name, created_at, last_seen)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                username = excluded.username,
                first_name = excluded.first_name,
                last_name = excluded.last_name,
                last_seen = excluded.last_seen
            "#,
        )
        .bind(user_id)
        .bind(username)
        .bind(first_name)
        .bind(last_name)
        .bind(now)
        .bind(now)
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }

    pub async fn get_user(&self, user_id: i64) -> BotResult<Option<UserRecord>> {
        let row = sqlx::query(
            "SELECT user_id, username, first_name, last_name, last_seen FROM users WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(|row| UserRecord {
            user_id: row.get("user_id"),
            username: row.get("username"),
            first_name: row.get("first_name"),
            last_name: row.get("last_name"),
            last_seen: timestamp(row.get("last_seen")),
        }))
    }

    // ==================== Payments ====================

    pub async fn create_payment(&self, user_id: i64, channel_key: &str, amount: i64) -> BotResult<i64> {
        let now = Utc::now().timestamp();

        let result = sqlx::query(
            "INSERT INTO payments (user_id, channel_key, amount, status, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(channel_key)
        .bind(amount)
        .bind(PaymentStatus::Pending.as_ref())
        .bind(now)
        .bind(now)
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.last_insert_rowid())
    }

    pub async fn get_payment(&self, payment_id: i64) -> BotResult<Option<Payment>> {
        let mut conn = self.pool.acquire().await?;
        fetch_payment(&mut conn, payment_id).await
    }

    pub async fn set_payment_method(&self, payment_id: i64, method: PaymentMethod) -> BotResult<()> {
        self.update_pending(
            payment_id,
            "UPDATE payments SET method = ?, updated_at = ? WHERE id = ? AND status = 'pending'",
            method.as_ref(),
        )
        .await
    }

    pub async fn attach_screenshot(&self, payment_id: i64, file_id: &str) -> BotResult<()> {
        self.update_pending(
            payment_id,
            "UPDATE payments SET screenshot_file_id = ?, updated_at = ? WHERE id = ? AND status = 'pending'",
            file_id,
        )
        .await
    }

    async fn update_pending(&self, payment_id: i64, sql: &str, value: &str) -> BotResult<()> {
        let result = sqlx::query(sql)
            .bind(value)
            .bind(Utc::now().timestamp())
            .bind(payment_id)
            .execute(self.pool.as_ref())
            .await?;

        if result.rows_affected() == 0 {
            return Err(match self.get_payment(payment_id).await? {
                Some(p) => BotError::invalid_state(format!("Payment {} is already {}", p.id, p.status)),
                None => BotError::not_found(format!("payment {}", payment_id)),
            });
        }
        Ok(())
    }

    /// Move a pending payment to its final status. The status check happens in
    /// the UPDATE itself, so concurrent resolutions cannot both succeed.
    pub async fn resolve_payment(&self, payment_id: i64, status: PaymentStatus) -> BotResult<Payment> {
        let mut conn = self.pool.acquire().await?;
        let payment = resolve_on(&mut conn, payment_id, status).await?;
        log::info!("Payment {} marked {}", payment_id, status);
        Ok(payment)
    }

    /// Approve a pending payment and activate its plan in one transaction.
    /// Any failure leaves the payment pending and no subscription behind, so
    /// the admin can simply press Approve again.
    pub async fn approve_payment(
        &self,
        payment_id: i64,
        catalog: &Catalog,
        now: DateTime<Utc>,
    ) -> BotResult<Approval> {
        let mut tx = self.pool.begin().await?;

        let payment = resolve_on(&mut tx, payment_id, PaymentStatus::Approved).await?;
        let plan = catalog.get(&payment.channel_key).cloned().ok_or_else(|| {
            BotError::invalid_parameters(format!(
                "Channel {} is not configured, activate it manually with /grant",
                payment.channel_key
            ))
        })?;
        let activation =
            subscription::activate_on(&mut tx, payment.user_id, &plan.key, plan.validity_days, now)
                .await?;

        tx.commit().await?;
        log::info!("Payment {} approved", payment_id);

        Ok(Approval {
            payment,
            plan,
            activation,
        })
    }

    /// Payments with a screenshot that still wait for the admin, oldest first
    pub async fn pending_payments(&self) -> BotResult<Vec<Payment>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, channel_key, amount, method, status, screenshot_file_id, created_at
            FROM payments
            WHERE status = 'pending' AND screenshot_file_id IS NOT NULL
            ORDER BY created_at, id
            "#,
        )
        .fetch_all(self.pool.as_ref())
        .await?;

        rows.iter().map(payment_from_row).collect()
    }

    // ==================== Watermark preferences ====================

    pub async fn get_prefs(&self, user_id: i64) -> BotResult<Option<WatermarkPrefs>> {
        let row = sqlx::query("SELECT position, opacity, text FROM watermark_prefs WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(self.pool.as_ref())
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let opacity: i64 = row.get("opacity");
        Ok(Some(WatermarkPrefs {
            position: WatermarkPosition::from_str(row.get::<&str, _>("position"))?,
            opacity: Opacity::from_percent(opacity as u8).ok_or_else(|| {
                BotError::Parse(format!("Stored opacity {} is not supported", opacity))
            })?,
            text: row.get("text"),
        }))
    }

    /// Store position and opacity; previously saved text is dropped because it
    /// belongs to the old settings.
    pub async fn save_prefs(&self, user_id: i64, position: WatermarkPosition, opacity: Opacity) -> BotResult<()> {
        sqlx::query(
            r#"
            INSERT INTO watermark_prefs (user_id, position, opacity, text, updated_at) VALUES (?, ?, ?, NULL, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                position = excluded.position,
                opacity = excluded.opacity,
                text = NULL,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(user_id)
        .bind(position.as_ref())
        .bind(i64::from(opacity.percent()))
        .bind(Utc::now().timestamp())
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }

    pub async fn save_prefs_text(&self, user_id: i64, text: &str) -> BotResult<()> {
        let result = sqlx::query("UPDATE watermark_prefs SET text = ?, updated_at = ? WHERE user_id = ?")
            .bind(text)
            .bind(Utc::now().timestamp())
            .bind(user_id)
            .execute(self.pool.as_ref())
            .await?;

        if result.rows_affected() == 0 {
            return Err(BotError::not_found(format!("watermark settings of user {}", user_id)));
        }
        Ok(())
    }

    /// Returns whether anything was deleted
    pub async fn clear_prefs(&self, user_id: i64) -> BotResult<bool> {
        let result = sqlx::query("DELETE FROM watermark_prefs WHERE user_id = ?")
            .bind(user_id)
            .execute(self.pool.as_ref())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // ==================== Activity log ====================

    pub async fn log_activity(
        &self,
        user_id: i64,
        action: &str,
        status: ActivityStatus,
        details: Option<serde_json::Value>,
    ) -> BotResult<()> {
        sqlx::query(
            "INSERT INTO activity_log (user_id, action, status, details, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(action)
        .bind(status.as_ref())
        .bind(details.map(|d| d.to_string()))
        .bind(Utc::now().timestamp())
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }

    /// Same as [`Db::log_activity`], but failures only end up in the log.
    pub async fn record(&self, user_id: i64, action: &str, status: ActivityStatus, details: Option<serde_json::Value>) {
        if let Err(e) = self.log_activity(user_id, action, status, details).await {
            log::error!("Failed to log activity {} for user {}: {}", action, user_id, e);
        }
    }

    // ==================== Settings ====================

    pub async fn get_setting(&self, key: &str) -> BotResult<Option<String>> {
        let value = sqlx::query_scalar::<_, String>("SELECT value FROM bot_settings WHERE key = ?")
            .bind(key)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(value)
    }

    pub async fn set_setting(&self, key: &str, value: &str) -> BotResult<()> {
        sqlx::query(
            r#"
            INSERT INTO bot_settings (key, value, updated_at) VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now().timestamp())
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations::memory_pool;

    async fn db() -> Db {
        Db::new(Arc::new(memory_pool().await))
    }

    #[tokio::test]
    async fn upsert_user_refreshes_profile() {
        let db = db().await;
        db.upsert_user(1, Some("old"), Some("Ann"), None).await.unwrap();
        db.upsert_user(1, Some("new"), Some("Ann"), Some("Lee")).await.unwrap();

        let user = db.get_user(1).await.unwrap().unwrap();
        assert_eq!(user.username.as_deref(), Some("new"));
        assert_eq!(user.last_name.as_deref(), Some("Lee"));
        assert!(db.get_user(2).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn payment_starts_pending_and_records_details() {
        let db = db().await;
        let id = db.create_payment(10, "study_data_1", 499).await.unwrap();

        let payment = db.get_payment(id).await.unwrap().unwrap();
        assert_eq!(payment.status, PaymentStatus::Pending);
        assert_eq!(payment.method, None);
        assert_eq!(payment.amount, 499);

        db.set_payment_method(id, PaymentMethod::Qr).await.unwrap();
        db.attach_screenshot(id, "file-abc").await.unwrap();

        let payment = db.get_payment(id).await.unwrap().unwrap();
        assert_eq!(payment.method, Some(PaymentMethod::Qr));
        assert_eq!(payment.screenshot_file_id.as_deref(), Some("file-abc"));
    }

    #[tokio::test]
    async fn payment_resolves_only_once() {
        let db = db().await;
        let id = db.create_payment(10, "study_data_1", 499).await.unwrap();

        let approved = db.resolve_payment(id, PaymentStatus::Approved).await.unwrap();
        assert_eq!(approved.status, PaymentStatus::Approved);

        let again = db.resolve_payment(id, PaymentStatus::Rejected).await;
        assert!(matches!(again, Err(BotError::InvalidState(_))));

        let late_method = db.set_payment_method(id, PaymentMethod::Upi).await;
        assert!(matches!(late_method, Err(BotError::InvalidState(_))));

        let missing = db.resolve_payment(999, PaymentStatus::Approved).await;
        assert!(matches!(missing, Err(BotError::NotFound(_))));

        let to_pending = db.resolve_payment(id, PaymentStatus::Pending).await;
        assert!(matches!(to_pending, Err(BotError::InvalidParameters(_))));
    }

    fn catalog() -> Catalog {
        Catalog::new(vec![ChannelPlan {
            key: "maths".into(),
            name: "Maths".into(),
            channel_id: None,
            price: 100,
            validity_days: 30,
            description: String::new(),
            preview_images: Vec::new(),
        }])
        .unwrap()
    }

    fn subscriptions_of(db: &Db) -> crate::subscription::SubscriptionManager {
        crate::subscription::SubscriptionManager::new(db.pool())
    }

    #[tokio::test]
    async fn approval_activates_the_paid_plan() {
        let db = db().await;
        let now = Utc::now();
        let id = db.create_payment(21, "maths", 100).await.unwrap();

        let approval = db.approve_payment(id, &catalog(), now).await.unwrap();
        assert_eq!(approval.payment.status, PaymentStatus::Approved);
        assert_eq!(approval.plan.key, "maths");
        assert!(matches!(approval.activation, Activation::Created(_)));
        assert_eq!(
            approval.activation.subscription().expires_at.timestamp(),
            (now + chrono::Duration::days(30)).timestamp()
        );

        let again = db.approve_payment(id, &catalog(), now).await;
        assert!(matches!(again, Err(BotError::InvalidState(_))));
        assert_eq!(subscriptions_of(&db).user_subscriptions(21).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failed_approval_leaves_payment_pending() {
        let db = db().await;
        let id = db.create_payment(22, "removed_plan", 100).await.unwrap();

        let err = db.approve_payment(id, &catalog(), Utc::now()).await.unwrap_err();
        assert!(matches!(err, BotError::InvalidParameters(_)));

        let payment = db.get_payment(id).await.unwrap().unwrap();
        assert_eq!(payment.status, PaymentStatus::Pending);
        assert!(subscriptions_of(&db).user_subscriptions(22).await.unwrap().is_empty());

        // still resolvable by hand afterwards
        let rejected = db.resolve_payment(id, PaymentStatus::Rejected).await.unwrap();
        assert_eq!(rejected.status, PaymentStatus::Rejected);

        let missing = db.approve_payment(999, &catalog(), Utc::now()).await;
        assert!(matches!(missing, Err(BotError::NotFound(_))));
    }

    #[tokio::test]
    async fn pending_payments_only_lists_submitted_ones() {
        let db = db().await;
        let without_screenshot = db.create_payment(1, "a", 100).await.unwrap();
        let submitted = db.create_payment(2, "a", 100).await.unwrap();
        let resolved = db.create_payment(3, "a", 100).await.unwrap();

        db.attach_screenshot(submitted, "f1").await.unwrap();
        db.attach_screenshot(resolved, "f2").await.unwrap();
        db.resolve_payment(resolved, PaymentStatus::Rejected).await.unwrap();

        let pending: Vec<i64> = db.pending_payments().await.unwrap().iter().map(|p| p.id).collect();
        assert_eq!(pending, vec![submitted]);
        assert_ne!(pending[0], without_screenshot);
    }

    #[tokio::test]
    async fn watermark_prefs_lifecycle() {
        let db = db().await;
        assert!(db.get_prefs(5).await.unwrap().is_none());
        assert!(db.save_prefs_text(5, "hello").await.is_err());

        db.save_prefs(5, WatermarkPosition::LowerRight, Opacity::Half).await.unwrap();
        let prefs = db.get_prefs(5).await.unwrap().unwrap();
        assert_eq!(prefs.position, WatermarkPosition::LowerRight);
        assert_eq!(prefs.opacity, Opacity::Half);
        assert!(prefs.complete().is_none());

        db.save_prefs_text(5, "@mychannel").await.unwrap();
        let prefs = db.get_prefs(5).await.unwrap().unwrap();
        assert_eq!(
            prefs.complete(),
            Some(("@mychannel", WatermarkPosition::LowerRight, Opacity::Half))
        );

        db.save_prefs(5, WatermarkPosition::Center, Opacity::Full).await.unwrap();
        assert_eq!(db.get_prefs(5).await.unwrap().unwrap().text, None);

        assert!(db.clear_prefs(5).await.unwrap());
        assert!(!db.clear_prefs(5).await.unwrap());
    }

    #[tokio::test]
    async fn settings_are_upserted() {
        let db = db().await;
        assert_eq!(db.get_setting("database_channel").await.unwrap(), None);

        db.set_setting("database_channel", "-1001").await.unwrap();
        db.set_setting("database_channel", "-1002").await.unwrap();
        assert_eq!(
            db.get_setting("database_channel").await.unwrap().as_deref(),
            Some("-1002")
        );
    }

    #[tokio::test]
    async fn activity_is_logged() {
        let db = db().await;
        db.log_activity(1, "start", ActivityStatus::Success, None).await.unwrap();
        db.record(1, "screenshots", ActivityStatus::Error, Some(serde_json::json!({"error": "x"})))
            .await;

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM activity_log WHERE user_id = 1")
            .fetch_one(db.pool().as_ref())
            .await
            .unwrap();
        assert_eq!(count, 2);
    }
}
