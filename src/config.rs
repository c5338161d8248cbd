//! Environment-driven configuration for both bots.
//!
//! Values come from the process environment (a `.env` file is loaded by
//! `main` through `dotenvy`). Every loader also accepts a lookup closure so the
//! parsing rules can be exercised without touching the real environment.

use std::{path::PathBuf, str::FromStr};

use teloxide::types::{ChatId, UserId};

use crate::{
    catalog::{Catalog, MAX_VALIDITY_DAYS},
    errors::{BotError, BotResult},
};

const DEFAULT_PREMIUM_DATABASE_URL: &str = "sqlite://premium_bot.db?mode=rwc";
const DEFAULT_WATERMARK_DATABASE_URL: &str = "sqlite://watermark_bot.db?mode=rwc";
const DEFAULT_UPI_ID: &str = "example@upi";
const DEFAULT_QR_CODE_URL: &str = "https://example.com/qr-code.png";
const DEFAULT_WELCOME_IMAGE_URL: &str = "https://envs.sh/jYU.jpg";
const DEFAULT_REMINDER_DAYS: i64 = 3;
const DEFAULT_MAX_VIDEO_MB: u64 = 50;

/// Largest file the Bot API `getFile` method will serve.
pub const BOT_API_DOWNLOAD_LIMIT_MB: u64 = 20;

/// Where and how users pay for a plan.
#[derive(Debug, Clone)]
pub struct PaymentDetails {
    pub upi_id: String,
    pub qr_code_url: String,
}

#[derive(Debug, Clone)]
pub struct PremiumConfig {
    pub bot_token: String,
    pub admin_id: UserId,
    pub database_url: String,
    pub catalog: Catalog,
    pub payment: PaymentDetails,
    pub welcome_image_url: String,
    /// Days before expiry when the renewal reminder goes out.
    pub reminder_days: i64,
    /// UTC hour of the daily expiry run.
    pub schedule_hour_utc: u32,
}

impl PremiumConfig {
    pub fn from_env() -> BotResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> BotResult<Self> {
        let bot_token = required(&get, "BOT_TOKEN")?;
        let admin_id = UserId(parse_required::<u64>(&get, "ADMIN_ID")?);

        let catalog = match non_empty(&get, "CHANNELS_FILE") {
            Some(path) => {
                let raw = std::fs::read_to_string(&path).map_err(|e| {
                    BotError::config(format!("Cannot read CHANNELS_FILE {}: {}", path, e))
                })?;
                Catalog::from_json(&raw)?
            }
            None => Catalog::default_plans(|key| get(key))?,
        };

        let schedule_hour_utc = parse_or(&get, "SCHEDULE_HOUR_UTC", 0u32)?;
        if schedule_hour_utc > 23 {
            return Err(BotError::config("SCHEDULE_HOUR_UTC must be between 0 and 23"));
        }

        let reminder_days = parse_or(&get, "REMINDER_DAYS", DEFAULT_REMINDER_DAYS)?;
        if !(0..=i64::from(MAX_VALIDITY_DAYS)).contains(&reminder_days) {
            return Err(BotError::config(format!(
                "REMINDER_DAYS must be between 0 and {}",
                MAX_VALIDITY_DAYS
            )));
        }

        Ok(Self {
            bot_token,
            admin_id,
            database_url: non_empty(&get, "DATABASE_URL")
                .unwrap_or_else(|| DEFAULT_PREMIUM_DATABASE_URL.to_string()),
            catalog,
            payment: PaymentDetails {
                upi_id: non_empty(&get, "UPI_ID").unwrap_or_else(|| DEFAULT_UPI_ID.to_string()),
                qr_code_url: non_empty(&get, "QR_CODE_URL")
                    .unwrap_or_else(|| DEFAULT_QR_CODE_URL.to_string()),
            },
            welcome_image_url: non_empty(&get, "WELCOME_IMAGE_URL")
                .unwrap_or_else(|| DEFAULT_WELCOME_IMAGE_URL.to_string()),
            reminder_days,
            schedule_hour_utc,
        })
    }

    pub fn is_admin(&self, user_id: UserId) -> bool {
        self.admin_id == user_id
    }
}

#[derive(Debug, Clone)]
pub struct WatermarkConfig {
    pub bot_token: String,
    pub database_url: String,
    /// Archive channel for processed videos, overridable at runtime via /setup.
    pub database_channel_id: Option<ChatId>,
    /// Only this user may run /setup when set.
    pub admin_id: Option<UserId>,
    pub max_video_bytes: u64,
    pub work_dir: PathBuf,
}

impl WatermarkConfig {
    pub fn from_env() -> BotResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> BotResult<Self> {
        let bot_token = required(&get, "TELEGRAM_BOT_TOKEN")?;

        let database_channel_id = match non_empty(&get, "DATABASE_CHANNEL_ID") {
            Some(raw) => Some(normalize_channel_id(&raw)?),
            None => None,
        };

        let admin_id = match non_empty(&get, "ADMIN_ID") {
            Some(raw) => Some(UserId(raw.parse().map_err(|_| {
                BotError::config(format!("ADMIN_ID must be a user id, got {:?}", raw))
            })?)),
            None => None,
        };

        let max_video_mb = parse_or(&get, "MAX_VIDEO_MB", DEFAULT_MAX_VIDEO_MB)?;
        let max_video_bytes = max_video_mb
            .checked_mul(1024 * 1024)
            .ok_or_else(|| BotError::config(format!("MAX_VIDEO_MB is too large: {}", max_video_mb)))?;
        if max_video_mb > BOT_API_DOWNLOAD_LIMIT_MB {
            log::warn!(
                "MAX_VIDEO_MB is {} but bots can only download files up to {} MB",
                max_video_mb,
                BOT_API_DOWNLOAD_LIMIT_MB
            );
        }

        Ok(Self {
            bot_token,
            database_url: non_empty(&get, "DATABASE_URL")
                .unwrap_or_else(|| DEFAULT_WATERMARK_DATABASE_URL.to_string()),
            database_channel_id,
            admin_id,
            max_video_bytes,
            work_dir: non_empty(&get, "WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("work")),
        })
    }

    pub fn may_setup(&self, user_id: UserId) -> bool {
        self.admin_id.is_none_or(|admin| admin == user_id)
    }
}

/// Channel ids may be given without the `-100` prefix Telegram uses for
/// supergroups and channels; add it when missing.
pub fn normalize_channel_id(raw: &str) -> BotResult<ChatId> {
    let raw = raw.trim();
    let normalized = if raw.starts_with('-') {
        raw.to_string()
    } else {
        format!("-100{}", raw)
    };

    normalized
        .parse::<i64>()
        .map(ChatId)
        .map_err(|_| BotError::invalid_parameters(format!("Invalid channel id: {}", raw)))
}

fn non_empty(get: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    get(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn required(get: &impl Fn(&str) -> Option<String>, key: &str) -> BotResult<String> {
    non_empty(get, key).ok_or_else(|| BotError::config(format!("{} is not set", key)))
}

fn parse_required<T: FromStr>(get: &impl Fn(&str) -> Option<String>, key: &str) -> BotResult<T> {
    let raw = required(get, key)?;
    raw.parse()
        .map_err(|_| BotError::config(format!("{} has invalid value {:?}", key, raw)))
}

fn parse_or<T: FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> BotResult<T> {
    match non_empty(get, key) {
        Some(raw) => raw
            .parse()
            .map_err(|_| BotError::config(format!("{} has invalid value {:?}", key, raw))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn premium_config_requires_token_and_admin() {
        let err = PremiumConfig::from_lookup(env(&[("ADMIN_ID", "1")])).unwrap_err();
        assert!(err.to_string().contains("BOT_TOKEN"));

        let err = PremiumConfig::from_lookup(env(&[("BOT_TOKEN", "t")])).unwrap_err();
        assert!(err.to_string().contains("ADMIN_ID"));

        let err =
            PremiumConfig::from_lookup(env(&[("BOT_TOKEN", "t"), ("ADMIN_ID", "abc")])).unwrap_err();
        assert!(matches!(err, BotError::Config(_)));
    }

    #[test]
    fn premium_config_defaults() {
        let config = PremiumConfig::from_lookup(env(&[
            ("BOT_TOKEN", "token"),
            ("ADMIN_ID", "42"),
            ("CHANNEL_ID_1", "-1001234"),
        ]))
        .unwrap();

        assert_eq!(config.admin_id, UserId(42));
        assert!(config.is_admin(UserId(42)));
        assert!(!config.is_admin(UserId(7)));
        assert_eq!(config.reminder_days, 3);
        assert_eq!(config.schedule_hour_utc, 0);
        assert_eq!(config.database_url, DEFAULT_PREMIUM_DATABASE_URL);
        assert_eq!(config.payment.upi_id, DEFAULT_UPI_ID);
        assert_eq!(config.catalog.len(), 6);
        assert_eq!(
            config.catalog.get("study_data_1").unwrap().channel_id,
            Some(ChatId(-1001234))
        );
    }

    #[test]
    fn premium_config_rejects_bad_schedule_hour() {
        let err = PremiumConfig::from_lookup(env(&[
            ("BOT_TOKEN", "token"),
            ("ADMIN_ID", "42"),
            ("SCHEDULE_HOUR_UTC", "24"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("SCHEDULE_HOUR_UTC"));
    }

    #[test]
    fn watermark_config_parses_limits_and_channel() {
        let config = WatermarkConfig::from_lookup(env(&[
            ("TELEGRAM_BOT_TOKEN", "token"),
            ("DATABASE_CHANNEL_ID", "555"),
            ("MAX_VIDEO_MB", "10"),
        ]))
        .unwrap();

        assert_eq!(config.database_channel_id, Some(ChatId(-100555)));
        assert_eq!(config.max_video_bytes, 10 * 1024 * 1024);
        assert_eq!(config.work_dir, PathBuf::from("work"));
        assert!(config.may_setup(UserId(1)));
    }

    #[test]
    fn watermark_config_rejects_overflowing_size_limit() {
        let err = WatermarkConfig::from_lookup(env(&[
            ("TELEGRAM_BOT_TOKEN", "token"),
            ("MAX_VIDEO_MB", &u64::MAX.to_string()),
        ]))
        .unwrap_err();
        assert!(matches!(err, BotError::Config(_)));
        assert!(err.to_string().contains("MAX_VIDEO_MB"));
    }

    #[test]
    fn premium_config_rejects_malformed_channel_id() {
        let err = PremiumConfig::from_lookup(env(&[
            ("BOT_TOKEN", "token"),
            ("ADMIN_ID", "42"),
            ("CHANNEL_ID_3", "abc"),
        ]))
        .unwrap_err();
        assert!(matches!(err, BotError::Config(_)));
        assert!(err.to_string().contains("CHANNEL_ID_3"));
    }

    #[test]
    fn watermark_setup_restricted_to_admin_when_configured() {
        let config = WatermarkConfig::from_lookup(env(&[
            ("TELEGRAM_BOT_TOKEN", "token"),
            ("ADMIN_ID", "9"),
        ]))
        .unwrap();

        assert!(config.may_setup(UserId(9)));
        assert!(!config.may_setup(UserId(10)));
    }

    #[test]
    fn channel_id_normalization() {
        assert_eq!(normalize_channel_id("12345").unwrap(), ChatId(-10012345));
        assert_eq!(normalize_channel_id("-10012345").unwrap(), ChatId(-10012345));
        assert_eq!(normalize_channel_id(" -987 ").unwrap(), ChatId(-987));
        assert!(normalize_channel_id("channel").is_err());
    }
}
