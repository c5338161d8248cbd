//! Premium channel plans offered by the subscription bot.

use std::collections::HashSet;

use serde::Deserialize;
use teloxide::types::ChatId;

use crate::{
    config::normalize_channel_id,
    errors::{BotError, BotResult},
};

pub const UNKNOWN_CHANNEL: &str = "Unknown Channel";

/// Keys travel inside callback data, which Telegram caps at 64 bytes.
const MAX_KEY_LEN: usize = 40;

/// Longest period a single plan or manual grant may cover.
pub const MAX_VALIDITY_DAYS: u32 = 3650;

#[derive(Debug, Clone, PartialEq)]
pub struct ChannelPlan {
    /// Stable identifier used in callback data and subscription records.
    pub key: String,
    pub name: String,
    /// Target channel; plans without one cannot grant access yet.
    pub channel_id: Option<ChatId>,
    /// Price in rupees.
    pub price: u32,
    pub validity_days: u32,
    pub description: String,
    pub preview_images: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawPlan {
    key: String,
    name: String,
    #[serde(default)]
    channel_id: Option<String>,
    price: u32,
    validity_days: u32,
    #[serde(default)]
    description: String,
    #[serde(default)]
    preview_images: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    plans: Vec<ChannelPlan>,
}

impl Catalog {
    pub fn new(plans: Vec<ChannelPlan>) -> BotResult<Self> {
        let mut seen = HashSet::new();
        for plan in &plans {
            if !seen.insert(plan.key.as_str()) {
                return Err(BotError::config(format!("Duplicate plan key {}", plan.key)));
            }
            if plan.key.is_empty() || plan.key.len() > MAX_KEY_LEN || plan.key.contains(':') {
                return Err(BotError::config(format!("Invalid plan key {:?}", plan.key)));
            }
            if !(1..=MAX_VALIDITY_DAYS).contains(&plan.validity_days) {
                return Err(BotError::config(format!(
                    "Plan {} must have a validity between 1 and {} days",
                    plan.key, MAX_VALIDITY_DAYS
                )));
            }
        }
        Ok(Self { plans })
    }

    /// Parse a JSON array of plans. `channel_id` accepts the same forms as
    /// the environment (with or without the `-100` prefix).
    pub fn from_json(raw: &str) -> BotResult<Self> {
        let raw_plans: Vec<RawPlan> = serde_json::from_str(raw)?;
        let plans = raw_plans
            .into_iter()
            .map(|p| {
                let channel_id = match p.channel_id.as_deref().map(str::trim) {
                    Some("") | None => None,
                    Some(id) => Some(normalize_channel_id(id)?),
                };
                Ok(ChannelPlan {
                    key: p.key,
                    name: p.name,
                    channel_id,
                    price: p.price,
                    validity_days: p.validity_days,
                    description: p.description,
                    preview_images: p.preview_images,
                })
            })
            .collect::<BotResult<Vec<_>>>()?;
        Self::new(plans)
    }

    /// The six stock study-material plans. Channel ids are read from
    /// `CHANNEL_ID_1` .. `CHANNEL_ID_6`; an unset id leaves the plan without a
    /// channel, a malformed one is a configuration error.
    pub fn default_plans(get: impl Fn(&str) -> Option<String>) -> BotResult<Self> {
        const PLANS: [(u32, u32, &str); 6] = [
            (499, 30, "Complete study material for beginners"),
            (699, 45, "Advanced study resources for intermediate level"),
            (899, 60, "Premium materials for advanced students"),
            (1099, 90, "Expert level materials with practice sets"),
            (1499, 120, "Complete preparation package with mock tests"),
            (1999, 180, "Comprehensive package with personal guidance"),
        ];

        let plans = PLANS
            .iter()
            .enumerate()
            .map(|(idx, (price, validity_days, description))| {
                let n = idx + 1;
                let var = format!("CHANNEL_ID_{}", n);
                let channel_id = match get(&var).filter(|v| !v.trim().is_empty()) {
                    Some(raw) => Some(normalize_channel_id(&raw).map_err(|_| {
                        BotError::config(format!("{} has invalid value {:?}", var, raw))
                    })?),
                    None => {
                        log::warn!("{} is not set, plan study_data_{} cannot grant access", var, n);
                        None
                    }
                };

                Ok(ChannelPlan {
                    key: format!("study_data_{}", n),
                    name: format!("Study Data {}", n),
                    channel_id,
                    price: *price,
                    validity_days: *validity_days,
                    description: description.to_string(),
                    preview_images: vec![
                        format!("https://example.com/channel{}_preview1.jpg", n),
                        format!("https://example.com/channel{}_preview2.jpg", n),
                    ],
                })
            })
            .collect::<BotResult<Vec<_>>>()?;

        Self::new(plans)
    }

    pub fn get(&self, key: &str) -> Option<&ChannelPlan> {
        self.plans.iter().find(|p| p.key == key)
    }

    pub fn by_channel_id(&self, channel_id: ChatId) -> Option<&ChannelPlan> {
        self.plans.iter().find(|p| p.channel_id == Some(channel_id))
    }

    /// Display name for a plan key, falling back to a placeholder for plans
    /// that were removed from the catalogue.
    pub fn name_of(&self, key: &str) -> &str {
        self.get(key).map_or(UNKNOWN_CHANNEL, |p| p.name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChannelPlan> {
        self.plans.iter()
    }

    pub fn len(&self) -> usize {
        self.plans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_plans_keep_order_and_prices() {
        let catalog = Catalog::default_plans(|key| {
            (key == "CHANNEL_ID_2").then(|| "-100200".to_string())
        })
        .unwrap();

        let keys: Vec<_> = catalog.iter().map(|p| p.key.as_str()).collect();
        assert_eq!(
            keys,
            [
                "study_data_1",
                "study_data_2",
                "study_data_3",
                "study_data_4",
                "study_data_5",
                "study_data_6"
            ]
        );

        let plan = catalog.get("study_data_2").unwrap();
        assert_eq!(plan.price, 699);
        assert_eq!(plan.validity_days, 45);
        assert_eq!(plan.channel_id, Some(ChatId(-100200)));
        assert_eq!(plan.preview_images.len(), 2);
        assert_eq!(catalog.get("study_data_1").unwrap().channel_id, None);
        assert_eq!(
            catalog.by_channel_id(ChatId(-100200)).map(|p| p.key.as_str()),
            Some("study_data_2")
        );
    }

    #[test]
    fn unknown_plan_name_falls_back() {
        let catalog = Catalog::default_plans(|_| None).unwrap();
        assert_eq!(catalog.name_of("study_data_6"), "Study Data 6");
        assert_eq!(catalog.name_of("gone"), UNKNOWN_CHANNEL);
    }

    #[test]
    fn json_catalog_parses_and_normalizes_ids() {
        let catalog = Catalog::from_json(
            r#"[
                {"key": "maths", "name": "Maths", "channel_id": "777", "price": 100, "validity_days": 7},
                {"key": "physics", "name": "Physics", "price": 200, "validity_days": 14,
                 "preview_images": ["https://example.com/p.jpg"]}
            ]"#,
        )
        .unwrap();

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get("maths").unwrap().channel_id, Some(ChatId(-100777)));
        assert!(catalog.get("maths").unwrap().preview_images.is_empty());
        assert_eq!(catalog.get("physics").unwrap().channel_id, None);
    }

    #[test]
    fn json_catalog_rejects_invalid_plans() {
        let duplicate = r#"[
            {"key": "a", "name": "A", "price": 1, "validity_days": 1},
            {"key": "a", "name": "B", "price": 1, "validity_days": 1}
        ]"#;
        assert!(matches!(Catalog::from_json(duplicate), Err(BotError::Config(_))));

        let zero_days = r#"[{"key": "a", "name": "A", "price": 1, "validity_days": 0}]"#;
        assert!(matches!(Catalog::from_json(zero_days), Err(BotError::Config(_))));

        let colon = r#"[{"key": "a:b", "name": "A", "price": 1, "validity_days": 3}]"#;
        assert!(Catalog::from_json(colon).is_err());

        let long_key = format!(
            r#"[{{"key": "{}", "name": "A", "price": 1, "validity_days": 3}}]"#,
            "k".repeat(41)
        );
        assert!(Catalog::from_json(&long_key).is_err());

        let decade_plus = r#"[{"key": "a", "name": "A", "price": 1, "validity_days": 3651}]"#;
        assert!(matches!(Catalog::from_json(decade_plus), Err(BotError::Config(_))));

        let decade = r#"[{"key": "a", "name": "A", "price": 1, "validity_days": 3650}]"#;
        assert!(Catalog::from_json(decade).is_ok());

        assert!(matches!(Catalog::from_json("{"), Err(BotError::Parse(_))));
    }

    #[test]
    fn malformed_default_channel_id_is_a_config_error() {
        let err = Catalog::default_plans(|key| {
            (key == "CHANNEL_ID_4").then(|| "not-a-channel".to_string())
        })
        .unwrap_err();

        assert!(matches!(err, BotError::Config(_)));
        assert!(err.to_string().contains("CHANNEL_ID_4"));

        let blank = Catalog::default_plans(|key| (key == "CHANNEL_ID_4").then(|| "  ".to_string()));
        assert_eq!(blank.unwrap().get("study_data_4").unwrap().channel_id, None);
    }
}
