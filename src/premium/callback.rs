//! Inline button payloads of the premium bot.
//!
//! Payloads are `verb[:arg[:arg]]`. Plan keys never contain `:` (the catalogue
//! rejects them), so splitting on it is unambiguous.

use std::{fmt, str::FromStr};

use crate::{db::PaymentMethod, errors::BotError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    /// Back to the channel list
    Menu,
    /// Open a plan with its first preview image
    Channel { key: String },
    /// Show preview image `index` of a plan
    Preview { key: String, index: usize },
    Subscribe { key: String },
    Renew { key: String },
    Pay { method: PaymentMethod, payment_id: i64 },
    /// User is about to send the payment screenshot
    Screenshot { payment_id: i64 },
    Approve { payment_id: i64 },
    Reject { payment_id: i64 },
}

impl fmt::Display for CallbackAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallbackAction::Menu => write!(f, "menu"),
            CallbackAction::Channel { key } => write!(f, "ch:{}", key),
            CallbackAction::Preview { key, index } => write!(f, "nav:{}:{}", key, index),
            CallbackAction::Subscribe { key } => write!(f, "sub:{}", key),
            CallbackAction::Renew { key } => write!(f, "renew:{}", key),
            CallbackAction::Pay { method, payment_id } => write!(f, "pay:{}:{}", method, payment_id),
            CallbackAction::Screenshot { payment_id } => write!(f, "shot:{}", payment_id),
            CallbackAction::Approve { payment_id } => write!(f, "ok:{}", payment_id),
            CallbackAction::Reject { payment_id } => write!(f, "no:{}", payment_id),
        }
    }
}

impl FromStr for CallbackAction {
    type Err = BotError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let invalid = || BotError::Parse(format!("Invalid callback data: {}", data));
        let id = |raw: &str| raw.parse::<i64>().map_err(|_| invalid());
        let key = |raw: &str| {
            if raw.is_empty() {
                Err(invalid())
            } else {
                Ok(raw.to_string())
            }
        };

        let parts: Vec<&str> = data.split(':').collect();
        let action = match parts.as_slice() {
            ["menu"] => CallbackAction::Menu,
            ["ch", k] => CallbackAction::Channel { key: key(*k)? },
            ["nav", k, index] => CallbackAction::Preview {
                key: key(*k)?,
                index: index.parse().map_err(|_| invalid())?,
            },
            ["sub", k] => CallbackAction::Subscribe { key: key(*k)? },
            ["renew", k] => CallbackAction::Renew { key: key(*k)? },
            ["pay", method, payment_id] => CallbackAction::Pay {
                method: method.parse().map_err(|_| invalid())?,
                payment_id: id(*payment_id)?,
            },
            ["shot", payment_id] => CallbackAction::Screenshot {
                payment_id: id(*payment_id)?,
            },
            ["ok", payment_id] => CallbackAction::Approve {
                payment_id: id(*payment_id)?,
            },
            ["no", payment_id] => CallbackAction::Reject {
                payment_id: id(*payment_id)?,
            },
            _ => return Err(invalid()),
        };
        Ok(action)
    }
}

impl CallbackAction {
    /// Only the admin may press these
    pub fn is_admin_only(&self) -> bool {
        matches!(
            self,
            CallbackAction::Approve { .. } | CallbackAction::Reject { .. }
        )
    }
}
