use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use crate::{
    catalog::Catalog,
    db::PaymentMethod,
    premium::callback::CallbackAction,
};

fn button(label: impl Into<String>, action: CallbackAction) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(label, action.to_string())
}

/// One button per plan, in catalogue order
pub fn main_menu(catalog: &Catalog) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(catalog.iter().map(|plan| {
        vec![button(
            plan.name.clone(),
            CallbackAction::Channel {
                key: plan.key.clone(),
            },
        )]
    }))
}

/// Preview navigation plus subscribe/back. Previous/Next only appear where a
/// neighbouring image exists.
pub fn channel_preview(key: &str, index: usize, total: usize) -> InlineKeyboardMarkup {
    let mut rows = Vec::new();

    if total > 1 {
        let mut nav = Vec::new();
        if index > 0 {
            nav.push(button(
                "◀️ Previous",
                CallbackAction::Preview {
                    key: key.to_string(),
                    index: index - 1,
                },
            ));
        }
        if index + 1 < total {
            nav.push(button(
                "Next ▶️",
                CallbackAction::Preview {
                    key: key.to_string(),
                    index: index + 1,
                },
            ));
        }
        rows.push(nav);
    }

    rows.push(vec![button(
        "🔒 Subscribe",
        CallbackAction::Subscribe {
            key: key.to_string(),
        },
    )]);
    rows.push(vec![button("🔙 Back to Channels", CallbackAction::Menu)]);

    InlineKeyboardMarkup::new(rows)
}

pub fn payment_methods(key: &str, payment_id: i64) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![
            button(
                "💳 UPI ID",
                CallbackAction::Pay {
                    method: PaymentMethod::Upi,
                    payment_id,
                },
            ),
            button(
                "📱 UPI QR Code",
                CallbackAction::Pay {
                    method: PaymentMethod::Qr,
                    payment_id,
                },
            ),
        ],
        vec![button(
            "📸 Send Payment Screenshot",
            CallbackAction::Screenshot { payment_id },
        )],
        vec![button(
            "🔙 Back",
            CallbackAction::Channel {
                key: key.to_string(),
            },
        )],
    ])
}

/// Shown under the payment instructions
pub fn screenshot(payment_id: i64) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![button(
        "📸 Send Payment Screenshot",
        CallbackAction::Screenshot { payment_id },
    )]])
}

pub fn admin_review(payment_id: i64) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        button("✅ Approve", CallbackAction::Approve { payment_id }),
        button("❌ Reject", CallbackAction::Reject { payment_id }),
    ]])
}

pub fn renewal(key: &str) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![button(
        "🔄 Renew Subscription",
        CallbackAction::Renew {
            key: key.to_string(),
        },
    )]])
}
