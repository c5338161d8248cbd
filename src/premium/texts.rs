//! HTML message bodies of the premium bot.

use chrono::{DateTime, Utc};
use teloxide::utils::html::escape;

use crate::{
    catalog::{Catalog, ChannelPlan},
    db::{Payment, PaymentMethod},
    premium::access::Delivery,
    subscription::Subscription,
};

pub const MENU_PROMPT: &str = "Select a premium channel to view details and subscribe:";

pub fn format_date(date: DateTime<Utc>) -> String {
    date.format("%d %b %Y").to_string()
}

pub fn welcome(first_name: &str) -> String {
    format!(
        "👋 Welcome, {}!\n\n\
        🌟 <b>Premium Study Materials Bot</b> 🌟\n\n\
        Access exclusive premium study materials to accelerate your learning journey.\n\n\
        {}",
        escape(first_name),
        MENU_PROMPT
    )
}

pub fn help() -> &'static str {
    "📚 <b>Premium Study Materials - Help</b>\n\n\
    Here's how to use this bot:\n\n\
    1️⃣ Choose a premium channel from the main menu\n\
    2️⃣ Browse through preview images to see what's included\n\
    3️⃣ Subscribe by selecting the payment option\n\
    4️⃣ Complete the payment and submit a screenshot\n\
    5️⃣ Wait for admin approval to gain access\n\n\
    📝 <b>Commands:</b>\n\
    /start - Start the bot and see the main menu\n\
    /help - Show this help message\n\
    /subscriptions - View your active subscriptions\n\
    /cancel - Cancel the current payment step\n\n\
    For assistance, contact our support team."
}

pub fn channel_info(plan: &ChannelPlan) -> String {
    format!(
        "📚 <b>{}</b>\n\n\
        📝 <b>Description:</b> {}\n\n\
        💰 <b>Price:</b> ₹{}\n\
        ⏱ <b>Validity:</b> {} days\n\n\
        🖼 <b>Preview Images:</b> Navigate through the preview images to see what's included.",
        escape(&plan.name),
        escape(&plan.description),
        plan.price,
        plan.validity_days
    )
}

pub fn payment_prompt(plan: &ChannelPlan, renewal: bool) -> String {
    format!(
        "💳 <b>{} for {}</b>\n\n\
        Amount: ₹{}\n\
        Validity: {} days\n\n\
        Please select your payment method:",
        if renewal { "Renewal Payment" } else { "Payment" },
        escape(&plan.name),
        plan.price,
        plan.validity_days
    )
}

pub fn upi_instructions(plan: &ChannelPlan, upi_id: &str) -> String {
    format!(
        "💳 <b>Pay via UPI ID</b>\n\n\
        Amount: ₹{}\n\n\
        UPI ID: <code>{}</code>\n\n\
        After completing the payment, please send a screenshot for verification.",
        plan.price,
        escape(upi_id)
    )
}

pub fn qr_instructions(plan: &ChannelPlan) -> String {
    format!(
        "💳 <b>Pay via UPI QR Code</b>\n\n\
        Amount: ₹{}\n\n\
        Scan the QR code above to pay.\n\n\
        After completing the payment, please send a screenshot for verification.",
        plan.price
    )
}

pub fn screenshot_prompt() -> &'static str {
    "📸 <b>Send Payment Screenshot</b>\n\n\
    Please send a screenshot of your payment as proof.\n\n\
    Make sure the screenshot clearly shows:\n\
    • Transaction ID\n\
    • Payment amount\n\
    • Date and time\n\n\
    Send the image now. Send /cancel to cancel."
}

pub fn screenshot_received() -> &'static str {
    "✅ <b>Payment Screenshot Received</b>\n\n\
    Your payment is being verified. This may take some time.\n\
    You'll receive a notification once your payment is approved."
}

pub fn admin_review(payment: &Payment, plan_name: &str, username: Option<&str>) -> String {
    let method = match payment.method {
        Some(PaymentMethod::Upi) => "UPI ID",
        Some(PaymentMethod::Qr) => "UPI QR Code",
        None => "Not selected",
    };
    let user = match username {
        Some(name) => format!("<code>{}</code> (@{})", payment.user_id, escape(name)),
        None => format!("<code>{}</code>", payment.user_id),
    };

    format!(
        "💰 <b>New Payment Verification</b>\n\n\
        Payment: #{}\n\
        User ID: {}\n\
        Channel: {}\n\
        Amount: ₹{}\n\
        Payment Method: {}\n\n\
        Please verify and approve/reject this payment.",
        payment.id,
        user,
        escape(plan_name),
        payment.amount,
        method
    )
}

pub fn approved_user(plan_name: &str, expires_at: DateTime<Utc>, invite_link: Option<&str>) -> String {
    let access = match invite_link {
        Some(link) => format!(
            "Join the channel with your personal invite link (valid for 24 hours, single use):\n{}",
            escape(link)
        ),
        None => "The admin will add you to the channel shortly.".to_string(),
    };

    format!(
        "🎉 <b>Congratulations!</b>\n\n\
        Your payment for <b>{}</b> has been approved.\n\
        {}\n\n\
        Your subscription will expire on {}.\n\n\
        Enjoy your premium content!",
        escape(plan_name),
        access,
        format_date(expires_at)
    )
}

/// Outcome line appended to the admin's review message after an approval
pub fn approval_verdict(expires_at: DateTime<Utc>, delivery: Delivery) -> String {
    let outcome = match (delivery.notified, delivery.invited) {
        (false, _) => "user could not be notified, add them manually.",
        (true, true) => "invite link sent.",
        (true, false) => "no invite link could be created.",
    };
    format!(
        "✅ <b>Approved</b>. Access until {}, {}",
        format_date(expires_at),
        outcome
    )
}

pub fn rejected_user() -> &'static str {
    "❌ <b>Payment Rejected</b>\n\n\
    Your payment could not be verified.\n\n\
    Please try again or contact support for assistance."
}

pub fn expired_notice(plan_name: &str) -> String {
    format!(
        "ℹ️ Your subscription to <b>{}</b> has expired. \
        To regain access, please renew your subscription.",
        escape(plan_name)
    )
}

pub fn renewal_reminder(plan_name: &str, expires_at: DateTime<Utc>, days: i64) -> String {
    format!(
        "⚠️ <b>Subscription Renewal Reminder</b>\n\n\
        Your subscription to <b>{}</b> will expire on <b>{}</b> ({} days from now).\n\n\
        To maintain uninterrupted access, please renew your subscription.",
        escape(plan_name),
        format_date(expires_at),
        days
    )
}

pub fn no_active_subscriptions() -> &'static str {
    "You don't have any active subscriptions.\n\n\
    Use /start to browse our premium channels and subscribe."
}

pub fn subscriptions_list(subscriptions: &[Subscription], catalog: &Catalog) -> String {
    let mut text = String::from("📚 <b>Your Active Subscriptions</b>\n\n");
    for sub in subscriptions {
        text.push_str(&format!(
            "📌 <b>{}</b>\n   Expires on: {}\n\n",
            escape(catalog.name_of(&sub.channel_key)),
            format_date(sub.expires_at)
        ));
    }
    text
}

pub fn pending_list(payments: &[Payment], catalog: &Catalog) -> String {
    if payments.is_empty() {
        return "No payments are waiting for review.".to_string();
    }

    let mut text = format!("🧾 <b>Pending payments: {}</b>\n\n", payments.len());
    for p in payments {
        text.push_str(&format!(
            "#{} · user <code>{}</code> · {} · ₹{} · {}\n",
            p.id,
            p.user_id,
            escape(catalog.name_of(&p.channel_key)),
            p.amount,
            format_date(p.created_at)
        ));
    }
    text
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::{db::PaymentStatus, subscription::SubscriptionStatus};

    fn plan() -> ChannelPlan {
        ChannelPlan {
            key: "k".into(),
            name: "Maths & Science".into(),
            channel_id: None,
            price: 499,
            validity_days: 30,
            description: "Tables <beginner>".into(),
            preview_images: vec![],
        }
    }

    #[test]
    fn verdict_reports_what_reached_the_user() {
        let expires = Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap();
        let sent = Delivery { invited: true, notified: true };
        assert_eq!(
            approval_verdict(expires, sent),
            "✅ <b>Approved</b>. Access until 01 Jul 2024, invite link sent."
        );

        let blocked = Delivery { invited: true, notified: false };
        assert!(approval_verdict(expires, blocked).ends_with("user could not be notified, add them manually."));

        let no_link = Delivery { invited: false, notified: true };
        assert!(approval_verdict(expires, no_link).ends_with("no invite link could be created."));
    }

    #[test]
    fn dates_use_day_month_year() {
        let date = Utc.with_ymd_and_hms(2024, 3, 5, 10, 0, 0).unwrap();
        assert_eq!(format_date(date), "05 Mar 2024");
    }

    #[test]
    fn channel_info_escapes_html() {
        let text = channel_info(&plan());
        assert!(text.contains("<b>Maths &amp; Science</b>"));
        assert!(text.contains("Tables &lt;beginner&gt;"));
        assert!(text.contains("₹499"));
        assert!(text.contains("30 days"));
    }

    #[test]
    fn payment_prompt_marks_renewals() {
        assert!(payment_prompt(&plan(), true).contains("Renewal Payment for"));
        assert!(payment_prompt(&plan(), false).starts_with("💳 <b>Payment for"));
    }

    #[test]
    fn subscription_list_names_unknown_channels() {
        let catalog = Catalog::default_plans(|_| None).unwrap();
        let expires_at = Utc.with_ymd_and_hms(2024, 12, 31, 0, 0, 0).unwrap();
        let subs = vec![
            Subscription {
                id: 1,
                user_id: 1,
                channel_key: "study_data_2".into(),
                status: SubscriptionStatus::Active,
                created_at: expires_at,
                expires_at,
                reminded_at: None,
            },
            Subscription {
                id: 2,
                user_id: 1,
                channel_key: "retired".into(),
                status: SubscriptionStatus::Active,
                created_at: expires_at,
                expires_at,
                reminded_at: None,
            },
        ];

        let text = subscriptions_list(&subs, &catalog);
        assert!(text.contains("<b>Study Data 2</b>\n   Expires on: 31 Dec 2024"));
        assert!(text.contains("<b>Unknown Channel</b>"));
    }

    #[test]
    fn admin_review_shows_method_and_user() {
        let payment = Payment {
            id: 3,
            user_id: 77,
            channel_key: "k".into(),
            amount: 499,
            method: Some(PaymentMethod::Qr),
            status: PaymentStatus::Pending,
            screenshot_file_id: Some("f".into()),
            created_at: Utc::now(),
        };

        let text = admin_review(&payment, "Maths", Some("ann"));
        assert!(text.contains("User ID: <code>77</code> (@ann)"));
        assert!(text.contains("Payment Method: UPI QR Code"));
        assert!(text.contains("Payment: #3"));
    }

    #[test]
    fn approval_text_includes_invite_when_available() {
        let expires = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let with_link = approved_user("Maths", expires, Some("https://t.me/+abc"));
        assert!(with_link.contains("https://t.me/+abc"));
        assert!(with_link.contains("01 Jan 2025"));

        let without = approved_user("Maths", expires, None);
        assert!(without.contains("add you to the channel shortly"));
    }
}
