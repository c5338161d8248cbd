use teloxide::prelude::*;

use crate::{
    config::PremiumConfig,
    errors::HandlerResult,
    premium::{handlers::present, keyboards, texts},
};

pub async fn show_menu(bot: &Bot, query: &CallbackQuery, config: &PremiumConfig) -> HandlerResult {
    present(
        bot,
        query,
        Some(&config.welcome_image_url),
        texts::MENU_PROMPT.to_string(),
        keyboards::main_menu(&config.catalog),
    )
    .await
}

/// Plan details over preview image `index`
pub async fn show_channel(
    bot: &Bot,
    query: &CallbackQuery,
    config: &PremiumConfig,
    key: &str,
    index: usize,
) -> HandlerResult {
    let Some(plan) = config.catalog.get(key) else {
        log::warn!("User {} opened unknown channel {}", query.from.id, key);
        return show_menu(bot, query, config).await;
    };

    let total = plan.preview_images.len();
    if total > 0 && index >= total {
        log::debug!("Preview {} of {} is out of range", index, key);
        return Ok(());
    }

    let mut text = texts::channel_info(plan);
    if total > 1 {
        text.push_str(&format!("\n\nPreview {}/{}", index + 1, total));
    }

    present(
        bot,
        query,
        plan.preview_images.get(index).map(String::as_str),
        text,
        keyboards::channel_preview(key, index, total),
    )
    .await
}
