use std::sync::Arc;

use teloxide::{
    prelude::*,
    types::{InputFile, ParseMode},
};
use url::Url;

use crate::{
    config::PremiumConfig,
    db::Db,
    errors::HandlerResult,
    premium::{keyboards, schema::MyDialogue, texts},
};

pub async fn start(
    bot: Bot,
    dialogue: MyDialogue,
    msg: Message,
    config: Arc<PremiumConfig>,
    db: Db,
) -> HandlerResult {
    dialogue.exit().await?;

    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    db.upsert_user(
        user.id.0 as i64,
        user.username.as_deref(),
        Some(&user.first_name),
        user.last_name.as_deref(),
    )
    .await?;
    log::info!("User {} started the bot", user.id);

    let text = texts::welcome(&user.first_name);
    let menu = keyboards::main_menu(&config.catalog);

    let photo = match Url::parse(&config.welcome_image_url) {
        Ok(url) => bot
            .send_photo(msg.chat.id, InputFile::url(url))
            .caption(text.clone())
            .parse_mode(ParseMode::Html)
            .reply_markup(menu.clone())
            .await
            .map(|_| ())
            .map_err(|e| e.to_string()),
        Err(e) => Err(e.to_string()),
    };

    // Fall back to plain text when the image cannot be sent
    if let Err(e) = photo {
        log::warn!("Failed to send welcome image: {}", e);
        bot.send_message(msg.chat.id, text)
            .parse_mode(ParseMode::Html)
            .reply_markup(menu)
            .await?;
    }
    Ok(())
}
