mod options;
mod screenshots;
mod video;
mod watermark;

use std::path::Path;

use teloxide::{ApiError, RequestError, net::Download, prelude::*};
use tokio::{fs, io::AsyncWriteExt};

use crate::{
    errors::{BotError, BotResult, HandlerResult},
    watermark::{
        schema::{MyDialogue, State},
        texts,
    },
};

pub use options::{opacity_chosen, option_chosen, position_chosen, save_chosen, stale_button};
pub use video::{document_received, video_received};
pub use watermark::text_received;

/// Telegram id of the sender, falling back to the private chat id
fn user_of(msg: &Message) -> u64 {
    msg.from
        .as_ref()
        .map(|u| u.id.0)
        .unwrap_or(msg.chat.id.0 as u64)
}

fn chat_of(query: &CallbackQuery) -> ChatId {
    query
        .regular_message()
        .map(|m| m.chat.id)
        .unwrap_or_else(|| query.from.id.into())
}

/// Upload rejected by Telegram because of its size
fn too_large_to_send(e: &BotError) -> bool {
    matches!(
        e,
        BotError::Telegram(RequestError::Api(ApiError::RequestEntityTooLarge))
    )
}

async fn download(bot: &Bot, file_id: &str, dest: &Path) -> BotResult<()> {
    let file = bot.get_file(file_id).await?;
    log::debug!("Downloading {} to {}", file.path, dest.display());

    let mut out = fs::File::create(dest).await?;
    bot.download_file(&file.path, &mut out).await?;
    out.flush().await?;
    Ok(())
}

/// Anything that is neither a command, a video nor an expected text
pub async fn no_video(bot: Bot, dialogue: MyDialogue, msg: Message) -> HandlerResult {
    let text = match dialogue.get().await? {
        Some(State::AwaitingText { .. }) => "Please enter the text for the watermark:",
        _ => texts::NO_VIDEO,
    };
    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}
