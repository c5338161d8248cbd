use std::sync::Arc;

use serde_json::json;
use teloxide::{
    prelude::*,
    types::{Document, InputFile, Video},
};

use crate::{
    config::WatermarkConfig,
    db::{ActivityStatus, Db},
    errors::{BotError, BotResult, HandlerResult},
    video::{VideoInfo, convert_to_video},
    watermark::{
        handlers::{download, too_large_to_send, user_of},
        keyboards,
        schema::{MyDialogue, State, UploadedVideo},
        texts,
        workspace::Workspace,
    },
};

const VIDEO_EXTENSIONS: [&str; 9] = ["mp4", "mkv", "mov", "avi", "webm", "m4v", "flv", "wmv", "3gp"];

/// Documents worth converting: a video mime type, or a video extension when
/// the mime type is missing or generic.
pub fn is_video_like(mime: Option<&str>, file_name: Option<&str>) -> bool {
    if mime.is_some_and(|m| m.starts_with("video/")) {
        return true;
    }
    file_name
        .and_then(|name| name.rsplit_once('.'))
        .is_some_and(|(_, ext)| VIDEO_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

pub(super) async fn show_options(bot: &Bot, chat_id: ChatId, user_id: u64, db: &Db) -> HandlerResult {
    let has_saved = db
        .get_prefs(user_id as i64)
        .await?
        .is_some_and(|prefs| prefs.complete().is_some());

    bot.send_message(chat_id, texts::CHOOSE_OPTION)
        .reply_markup(keyboards::options(has_saved))
        .await?;
    Ok(())
}

async fn reject_if_too_large(
    bot: &Bot,
    msg: &Message,
    config: &WatermarkConfig,
    db: &Db,
    size: u64,
) -> BotResult<bool> {
    if size <= config.max_video_bytes {
        return Ok(false);
    }

    bot.send_message(msg.chat.id, texts::too_large(size, config.max_video_bytes))
        .await?;
    db.record(
        user_of(msg) as i64,
        "video_upload",
        ActivityStatus::Error,
        Some(json!({ "error": "too large", "file_size": size })),
    )
    .await;
    Ok(true)
}

/// Remember the video and offer what can be done with it
async fn accept(
    bot: &Bot,
    dialogue: &MyDialogue,
    chat_id: ChatId,
    user_id: u64,
    db: &Db,
    video: UploadedVideo,
) -> HandlerResult {
    bot.send_message(chat_id, texts::video_received(video.size, video.duration))
        .await?;

    let details = json!({
        "file_id": video.file_id,
        "file_size": video.size,
        "duration": video.duration,
    });
    dialogue.update(State::VideoReady { video }).await?;
    show_options(bot, chat_id, user_id, db).await?;

    db.record(user_id as i64, "video_upload", ActivityStatus::Success, Some(details))
        .await;
    Ok(())
}

pub async fn video_received(
    bot: Bot,
    dialogue: MyDialogue,
    msg: Message,
    video: Video,
    config: Arc<WatermarkConfig>,
    db: Db,
) -> HandlerResult {
    let size = u64::from(video.file.size);
    if reject_if_too_large(&bot, &msg, &config, &db, size).await? {
        return Ok(());
    }

    let uploaded = UploadedVideo {
        file_id: video.file.id.clone(),
        size,
        duration: Some(video.duration.seconds()),
    };
    accept(&bot, &dialogue, msg.chat.id, user_of(&msg), &db, uploaded).await
}

/// Video files sent as documents are converted to a streamable MP4 and sent
/// back, the resulting video message is what the user works on.
pub async fn document_received(
    bot: Bot,
    dialogue: MyDialogue,
    msg: Message,
    doc: Document,
    config: Arc<WatermarkConfig>,
    db: Db,
) -> HandlerResult {
    let mime = doc.mime_type.as_ref().map(|m| m.essence_str());
    if !is_video_like(mime, doc.file_name.as_deref()) {
        bot.send_message(msg.chat.id, "Please send a video file.").await?;
        return Ok(());
    }

    let size = u64::from(doc.file.size);
    if reject_if_too_large(&bot, &msg, &config, &db, size).await? {
        return Ok(());
    }

    let user_id = user_of(&msg);
    let progress = bot
        .send_message(msg.chat.id, "Converting file to video...")
        .await?;

    let workspace = Workspace::create(&config.work_dir).await?;
    let extension = doc
        .file_name
        .as_deref()
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or("bin");
    let input = workspace.file("upload", extension);

    let converted = async {
        download(&bot, &doc.file.id, &input).await?;
        let output = convert_to_video(&input, workspace.path()).await?;
        let duration = VideoInfo::get_duration(&output).await.ok();
        let sent = bot
            .send_video(msg.chat.id, InputFile::file(&output))
            .supports_streaming(true)
            .await?;
        let video = sent
            .video()
            .ok_or_else(|| BotError::general("Telegram did not return the converted video"))?;

        Ok::<_, BotError>(UploadedVideo {
            file_id: video.file.id.clone(),
            size: u64::from(video.file.size),
            duration: duration.or(Some(video.duration.seconds())),
        })
    }
    .await;
    drop(workspace);

    let uploaded = match converted {
        Ok(uploaded) => uploaded,
        Err(e) => {
            log::error!("File conversion failed for user {}: {}", user_id, e);
            let text = if too_large_to_send(&e) {
                "The converted video is too large to send.".to_string()
            } else {
                format!("Could not convert this file to a video: {}", e)
            };
            bot.edit_message_text(msg.chat.id, progress.id, text).await?;
            db.record(
                user_id as i64,
                "file_conversion",
                ActivityStatus::Error,
                Some(json!({ "error": e.to_string() })),
            )
            .await;
            return Ok(());
        }
    };

    bot.edit_message_text(msg.chat.id, progress.id, "File converted to video.")
        .await?;
    db.record(user_id as i64, "file_conversion", ActivityStatus::Success, None)
        .await;

    accept(&bot, &dialogue, msg.chat.id, user_id, &db, uploaded).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognises_video_documents() {
        assert!(is_video_like(Some("video/x-matroska"), None));
        assert!(is_video_like(Some("application/octet-stream"), Some("clip.MKV")));
        assert!(is_video_like(None, Some("holiday.final.mp4")));
        assert!(!is_video_like(Some("application/pdf"), Some("report.pdf")));
        assert!(!is_video_like(None, Some("noextension")));
        assert!(!is_video_like(None, None));
    }
}
