use serde_json::json;
use teloxide::{prelude::*, types::InputFile};

use crate::{
    config::WatermarkConfig,
    db::{ActivityStatus, Db},
    errors::{BotResult, HandlerResult},
    video::{VideoInfo, screenshot_positions, take_screenshot},
    watermark::{
        handlers::download, keyboards, schema::UploadedVideo, workspace::Workspace,
    },
};

/// Used when neither Telegram nor ffprobe know the duration
const FALLBACK_DURATION_SECS: u32 = 10;

/// Frames from the beginning, middle and end of the video
pub async fn take_screenshots(
    bot: &Bot,
    chat_id: ChatId,
    user_id: u64,
    config: &WatermarkConfig,
    db: &Db,
    video: &UploadedVideo,
) -> HandlerResult {
    let progress = bot
        .send_message(chat_id, "Processing screenshots...")
        .await?;

    let (text, status, details) = match capture(bot, chat_id, config, video).await {
        Ok(0) => (
            "Failed to create screenshots. Try a different video format.".to_string(),
            ActivityStatus::Error,
            json!({ "error": "No screenshots created" }),
        ),
        Ok(count) => (
            format!("Successfully created {} screenshots.", count),
            ActivityStatus::Success,
            json!({ "count": count }),
        ),
        Err(e) => {
            log::error!("Screenshots failed for user {}: {}", user_id, e);
            (
                format!("Error processing screenshots: {}", e),
                ActivityStatus::Error,
                json!({ "error": e.to_string() }),
            )
        }
    };

    bot.edit_message_text(chat_id, progress.id, text).await?;
    db.record(user_id as i64, "screenshots", status, Some(details))
        .await;

    bot.send_message(chat_id, "What would you like to do next?")
        .reply_markup(keyboards::back_to_options())
        .await?;
    Ok(())
}

/// Returns how many screenshots reached the user
async fn capture(
    bot: &Bot,
    chat_id: ChatId,
    config: &WatermarkConfig,
    video: &UploadedVideo,
) -> BotResult<usize> {
    let workspace = Workspace::create(&config.work_dir).await?;
    let video_path = workspace.file("video", "mp4");
    download(bot, &video.file_id, &video_path).await?;

    let duration = match video.duration {
        Some(d) if d > 0 => d,
        _ => VideoInfo::get_duration(&video_path)
            .await
            .unwrap_or(FALLBACK_DURATION_SECS),
    };

    let mut taken = 0;
    for (name, at) in screenshot_positions(duration) {
        let shot = workspace.file("screenshot", "jpg");
        if let Err(e) = take_screenshot(&video_path, at, &shot).await {
            log::error!("Error taking screenshot at {}s: {}", at, e);
            continue;
        }

        match bot
            .send_photo(chat_id, InputFile::file(&shot))
            .caption(format!("{} of video (at {}s)", name, at))
            .await
        {
            Ok(_) => taken += 1,
            Err(e) => log::error!("Error sending screenshot at {}s: {}", at, e),
        }
    }

    Ok(taken)
}
