use std::sync::Arc;

use serde_json::json;
use teloxide::{
    prelude::*,
    types::{InputFile, ParseMode},
};

use crate::{
    config::WatermarkConfig,
    db::{ActivityStatus, Db},
    errors::{BotError, BotResult, HandlerResult},
    video::{Opacity, WatermarkPosition, apply_watermark, render_preview},
    watermark::{
        archive::ArchiveChannel,
        handlers::{download, too_large_to_send, user_of},
        schema::{MyDialogue, UploadedVideo},
        texts,
        workspace::Workspace,
    },
};

const MAX_TEXT_CHARS: usize = 100;

/// Everything needed to watermark one video
pub(super) struct WatermarkJob<'a> {
    pub video: &'a UploadedVideo,
    pub text: &'a str,
    pub position: WatermarkPosition,
    pub opacity: Opacity,
}

pub async fn text_received(
    bot: Bot,
    dialogue: MyDialogue,
    msg: Message,
    (video, position, opacity, save): (UploadedVideo, WatermarkPosition, Opacity, bool),
    config: Arc<WatermarkConfig>,
    db: Db,
    archive: ArchiveChannel,
) -> HandlerResult {
    let text = msg.text().unwrap_or_default().trim();
    if text.is_empty() || text.chars().count() > MAX_TEXT_CHARS {
        bot.send_message(
            msg.chat.id,
            format!(
                "The watermark text must be between 1 and {} characters. Please enter it again:",
                MAX_TEXT_CHARS
            ),
        )
        .await?;
        return Ok(());
    }

    let user_id = user_of(&msg);
    if save {
        match db.save_prefs_text(user_id as i64, text).await {
            Ok(()) => {
                bot.send_message(
                    msg.chat.id,
                    "Your watermark settings have been saved for future use.",
                )
                .await?;
            }
            Err(e) => log::error!("Error saving watermark text for {}: {}", user_id, e),
        }
    }

    dialogue.exit().await?;

    let job = WatermarkJob {
        video: &video,
        text,
        position,
        opacity,
    };
    run(&bot, msg.chat.id, user_id, &config, &db, &archive, &job, "watermark").await?;

    bot.send_message(
        msg.chat.id,
        "Done! Send another video to start again or use /start command.",
    )
    .await?;
    Ok(())
}

/// Preview, burn in, deliver, archive and log one watermark job
#[allow(clippy::too_many_arguments)]
pub(super) async fn run(
    bot: &Bot,
    chat_id: ChatId,
    user_id: u64,
    config: &WatermarkConfig,
    db: &Db,
    archive: &ArchiveChannel,
    job: &WatermarkJob<'_>,
    action: &str,
) -> HandlerResult {
    let progress = bot
        .send_message(chat_id, "Processing... Longer videos take a while.")
        .await?;

    send_preview(bot, chat_id, config, job).await;

    let details = json!({
        "text": job.text,
        "position": job.position.as_ref(),
        "opacity": job.opacity.percent(),
    });

    match burn(bot, chat_id, config, job).await {
        Ok(sent) => {
            bot.edit_message_text(chat_id, progress.id, "Watermark applied!")
                .await?;
            if let Some(video) = sent.video() {
                archive
                    .send_copy(
                        bot,
                        video.file.id.clone(),
                        texts::archive_caption(user_id, job.text, job.position, job.opacity),
                    )
                    .await;
            }
            db.record(user_id as i64, action, ActivityStatus::Success, Some(details))
                .await;
        }
        Err(e) => {
            log::error!("Watermark failed for user {}: {}", user_id, e);
            let text = if too_large_to_send(&e) {
                "The watermarked video is too large to send.".to_string()
            } else {
                format!("Error applying watermark: {}", e)
            };
            bot.edit_message_text(chat_id, progress.id, text).await?;
            db.record(
                user_id as i64,
                action,
                ActivityStatus::Error,
                Some(json!({ "error": e.to_string(), "settings": details })),
            )
            .await;
        }
    }
    Ok(())
}

async fn burn(
    bot: &Bot,
    chat_id: ChatId,
    config: &WatermarkConfig,
    job: &WatermarkJob<'_>,
) -> BotResult<Message> {
    let workspace = Workspace::create(&config.work_dir).await?;
    let input = workspace.file("video", "mp4");
    let output = workspace.file("watermarked", "mp4");

    download(bot, &job.video.file_id, &input).await?;
    apply_watermark(&input, job.text, job.position, job.opacity, &output).await?;

    let sent = bot
        .send_video(chat_id, InputFile::file(&output))
        .caption(texts::result_caption(job.text, job.position, job.opacity))
        .parse_mode(ParseMode::Html)
        .supports_streaming(true)
        .await?;
    Ok(sent)
}

/// Quick look at the placement while the video is being encoded
async fn send_preview(bot: &Bot, chat_id: ChatId, config: &WatermarkConfig, job: &WatermarkJob<'_>) {
    let result = async {
        let workspace = Workspace::create(&config.work_dir).await?;
        let preview = workspace.file("preview", "jpg");
        render_preview(job.text, job.position, job.opacity, &preview).await?;
        bot.send_photo(chat_id, InputFile::file(&preview))
            .caption("Preview of the watermark placement")
            .await?;
        Ok::<_, BotError>(())
    }
    .await;

    if let Err(e) = result {
        log::warn!("Error creating watermark preview: {}", e);
    }
}
