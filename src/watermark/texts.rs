use teloxide::utils::html::escape;

use crate::{
    config::BOT_API_DOWNLOAD_LIMIT_MB,
    video::{Opacity, WatermarkPosition},
};

pub const START: &str = "Hi! Send me a video file to get started.";
pub const CHOOSE_OPTION: &str = "What would you like to do?";
pub const NO_VIDEO: &str = "Send me a video file first or use /start to begin.";
pub const BUTTON_EXPIRED: &str = "This button has expired. Send a video to start again.";

pub fn help(max_video_mb: u64) -> String {
    format!(
        "🎬 <b>Video Watermark Bot</b>\n\n\
        This bot takes screenshots of your videos and burns text watermarks into them.\n\n\
        <b>Basic Commands:</b>\n\
        /start - Start the bot\n\
        /help - Show this help message\n\
        /clear_preferences - Clear your saved watermark settings\n\
        /cancel - Abort the current step\n\n\
        <b>How to use:</b>\n\
        1. Send a video (or a video file as a document, it is converted first)\n\
        2. Choose one of the options:\n\
        • Take Screenshot - frames from the beginning, middle and end\n\
        • Add Watermark - pick position, opacity and text\n\
        • Use Saved Watermark - apply your previously saved settings\n\n\
        <b>Tips:</b>\n\
        • Videos up to {} MB are accepted\n\
        {}\
        • Save your favourite watermark settings for quick use next time",
        max_video_mb,
        download_limit_note(max_video_mb)
    )
}

pub fn too_large(size_bytes: u64, max_bytes: u64) -> String {
    format!(
        "Video is too large ({:.1} MB). Maximum allowed size is {} MB.",
        megabytes(size_bytes),
        max_bytes / (1024 * 1024)
    )
}

/// Telegram refuses bot downloads above its own limit whatever MAX_VIDEO_MB says
fn download_limit_note(max_video_mb: u64) -> String {
    if max_video_mb > BOT_API_DOWNLOAD_LIMIT_MB {
        format!(
            "• Telegram only lets bots download files up to {} MB, larger videos will fail\n",
            BOT_API_DOWNLOAD_LIMIT_MB
        )
    } else {
        String::new()
    }
}

pub fn video_received(size_bytes: u64, duration_secs: Option<u32>) -> String {
    match duration_secs {
        Some(duration) => format!(
            "Video received! Size: {:.1} MB, Duration: {} seconds",
            megabytes(size_bytes),
            duration
        ),
        None => format!("Video received! Size: {:.1} MB", megabytes(size_bytes)),
    }
}

pub fn settings(text: &str, position: WatermarkPosition, opacity: Opacity) -> String {
    format!("Watermark: {}\nPosition: {}\nOpacity: {}", text, position, opacity)
}

/// Caption of the watermarked video sent back to the user
pub fn result_caption(text: &str, position: WatermarkPosition, opacity: Opacity) -> String {
    format!(
        "Video with watermark text: '{}'\nPosition: {}\nOpacity: {}",
        escape(text),
        position,
        opacity
    )
}

/// Caption of the archive copy
pub fn archive_caption(user_id: u64, text: &str, position: WatermarkPosition, opacity: Opacity) -> String {
    format!("User ID: {}\n{}", user_id, settings(text, position, opacity))
}

fn megabytes(bytes: u64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_are_shown_in_megabytes() {
        assert_eq!(
            too_large(60 * 1024 * 1024 + 512 * 1024, 50 * 1024 * 1024),
            "Video is too large (60.5 MB). Maximum allowed size is 50 MB."
        );
        assert_eq!(
            video_received(3 * 1024 * 1024, Some(42)),
            "Video received! Size: 3.0 MB, Duration: 42 seconds"
        );
        assert_eq!(video_received(1024 * 1024, None), "Video received! Size: 1.0 MB");
    }

    #[test]
    fn help_warns_about_bot_download_limit() {
        let generous = help(50);
        assert!(generous.contains("Videos up to 50 MB are accepted"));
        assert!(generous.contains("download files up to 20 MB"));

        let within_limit = help(20);
        assert!(!within_limit.contains("download files up to"));
        assert!(within_limit.contains("accepted\n• Save your favourite"));
    }

    #[test]
    fn archive_caption_lists_settings() {
        assert_eq!(
            archive_caption(7, "@chan", WatermarkPosition::LowerRight, Opacity::Half),
            "User ID: 7\nWatermark: @chan\nPosition: lower-right\nOpacity: 50%"
        );
    }

    #[test]
    fn result_caption_escapes_user_text() {
        let caption = result_caption("<b>me</b>", WatermarkPosition::Center, Opacity::Full);
        assert!(caption.contains("'&lt;b&gt;me&lt;/b&gt;'"));
        assert!(caption.ends_with("Opacity: 100%"));
    }
}
