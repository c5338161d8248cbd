use std::{path::Path, time::Duration};

use crate::errors::BotResult;
use crate::video::convert::{ensure_output, path_arg, run_ffmpeg};

const SCREENSHOT_TIMEOUT: Duration = Duration::from_secs(30);

/// Where to grab frames: near the start, the middle and shortly before the end.
pub fn screenshot_positions(duration_secs: u32) -> [(&'static str, u32); 3] {
    [
        ("Beginning", 1),
        ("Middle", duration_secs / 2),
        ("End", duration_secs.saturating_sub(3).max(1)),
    ]
}

/// Save a single JPEG frame taken `at_secs` into the video.
pub async fn take_screenshot(video: &Path, at_secs: u32, output: &Path) -> BotResult<()> {
    let args = vec![
        "-y".to_string(),
        "-ss".to_string(),
        at_secs.to_string(),
        "-i".to_string(),
        path_arg(video)?,
        "-vframes".to_string(),
        "1".to_string(),
        "-q:v".to_string(),
        "2".to_string(),
        path_arg(output)?,
    ];

    run_ffmpeg(&args, SCREENSHOT_TIMEOUT).await?;
    ensure_output(output).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_spread_over_duration() {
        assert_eq!(
            screenshot_positions(120),
            [("Beginning", 1), ("Middle", 60), ("End", 117)]
        );
    }

    #[test]
    fn short_videos_never_seek_before_first_second() {
        assert_eq!(
            screenshot_positions(2),
            [("Beginning", 1), ("Middle", 1), ("End", 1)]
        );
        assert_eq!(screenshot_positions(0)[2], ("End", 1));
    }
}
