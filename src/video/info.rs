use std::path::Path;

use serde_json::Value;
use tokio::process::Command;

use crate::errors::{BotError, BotResult};

#[derive(Debug, Clone, PartialEq)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    pub duration: f64,
}

impl VideoInfo {
    /// Extract video info using JSON parsing with async tokio
    pub async fn from_file(path: &Path) -> BotResult<Self> {
        let output = Command::new("ffprobe")
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(path)
            .output()
            .await
            .map_err(|e| BotError::external_command_error("ffprobe", e.to_string()))?;

        if !output.status.success() {
            let error_msg = String::from_utf8_lossy(&output.stderr);
            return Err(BotError::external_command_error("ffprobe", error_msg));
        }

        let json: Value = serde_json::from_slice(&output.stdout)?;

        Self::parse_json(json)
    }

    /// Duration of the file in whole seconds
    pub async fn get_duration(path: &Path) -> BotResult<u32> {
        Ok(Self::from_file(path).await?.duration_secs())
    }

    /// Duration rounded down to whole seconds
    pub fn duration_secs(&self) -> u32 {
        self.duration.max(0.0) as u32
    }

    /// Parse JSON output from ffprobe
    fn parse_json(json: Value) -> BotResult<Self> {
        let streams = json["streams"]
            .as_array()
            .ok_or_else(|| BotError::Parse("No streams found in ffprobe output".to_string()))?;

        let video_stream = streams
            .iter()
            .find(|s| s["codec_type"] == "video")
            .ok_or_else(|| BotError::Parse("No video stream found".to_string()))?;

        let width = video_stream["width"]
            .as_u64()
            .ok_or_else(|| BotError::Parse("Width not found in video stream".to_string()))?
            as u32;

        let height = video_stream["height"]
            .as_u64()
            .ok_or_else(|| BotError::Parse("Height not found in video stream".to_string()))?
            as u32;

        // Get duration from format section
        let duration_str = json["format"]["duration"].as_str().ok_or_else(|| {
            BotError::Parse("Duration not found in format section".to_string())
        })?;

        let duration = duration_str.parse::<f64>().map_err(|e| {
            BotError::Parse(format!(
                "Failed to parse duration '{}': {}",
                duration_str, e
            ))
        })?;

        Ok(VideoInfo {
            width,
            height,
            duration,
        })
    }
}
