//! Inline button payloads of the watermark bot.

use std::{fmt, str::FromStr};

use crate::{
    errors::BotError,
    video::{Opacity, WatermarkPosition},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatermarkAction {
    Screenshots,
    Watermark,
    /// Reapply the saved settings
    QuickWatermark,
    BackToOptions,
    Position(WatermarkPosition),
    Opacity(Opacity),
    /// Whether to keep the chosen settings for next time
    Save(bool),
}

impl fmt::Display for WatermarkAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WatermarkAction::Screenshots => write!(f, "shots"),
            WatermarkAction::Watermark => write!(f, "wm"),
            WatermarkAction::QuickWatermark => write!(f, "quick"),
            WatermarkAction::BackToOptions => write!(f, "back"),
            WatermarkAction::Position(position) => write!(f, "pos:{}", position),
            WatermarkAction::Opacity(opacity) => write!(f, "op:{}", opacity.percent()),
            WatermarkAction::Save(save) => write!(f, "save:{}", if *save { "yes" } else { "no" }),
        }
    }
}

impl FromStr for WatermarkAction {
    type Err = BotError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let invalid = || BotError::Parse(format!("Invalid callback data: {}", data));

        let action = match data.split_once(':') {
            None => match data {
                "shots" => WatermarkAction::Screenshots,
                "wm" => WatermarkAction::Watermark,
                "quick" => WatermarkAction::QuickWatermark,
                "back" => WatermarkAction::BackToOptions,
                _ => return Err(invalid()),
            },
            Some(("pos", raw)) => {
                WatermarkAction::Position(raw.parse().map_err(|_| invalid())?)
            }
            Some(("op", raw)) => {
                let percent = raw.parse::<u8>().map_err(|_| invalid())?;
                WatermarkAction::Opacity(Opacity::from_percent(percent).ok_or_else(invalid)?)
            }
            Some(("save", "yes")) => WatermarkAction::Save(true),
            Some(("save", "no")) => WatermarkAction::Save(false),
            Some(_) => return Err(invalid()),
        };
        Ok(action)
    }
}
