use strum::IntoEnumIterator;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use crate::{
    video::{Opacity, WatermarkPosition},
    watermark::callback::WatermarkAction,
};

fn button(label: impl Into<String>, action: WatermarkAction) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(label, action.to_string())
}

fn position_label(position: WatermarkPosition) -> &'static str {
    match position {
        WatermarkPosition::UpperLeft => "↖️ Upper left",
        WatermarkPosition::UpperRight => "↗️ Upper right",
        WatermarkPosition::LowerLeft => "↙️ Lower left",
        WatermarkPosition::LowerRight => "↘️ Lower right",
        WatermarkPosition::Center => "⏺ Center",
    }
}

/// What to do with the uploaded video
pub fn options(has_saved_settings: bool) -> InlineKeyboardMarkup {
    let mut rows = vec![
        vec![button("📸 Take Screenshot", WatermarkAction::Screenshots)],
        vec![button("💧 Add Watermark", WatermarkAction::Watermark)],
    ];
    if has_saved_settings {
        rows.push(vec![button("⚡ Use Saved Watermark", WatermarkAction::QuickWatermark)]);
    }
    InlineKeyboardMarkup::new(rows)
}

/// Three positions on the first row, the rest below
pub fn positions() -> InlineKeyboardMarkup {
    let buttons: Vec<_> = WatermarkPosition::iter()
        .map(|p| button(position_label(p), WatermarkAction::Position(p)))
        .collect();
    InlineKeyboardMarkup::new(buttons.chunks(3).map(|row| row.to_vec()))
}

pub fn opacities() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new([Opacity::iter()
        .map(|o| button(o.to_string(), WatermarkAction::Opacity(o)))
        .collect::<Vec<_>>()])
}

pub fn save_choice() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new([
        [button("Yes, save these settings", WatermarkAction::Save(true))],
        [button("No, just use once", WatermarkAction::Save(false))],
    ])
}

pub fn back_to_options() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new([[button("🔙 Back to Options", WatermarkAction::BackToOptions)]])
}
