//! Text watermarks rendered with ffmpeg's `drawtext` filter.

use std::{path::Path, time::Duration};

use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::errors::BotResult;
use crate::video::convert::{ensure_output, path_arg, run_ffmpeg};

/// Distance between the text and the frame edge, in pixels
const MARGIN: u32 = 20;
const WATERMARK_TIMEOUT: Duration = Duration::from_secs(15 * 60);
const PREVIEW_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr, EnumIter)]
#[strum(serialize_all = "kebab-case")]
pub enum WatermarkPosition {
    UpperLeft,
    UpperRight,
    LowerLeft,
    LowerRight,
    Center,
}

impl WatermarkPosition {
    /// `x`/`y` expressions for drawtext (`w`/`h` frame size, `tw`/`th` text size)
    pub fn coordinates(self) -> (String, String) {
        let m = MARGIN;
        match self {
            WatermarkPosition::UpperLeft => (format!("{m}"), format!("{m}")),
            WatermarkPosition::UpperRight => (format!("w-tw-{m}"), format!("{m}")),
            WatermarkPosition::LowerLeft => (format!("{m}"), format!("h-th-{m}")),
            WatermarkPosition::LowerRight => (format!("w-tw-{m}"), format!("h-th-{m}")),
            WatermarkPosition::Center => ("(w-tw)/2".to_string(), "(h-th)/2".to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
pub enum Opacity {
    #[strum(to_string = "25%")]
    Quarter,
    #[strum(to_string = "50%")]
    Half,
    #[strum(to_string = "75%")]
    ThreeQuarters,
    #[strum(to_string = "100%")]
    Full,
}

impl Opacity {
    pub fn percent(self) -> u8 {
        match self {
            Opacity::Quarter => 25,
            Opacity::Half => 50,
            Opacity::ThreeQuarters => 75,
            Opacity::Full => 100,
        }
    }

    pub fn from_percent(percent: u8) -> Option<Self> {
        match percent {
            25 => Some(Opacity::Quarter),
            50 => Some(Opacity::Half),
            75 => Some(Opacity::ThreeQuarters),
            100 => Some(Opacity::Full),
            _ => None,
        }
    }

    fn alpha(self) -> String {
        format!("{:.2}", f32::from(self.percent()) / 100.0)
    }
}

/// Escape text for a drawtext option inside a filtergraph: first for the
/// option parser, then for the filtergraph parser.
pub fn escape_drawtext(text: &str) -> String {
    let mut option_level = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '\'' | ':') {
            option_level.push('\\');
        }
        option_level.push(c);
    }

    let mut graph_level = String::with_capacity(option_level.len());
    for c in option_level.chars() {
        if matches!(c, '\\' | '\'' | '[' | ']' | ',' | ';') {
            graph_level.push('\\');
        }
        graph_level.push(c);
    }
    graph_level
}

pub fn drawtext_filter(text: &str, position: WatermarkPosition, opacity: Opacity) -> String {
    let (x, y) = position.coordinates();
    format!(
        "drawtext=expansion=none:text={}:x={}:y={}:fontsize=h/15:fontcolor=white@{}:box=1:boxcolor=black@0.4:boxborderw=5",
        escape_drawtext(text),
        x,
        y,
        opacity.alpha()
    )
}

/// Burn the watermark into every frame; audio is copied untouched.
pub async fn apply_watermark(
    video: &Path,
    text: &str,
    position: WatermarkPosition,
    opacity: Opacity,
    output: &Path,
) -> BotResult<()> {
    let mut args: Vec<String> = vec!["-y".into(), "-i".into(), path_arg(video)?, "-vf".into()];
    args.push(drawtext_filter(text, position, opacity));
    args.extend(
        [
            "-c:v", "libx264", "-preset", "fast", "-crf", "23", "-c:a", "copy", "-movflags",
            "+faststart",
        ]
        .map(String::from),
    );
    args.push(path_arg(output)?);

    run_ffmpeg(&args, WATERMARK_TIMEOUT).await?;
    ensure_output(output).await
}

/// Render the watermark on a blank 640x360 frame with guide lines.
pub async fn render_preview(
    text: &str,
    position: WatermarkPosition,
    opacity: Opacity,
    output: &Path,
) -> BotResult<()> {
    let filter = format!(
        "drawbox=x=20:y=20:w=600:h=320:color=gray@0.5:t=2,\
         drawbox=x=319:y=20:w=2:h=320:color=gray@0.5:t=fill,\
         drawbox=x=20:y=179:w=600:h=2:color=gray@0.5:t=fill,{}",
        drawtext_filter(text, position, opacity)
    );

    let mut args: Vec<String> = [
        "-y",
        "-f",
        "lavfi",
        "-i",
        "color=c=black:s=640x360:d=1",
        "-vf",
    ]
    .map(String::from)
    .to_vec();
    args.push(filter);
    args.extend(["-frames:v", "1"].map(String::from));
    args.push(path_arg(output)?);

    run_ffmpeg(&args, PREVIEW_TIMEOUT).await?;
    ensure_output(output).await
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn positions_use_kebab_case_names() {
        let names: Vec<String> = WatermarkPosition::iter().map(|p| p.to_string()).collect();
        assert_eq!(
            names,
            ["upper-left", "upper-right", "lower-left", "lower-right", "center"]
        );
        assert_eq!(
            WatermarkPosition::from_str("lower-right").unwrap(),
            WatermarkPosition::LowerRight
        );
        assert!(WatermarkPosition::from_str("middle").is_err());
    }

    #[test]
    fn opacity_round_trips_through_percent() {
        for opacity in Opacity::iter() {
            assert_eq!(Opacity::from_percent(opacity.percent()), Some(opacity));
        }
        assert_eq!(Opacity::from_percent(40), None);
        assert_eq!(Opacity::ThreeQuarters.to_string(), "75%");
        assert_eq!(Opacity::Quarter.alpha(), "0.25");
        assert_eq!(Opacity::Full.alpha(), "1.00");
    }

    #[test]
    fn escaping_handles_both_parser_levels() {
        assert_eq!(escape_drawtext("plain text"), "plain text");
        assert_eq!(escape_drawtext("a:b"), "a\\\\:b");
        assert_eq!(escape_drawtext("it's"), "it\\\\\\'s");
        assert_eq!(escape_drawtext("one, two"), "one\\, two");
        assert_eq!(escape_drawtext("[x];"), "\\[x\\]\\;");
    }

    #[test]
    fn filter_places_text_by_position() {
        let filter = drawtext_filter("@channel", WatermarkPosition::LowerRight, Opacity::Half);
        assert!(filter.starts_with("drawtext=expansion=none:text=@channel:"));
        assert!(filter.contains(":x=w-tw-20:y=h-th-20:"));
        assert!(filter.contains("fontcolor=white@0.50"));

        let centered = drawtext_filter("x", WatermarkPosition::Center, Opacity::Full);
        assert!(centered.contains(":x=(w-tw)/2:y=(h-th)/2:"));
    }
}
