pub mod convert;
pub mod info;
pub mod screenshot;
pub mod watermark;

pub use convert::convert_to_video;
pub use info::VideoInfo;
pub use screenshot::{screenshot_positions, take_screenshot};
pub use watermark::{Opacity, WatermarkPosition, apply_watermark, drawtext_filter, render_preview};
