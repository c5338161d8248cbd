//! Video watermark bot: screenshots, text watermarks burned in with ffmpeg,
//! saved per-user settings and an optional archive channel.

pub mod archive;
pub mod callback;
pub mod commands;
pub mod handlers;
pub mod keyboards;
pub mod schema;
pub mod texts;
pub mod workspace;

pub use archive::ArchiveChannel;
pub use schema::{State, schema};
