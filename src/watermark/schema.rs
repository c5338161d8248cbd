use teloxide::{
    dispatching::{
        UpdateHandler,
        dialogue::{self, InMemStorage},
    },
    prelude::*,
    utils::command::BotCommands,
};

use crate::{
    errors::BotError,
    video::{Opacity, WatermarkPosition},
    watermark::{
        commands::{cancel, clear_preferences, help, setup, start},
        handlers::{
            document_received, no_video, opacity_chosen, option_chosen, position_chosen,
            save_chosen, stale_button, text_received, video_received,
        },
    },
};

pub type MyDialogue = Dialogue<State, InMemStorage<State>>;

/// Video the user is currently working on
#[derive(Clone, Debug, PartialEq)]
pub struct UploadedVideo {
    pub file_id: String,
    pub size: u64,
    pub duration: Option<u32>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub enum State {
    #[default]
    Start,
    VideoReady {
        video: UploadedVideo,
    },
    ChoosingPosition {
        video: UploadedVideo,
    },
    ChoosingOpacity {
        video: UploadedVideo,
        position: WatermarkPosition,
    },
    ChoosingSave {
        video: UploadedVideo,
        position: WatermarkPosition,
        opacity: Opacity,
    },
    AwaitingText {
        video: UploadedVideo,
        position: WatermarkPosition,
        opacity: Opacity,
        save: bool,
    },
}

#[derive(BotCommands, Clone)]
#[command(rename_rule = "snake_case")]
pub enum Command {
    /// Start the bot
    Start,
    /// Show help
    Help,
    /// Clear your saved watermark settings
    ClearPreferences,
    /// Set the archive channel: /setup <channel_id>
    Setup(String),
    /// Abort the current step
    Cancel,
}

pub fn schema() -> UpdateHandler<BotError> {
    use dptree::case;

    dialogue::enter::<Update, InMemStorage<State>, State, _>()
        .branch(
            Update::filter_message()
                .branch(
                    teloxide::filter_command::<Command, _>()
                        .branch(case![Command::Start].endpoint(start))
                        .branch(case![Command::Help].endpoint(help))
                        .branch(case![Command::ClearPreferences].endpoint(clear_preferences))
                        .branch(case![Command::Setup(channel)].endpoint(setup))
                        .branch(case![Command::Cancel].endpoint(cancel)),
                )
                .branch(Message::filter_video().endpoint(video_received))
                .branch(Message::filter_document().endpoint(document_received))
                .branch(
                    case![State::AwaitingText {
                        video,
                        position,
                        opacity,
                        save
                    }]
                    .branch(Message::filter_text().endpoint(text_received)),
                )
                .branch(dptree::endpoint(no_video)),
        )
        .branch(
            Update::filter_callback_query()
                .branch(case![State::VideoReady { video }].endpoint(option_chosen))
                .branch(case![State::ChoosingPosition { video }].endpoint(position_chosen))
                .branch(case![State::ChoosingOpacity { video, position }].endpoint(opacity_chosen))
                .branch(
                    case![State::ChoosingSave {
                        video,
                        position,
                        opacity
                    }]
                    .endpoint(save_chosen),
                )
                .branch(dptree::endpoint(stale_button)),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn video_state_carries_plain_file_id() {
        let video = UploadedVideo {
            file_id: "BAACAgIAAxkBAAIB".to_string(),
            size: 2048,
            duration: Some(12),
        };
        let state = State::ChoosingOpacity {
            video: video.clone(),
            position: WatermarkPosition::Center,
        };

        let State::ChoosingOpacity { video: carried, .. } = state else {
            panic!("state changed variant");
        };
        assert_eq!(carried.file_id, "BAACAgIAAxkBAAIB");
        assert_eq!(carried, video);
    }

    #[test]
    fn commands_use_snake_case() {
        assert!(matches!(
            Command::parse("/clear_preferences", "bot"),
            Ok(Command::ClearPreferences)
        ));
        assert!(matches!(
            Command::parse("/setup 12345", "bot"),
            Ok(Command::Setup(channel)) if channel == "12345"
        ));
    }
}
