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
    premium::{
        commands::{cancel, grant, help, pending, start, subscriptions},
        handlers::{callback_received, screenshot_received},
    },
};

pub type MyDialogue = Dialogue<State, InMemStorage<State>>;

#[derive(Clone, Debug, Default, PartialEq)]
pub enum State {
    #[default]
    Start,
    /// Next photo from the user is the proof for this payment
    AwaitingScreenshot {
        payment_id: i64,
    },
}

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase")]
pub enum Command {
    /// Start the bot and see the main menu
    Start,
    /// Show help
    Help,
    /// View your active subscriptions
    Subscriptions,
    /// Cancel the current payment step
    Cancel,
    /// Payments waiting for review (admin)
    Pending,
    /// Activate a plan manually: /grant <user_id> <channel_key> [days] (admin)
    Grant(String),
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
                        .branch(case![Command::Subscriptions].endpoint(subscriptions))
                        .branch(case![Command::Cancel].endpoint(cancel))
                        .branch(case![Command::Pending].endpoint(pending))
                        .branch(case![Command::Grant(args)].endpoint(grant)),
                )
                .branch(case![State::AwaitingScreenshot { payment_id }].endpoint(screenshot_received)),
        )
        .branch(Update::filter_callback_query().endpoint(callback_received))
}
