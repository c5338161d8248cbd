use teloxide::prelude::*;

use crate::{
    errors::HandlerResult,
    premium::schema::{MyDialogue, State},
};

pub async fn cancel(bot: Bot, dialogue: MyDialogue, msg: Message) -> HandlerResult {
    let text = match dialogue.get().await? {
        Some(State::AwaitingScreenshot { .. }) => {
            "Payment step cancelled. Your payment stays open, press \"Send Payment Screenshot\" \
            when you are ready, or use /start to pick another channel."
        }
        _ => "Nothing to cancel.",
    };

    dialogue.exit().await?;
    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}
