use teloxide::{prelude::*, types::ParseMode};

use crate::{errors::HandlerResult, premium::texts};

pub async fn help(bot: Bot, msg: Message) -> HandlerResult {
    bot.send_message(msg.chat.id, texts::help())
        .parse_mode(ParseMode::Html)
        .await?;
    Ok(())
}
