//! Channel that receives a copy of every processed video.

use std::sync::Arc;

use teloxide::{
    prelude::*,
    types::InputFile,
};
use tokio::sync::RwLock;

use crate::{config::normalize_channel_id, db::Db, errors::BotResult};

pub const SETTING_KEY: &str = "database_channel";

#[derive(Clone, Default)]
pub struct ArchiveChannel {
    channel: Arc<RwLock<Option<ChatId>>>,
}

impl ArchiveChannel {
    pub fn new(channel: Option<ChatId>) -> Self {
        Self {
            channel: Arc::new(RwLock::new(channel)),
        }
    }

    /// A channel stored with /setup wins over the configured one
    pub async fn load(db: &Db, configured: Option<ChatId>) -> BotResult<Self> {
        let stored = match db.get_setting(SETTING_KEY).await? {
            Some(raw) => match normalize_channel_id(&raw) {
                Ok(id) => Some(id),
                Err(e) => {
                    log::warn!("Ignoring stored archive channel {:?}: {}", raw, e);
                    None
                }
            },
            None => None,
        };
        Ok(Self::new(stored.or(configured)))
    }

    pub async fn get(&self) -> Option<ChatId> {
        *self.channel.read().await
    }

    pub async fn set(&self, db: &Db, channel_id: ChatId) -> BotResult<()> {
        db.set_setting(SETTING_KEY, &channel_id.to_string()).await?;
        *self.channel.write().await = Some(channel_id);
        log::info!("Archive channel set to {}", channel_id);
        Ok(())
    }

    /// Post `video` to the archive when one is configured. Failures are only
    /// logged; the user already has the result.
    pub async fn send_copy(&self, bot: &Bot, video: String, caption: String) {
        let Some(channel_id) = self.get().await else {
            return;
        };

        if let Err(e) = bot
            .send_video(channel_id, InputFile::file_id(video))
            .caption(caption)
            .await
        {
            log::error!("Error sending to archive channel {}: {}", channel_id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations::memory_pool;

    #[tokio::test]
    async fn stored_channel_overrides_configured_one() {
        let db = Db::new(Arc::new(memory_pool().await));

        let archive = ArchiveChannel::load(&db, Some(ChatId(-1001))).await.unwrap();
        assert_eq!(archive.get().await, Some(ChatId(-1001)));

        archive.set(&db, ChatId(-1002)).await.unwrap();
        assert_eq!(archive.get().await, Some(ChatId(-1002)));

        let reloaded = ArchiveChannel::load(&db, Some(ChatId(-1001))).await.unwrap();
        assert_eq!(reloaded.get().await, Some(ChatId(-1002)));
    }

    #[tokio::test]
    async fn no_channel_by_default() {
        let db = Db::new(Arc::new(memory_pool().await));
        let archive = ArchiveChannel::load(&db, None).await.unwrap();
        assert_eq!(archive.get().await, None);
    }
}
