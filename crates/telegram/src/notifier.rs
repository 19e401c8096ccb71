//! Notify implementation backed by the Telegram bot API.

use async_trait::async_trait;
use coinwatch_engine::{Notify, NotifyError};
use teloxide::prelude::*;

/// Sends engine notifications as plain Telegram messages.
pub struct TelegramNotifier {
    bot: Bot,
}

impl TelegramNotifier {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Notify for TelegramNotifier {
    async fn notify(&self, user_id: &str, text: &str) -> Result<(), NotifyError> {
        let chat_id = user_id
            .parse::<i64>()
            .map_err(|_| NotifyError(format!("not a chat id: {user_id}")))?;
        self.bot
            .send_message(ChatId(chat_id), text)
            .await
            .map_err(|e| NotifyError(e.to_string()))?;
        Ok(())
    }
}
