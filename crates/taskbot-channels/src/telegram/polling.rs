//! Long-polling update loop and Channel trait implementation.

use super::types::{TgMessage, TgResponse, TgUpdate, TgUser};
use super::TelegramChannel;
use async_trait::async_trait;
use std::time::Duration;
use taskbot_core::{
    error::TaskbotError,
    message::{CallbackQuery, ChannelEvent, IncomingMessage, OutgoingMessage},
    traits::Channel,
};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn start(&self) -> Result<mpsc::Receiver<ChannelEvent>, TaskbotError> {
        // Needed to tell replies to the bot apart from replies to other users.
        let bot_id = match self.get_me().await {
            Ok(me) => {
                info!("Telegram bot identity: {} ({})", me.display_name(), me.id);
                Some(me.id)
            }
            Err(e) => {
                warn!("telegram getMe failed, falling back to is_bot for reply detection: {e}");
                None
            }
        };
        self.register_commands().await;

        let (tx, rx) = mpsc::channel(64);
        let client = self.client.clone();
        let base_url = self.base_url.clone();
        let allowed_users = self.config.allowed_users.clone();
        let last_update_id = self.last_update_id.clone();

        info!("Telegram channel starting long polling...");

        tokio::spawn(async move {
            let mut backoff_secs: u64 = 1;

            loop {
                let last = last_update_id.lock().await;
                let offset = last.map(|id| id + 1);
                drop(last);

                let mut url = format!("{base_url}/getUpdates?timeout=30");
                if let Some(off) = offset {
                    url.push_str(&format!("&offset={off}"));
                }

                let resp = match client
                    .get(&url)
                    .timeout(Duration::from_secs(35))
                    .send()
                    .await
                {
                    Ok(r) => r,
                    Err(e) => {
                        error!(
                            "telegram poll error (retry in {backoff_secs}s): {}",
                            e.without_url()
                        );
                        tokio::time::sleep(Duration::from_secs(backoff_secs)).await;
                        backoff_secs = (backoff_secs * 2).min(60);
                        continue;
                    }
                };

                let body: TgResponse<Vec<TgUpdate>> = match resp.json().await {
                    Ok(b) => b,
                    Err(e) => {
                        error!(
                            "telegram parse error (retry in {backoff_secs}s): {}",
                            e.without_url()
                        );
                        tokio::time::sleep(Duration::from_secs(backoff_secs)).await;
                        backoff_secs = (backoff_secs * 2).min(60);
                        continue;
                    }
                };

                if !body.ok {
                    error!(
                        "telegram API error (retry in {backoff_secs}s): {}",
                        body.description.unwrap_or_default()
                    );
                    tokio::time::sleep(Duration::from_secs(backoff_secs)).await;
                    backoff_secs = (backoff_secs * 2).min(60);
                    continue;
                }

                // Successful poll -- reset backoff.
                backoff_secs = 1;

                let updates = body.result.unwrap_or_default();

                if let Some(last_update) = updates.last() {
                    *last_update_id.lock().await = Some(last_update.update_id);
                }

                for update in updates {
                    let Some(event) = update_to_event(update, bot_id, &allowed_users) else {
                        continue;
                    };
                    if tx.send(event).await.is_err() {
                        info!("telegram channel receiver dropped, stopping poll");
                        return;
                    }
                }
            }
        });

        Ok(rx)
    }

    async fn send(&self, message: OutgoingMessage) -> Result<Option<i64>, TaskbotError> {
        self.send_message(&message).await
    }

    async fn react(&self, chat_id: i64, message_id: i64, emoji: &str) -> Result<(), TaskbotError> {
        self.set_reaction(chat_id, message_id, emoji).await
    }

    async fn answer_callback(&self, callback_id: &str) -> Result<(), TaskbotError> {
        self.answer_callback_query(callback_id).await
    }

    async fn edit_text(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
    ) -> Result<(), TaskbotError> {
        self.edit_message_text(chat_id, message_id, text).await
    }

    async fn stop(&self) -> Result<(), TaskbotError> {
        info!("Telegram channel stopped");
        Ok(())
    }
}

/// Whether a user may talk to the bot. An empty allow-list admits everyone.
fn is_allowed(allowed_users: &[i64], user: &TgUser) -> bool {
    allowed_users.is_empty() || allowed_users.contains(&user.id)
}

/// Whether `msg` answers one of the bot's own messages.
fn replies_to_bot(msg: &TgMessage, bot_id: Option<i64>) -> bool {
    let Some(author) = msg.reply_to_message.as_ref().and_then(|r| r.from.as_ref()) else {
        return false;
    };
    match bot_id {
        Some(id) => author.id == id,
        None => author.is_bot,
    }
}

/// Translate a raw update into a channel event.
///
/// Returns `None` for updates the bot does not handle: non-text messages,
/// anonymous senders, callbacks without their message, and users outside
/// the allow-list.
pub(crate) fn update_to_event(
    update: TgUpdate,
    bot_id: Option<i64>,
    allowed_users: &[i64],
) -> Option<ChannelEvent> {
    if let Some(query) = update.callback_query {
        if !is_allowed(allowed_users, &query.from) {
            warn!("ignoring callback from unauthorized user {}", query.from.id);
            return None;
        }
        let Some(message) = query.message else {
            debug!("telegram: callback {} has no message, skipping", query.id);
            return None;
        };
        return Some(ChannelEvent::Callback(CallbackQuery {
            id: query.id,
            chat_id: message.chat.id,
            message_id: message.message_id,
            sender_id: query.from.id,
            data: query.data.unwrap_or_default(),
        }));
    }

    let msg = update.message?;
    let reply_to_bot = replies_to_bot(&msg, bot_id);
    let user = msg.from?;
    let text = msg.text?;

    if !is_allowed(allowed_users, &user) {
        warn!("ignoring message from unauthorized user {}", user.id);
        return None;
    }

    let timestamp = msg
        .date
        .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0))
        .unwrap_or_else(chrono::Utc::now);

    Some(ChannelEvent::Message(IncomingMessage {
        id: Uuid::new_v4(),
        channel: "telegram".to_string(),
        chat_id: msg.chat.id,
        message_id: msg.message_id,
        sender_id: user.id,
        sender_name: Some(user.display_name()),
        text,
        timestamp,
        reply_to_bot,
        is_group: msg.chat.is_group(),
    }))
}
