//! Outbound Bot API calls: messages, reactions, callbacks, edits, and
//! command registration.

use super::types::{TgResponse, TgSentMessage, TgUser};
use super::{TelegramChannel, MAX_TELEGRAM_LEN};
use crate::utils::split_message;
use serde_json::{json, Value};
use taskbot_core::{
    error::TaskbotError,
    message::{InlineButton, OutgoingMessage, TextFormat},
};
use tracing::{info, warn};

/// Build the `sendMessage` body for one chunk.
pub(crate) fn message_body(
    chat_id: i64,
    text: &str,
    format: TextFormat,
    keyboard: &[InlineButton],
) -> Value {
    let mut body = json!({
        "chat_id": chat_id,
        "text": text,
    });
    if format == TextFormat::Html {
        body["parse_mode"] = json!("HTML");
    }
    if !keyboard.is_empty() {
        body["reply_markup"] = json!({ "inline_keyboard": [keyboard] });
    }
    body
}

impl TelegramChannel {
    /// POST a Bot API method and decode its `result`.
    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        body: &Value,
    ) -> Result<T, TaskbotError> {
        let url = format!("{}/{method}", self.base_url);
        let resp = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                // The URL carries the bot token.
                TaskbotError::Channel(format!("telegram {method} failed: {}", e.without_url()))
            })?;

        let status = resp.status();
        let parsed: TgResponse<T> = resp.json().await.map_err(|e| {
            TaskbotError::Channel(format!(
                "telegram {method} parse failed ({status}): {}",
                e.without_url()
            ))
        })?;

        if !parsed.ok {
            return Err(TaskbotError::Channel(format!(
                "telegram {method} failed ({status}): {}",
                parsed.description.unwrap_or_default()
            )));
        }
        parsed
            .result
            .ok_or_else(|| TaskbotError::Channel(format!("telegram {method} returned no result")))
    }

    /// Identity of the bot account.
    pub(crate) async fn get_me(&self) -> Result<TgUser, TaskbotError> {
        self.call("getMe", &json!({})).await
    }

    /// Send a message, split into chunks if needed.
    ///
    /// The keyboard rides on the last chunk. Returns that chunk's message id.
    pub(crate) async fn send_message(
        &self,
        message: &OutgoingMessage,
    ) -> Result<Option<i64>, TaskbotError> {
        let chunks = split_message(&message.text, MAX_TELEGRAM_LEN);
        let last = chunks.len().saturating_sub(1);
        let mut sent_id = None;

        for (i, chunk) in chunks.into_iter().enumerate() {
            let keyboard: &[InlineButton] = if i == last { &message.keyboard } else { &[] };
            let body = message_body(message.chat_id, chunk, message.format, keyboard);
            let sent: TgSentMessage = self.call("sendMessage", &body).await?;
            sent_id = Some(sent.message_id);
        }

        Ok(sent_id)
    }

    /// Put a single emoji reaction on a message.
    pub(crate) async fn set_reaction(
        &self,
        chat_id: i64,
        message_id: i64,
        emoji: &str,
    ) -> Result<(), TaskbotError> {
        let body = json!({
            "chat_id": chat_id,
            "message_id": message_id,
            "reaction": [{ "type": "emoji", "emoji": emoji }],
        });
        let _: bool = self.call("setMessageReaction", &body).await?;
        Ok(())
    }

    /// Stop the client-side spinner on an inline button.
    pub(crate) async fn answer_callback_query(&self, callback_id: &str) -> Result<(), TaskbotError> {
        let body = json!({ "callback_query_id": callback_id });
        let _: bool = self.call("answerCallbackQuery", &body).await?;
        Ok(())
    }

    /// Replace a message's text. The inline keyboard is dropped.
    pub(crate) async fn edit_message_text(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
    ) -> Result<(), TaskbotError> {
        let body = json!({
            "chat_id": chat_id,
            "message_id": message_id,
            "text": text,
        });
        // Result is the edited Message; only success matters.
        let _: Value = self.call("editMessageText", &body).await?;
        Ok(())
    }

    /// Register bot commands with Telegram so users see an autocomplete menu.
    /// Best-effort: logs failures but does not propagate errors.
    pub(crate) async fn register_commands(&self) {
        let commands = json!({
            "commands": [
                { "command": "add", "description": "Add a new task" },
                { "command": "task", "description": "Show all tasks" },
                { "command": "done", "description": "Complete task by number" },
                { "command": "clearall", "description": "Delete all tasks" },
                { "command": "start", "description": "Show available commands" },
            ]
        });

        match self.call::<bool>("setMyCommands", &commands).await {
            Ok(_) => info!("registered Telegram bot commands"),
            Err(e) => warn!("failed to register Telegram bot commands: {e}"),
        }
    }
}
