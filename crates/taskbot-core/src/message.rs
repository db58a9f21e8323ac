use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Anything the chat platform delivers to the bot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ChannelEvent {
    /// A text message posted in a chat.
    Message(IncomingMessage),
    /// An inline keyboard button press.
    Callback(CallbackQuery),
}

/// An incoming text message from a channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingMessage {
    pub id: Uuid,
    /// Channel name (e.g. "telegram").
    pub channel: String,
    /// Conversation the message was posted in. Partition key for all state.
    pub chat_id: i64,
    /// Platform message id, used for reactions.
    pub message_id: i64,
    /// Platform-specific user ID.
    pub sender_id: i64,
    /// Human-readable sender name.
    pub sender_name: Option<String>,
    /// Message text content.
    pub text: String,
    pub timestamp: DateTime<Utc>,
    /// Whether this message replies to one of the bot's own messages.
    #[serde(default)]
    pub reply_to_bot: bool,
    /// Whether this message comes from a group chat.
    #[serde(default)]
    pub is_group: bool,
}

impl IncomingMessage {
    /// Whether the text starts with a `/command`.
    pub fn is_command(&self) -> bool {
        self.text.trim_start().starts_with('/')
    }
}

/// A pressed inline keyboard button.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallbackQuery {
    /// Platform callback id, needed to acknowledge the press.
    pub id: String,
    /// Chat that holds the message with the keyboard.
    pub chat_id: i64,
    /// Message carrying the keyboard.
    pub message_id: i64,
    pub sender_id: i64,
    /// Opaque payload attached to the button.
    pub data: String,
}

/// How the platform should render outgoing text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextFormat {
    #[default]
    Plain,
    Html,
}

/// One inline keyboard button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineButton {
    pub text: String,
    pub callback_data: String,
}

impl InlineButton {
    pub fn new(text: impl Into<String>, callback_data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            callback_data: callback_data.into(),
        }
    }
}

/// An outgoing message to send through a channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingMessage {
    /// Target chat.
    pub chat_id: i64,
    pub text: String,
    #[serde(default)]
    pub format: TextFormat,
    /// A single row of inline buttons. Empty = no keyboard.
    #[serde(default)]
    pub keyboard: Vec<InlineButton>,
}

impl OutgoingMessage {
    /// Plain text message.
    pub fn text(chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: text.into(),
            ..Default::default()
        }
    }

    /// HTML-formatted message.
    pub fn html(chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: text.into(),
            format: TextFormat::Html,
            keyboard: Vec::new(),
        }
    }

    /// Attach a row of inline buttons.
    pub fn with_keyboard(mut self, keyboard: Vec<InlineButton>) -> Self {
        self.keyboard = keyboard;
        self
    }
}

/// Result of a provider completion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Completion {
    pub text: String,
    pub metadata: CompletionMetadata,
}

/// Metadata about how a completion was generated.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CompletionMetadata {
    /// Which provider produced this response.
    pub provider_used: String,
    /// Token count (if available from the provider).
    pub tokens_used: Option<u64>,
    /// Wall-clock processing time in milliseconds.
    pub processing_time_ms: u64,
    /// Model identifier (if applicable).
    pub model: Option<String>,
}
