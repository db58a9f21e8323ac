use crate::{
    context::Context,
    error::TaskbotError,
    message::{ChannelEvent, Completion, OutgoingMessage},
};
use async_trait::async_trait;

/// LLM provider trait.
///
/// Every hosted text-generation backend (OpenAI, Gemini) implements this
/// trait to provide a uniform one-shot completion call.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Human-readable provider name.
    fn name(&self) -> &str;

    /// Whether this provider requires an API key to function.
    fn requires_api_key(&self) -> bool;

    /// Send a prompt to the provider and get the generated text.
    async fn complete(&self, context: &Context) -> Result<Completion, TaskbotError>;

    /// Check if the provider is reachable with the configured credentials.
    async fn is_available(&self) -> bool;
}

/// Messaging channel trait.
///
/// The chat platform implements this trait to deliver events and carry the
/// bot's replies, reactions and keyboard edits.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Human-readable channel name.
    fn name(&self) -> &str;

    /// Start listening. Returns a receiver that yields incoming events.
    async fn start(&self) -> Result<tokio::sync::mpsc::Receiver<ChannelEvent>, TaskbotError>;

    /// Send a message. Returns the platform id of the sent message, if known.
    async fn send(&self, message: OutgoingMessage) -> Result<Option<i64>, TaskbotError>;

    /// React to a message with an emoji.
    async fn react(
        &self,
        _chat_id: i64,
        _message_id: i64,
        _emoji: &str,
    ) -> Result<(), TaskbotError> {
        Ok(())
    }

    /// Acknowledge an inline button press.
    async fn answer_callback(&self, _callback_id: &str) -> Result<(), TaskbotError> {
        Ok(())
    }

    /// Replace the text of a previously sent message (drops its keyboard).
    async fn edit_text(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
    ) -> Result<(), TaskbotError>;

    /// Graceful shutdown.
    async fn stop(&self) -> Result<(), TaskbotError>;
}
