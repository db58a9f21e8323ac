//! Built-in bot commands. Instant responses, no provider call.

mod tasks;


use chrono::{DateTime, Utc};
use taskbot_core::message::OutgoingMessage;
use taskbot_memory::Store;

/// Reaction put on an `/add` message once the task is stored.
pub const ADDED_REACTION: &str = "\u{1f440}";
/// Reaction put on a `/done` message once the task is removed.
pub const DONE_REACTION: &str = "\u{1f60e}";

/// Grouped context for command execution.
pub struct CommandContext<'a> {
    pub store: &'a Store,
    pub chat_id: i64,
    /// Full message text, command included.
    pub text: &'a str,
    pub now: DateTime<Utc>,
}

impl CommandContext<'_> {
    /// Text after the command word, trimmed. Inner newlines are kept.
    pub fn args(&self) -> &str {
        command_args(self.text)
    }
}

/// What the gateway should do with a command's result.
#[derive(Debug, PartialEq)]
pub enum CommandReply {
    /// Send a message to the chat.
    Send(OutgoingMessage),
    /// React to the command message with an emoji.
    React(&'static str),
}

/// Known bot commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Add,
    Task,
    Done,
    ClearAll,
}

impl Command {
    /// Parse a command from message text. Returns `None` for unknown `/` prefixes,
    /// which are ignored.
    pub fn parse(text: &str) -> Option<Self> {
        let first = text.split_whitespace().next()?;
        // Strip @botname suffix (e.g. "/add@task_bot" → "/add").
        let cmd = first.split('@').next().unwrap_or(first);
        match cmd {
            "/start" | "/help" => Some(Self::Start),
            "/add" => Some(Self::Add),
            "/task" | "/tasks" => Some(Self::Task),
            "/done" => Some(Self::Done),
            "/clearall" => Some(Self::ClearAll),
            _ => None,
        }
    }
}

/// Everything after the first whitespace-delimited word.
pub fn command_args(text: &str) -> &str {
    let text = text.trim_start();
    match text.find(char::is_whitespace) {
        Some(i) => text[i..].trim(),
        None => "",
    }
}

/// Inline-button payloads sent back by the `/clearall` confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    /// Wipe the list of the encoded chat.
    ConfirmClear(i64),
    CancelClear,
}

pub(crate) const CLEARALL_CONFIRM_PREFIX: &str = "clearall_confirm_";
pub(crate) const CLEARALL_CANCEL: &str = "clearall_cancel";

impl CallbackAction {
    pub fn parse(data: &str) -> Option<Self> {
        if data == CLEARALL_CANCEL {
            return Some(Self::CancelClear);
        }
        data.strip_prefix(CLEARALL_CONFIRM_PREFIX)
            .and_then(|id| id.parse().ok())
            .map(Self::ConfirmClear)
    }
}

/// Handle a command and return what to send back.
pub async fn handle(cmd: Command, ctx: &CommandContext<'_>) -> CommandReply {
    match cmd {
        Command::Start => tasks::handle_start(ctx.chat_id),
        Command::Add => tasks::handle_add(ctx).await,
        Command::Task => tasks::handle_list(ctx).await,
        Command::Done => tasks::handle_done(ctx).await,
        Command::ClearAll => tasks::handle_clearall(ctx).await,
    }
}

pub use tasks::handle_callback;
