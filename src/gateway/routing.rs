//! Event routing: commands, inline-button callbacks, chatter tracking, and
//! AI-assisted replies.

use super::Gateway;
use crate::commands::{self, CallbackAction, Command, CommandContext, CommandReply};
use chrono::Utc;
use taskbot_core::{
    config::ReplyStyle,
    message::{CallbackQuery, ChannelEvent, IncomingMessage, OutgoingMessage},
};
use tracing::{debug, error, info, warn};

impl Gateway {
    /// Entry point for every event the channel delivers.
    pub(super) async fn handle_event(&self, event: ChannelEvent) {
        match event {
            ChannelEvent::Message(msg) => self.handle_message(msg).await,
            ChannelEvent::Callback(cb) => self.handle_callback(cb).await,
        }
    }

    async fn handle_message(&self, msg: IncomingMessage) {
        if msg.is_command() {
            match Command::parse(&msg.text) {
                Some(cmd) => self.handle_command(cmd, &msg).await,
                None => debug!("ignoring unknown command in chat {}", msg.chat_id),
            }
            return;
        }

        self.track_chatter(&msg).await;

        if msg.reply_to_bot {
            self.handle_reply(&msg).await;
        }
    }

    async fn handle_command(&self, cmd: Command, msg: &IncomingMessage) {
        info!("chat {}: {:?} from {}", msg.chat_id, cmd, msg.sender_id);
        let ctx = CommandContext {
            store: &self.store,
            chat_id: msg.chat_id,
            text: &msg.text,
            now: Utc::now(),
        };
        match commands::handle(cmd, &ctx).await {
            CommandReply::Send(out) => self.send(out).await,
            CommandReply::React(emoji) => {
                // Reactions are cosmetic and may be disabled in a chat.
                if let Err(e) = self
                    .channel
                    .react(msg.chat_id, msg.message_id, emoji)
                    .await
                {
                    warn!("reaction failed in chat {}: {e}", msg.chat_id);
                }
            }
        }
    }

    async fn handle_callback(&self, cb: CallbackQuery) {
        if let Err(e) = self.channel.answer_callback(&cb.id).await {
            warn!("failed to answer callback {}: {e}", cb.id);
        }

        let Some(action) = CallbackAction::parse(&cb.data) else {
            debug!("ignoring unknown callback data '{}'", cb.data);
            return;
        };
        let Some(text) = commands::handle_callback(&self.store, action, cb.chat_id).await else {
            return;
        };
        if let Err(e) = self
            .channel
            .edit_text(cb.chat_id, cb.message_id, &text)
            .await
        {
            error!("failed to edit message in chat {}: {e}", cb.chat_id);
        }
    }

    /// Count the message and send the chatter notice when the hourly
    /// threshold is reached exactly.
    async fn track_chatter(&self, msg: &IncomingMessage) {
        let count = match self
            .store
            .increment_message_count(msg.chat_id, Utc::now())
            .await
        {
            Ok(n) => n,
            Err(e) => {
                error!("failed to count message in chat {}: {e}", msg.chat_id);
                return;
            }
        };

        let threshold = self.chatter_config.max_messages_per_hour;
        if threshold > 0 && count == threshold {
            info!("chat {} reached {threshold} messages this hour", msg.chat_id);
            self.send(OutgoingMessage::text(
                msg.chat_id,
                self.assistant.chatter_notice(),
            ))
            .await;
        }
    }

    /// A reply to one of the bot's messages: maybe a task completion.
    async fn handle_reply(&self, msg: &IncomingMessage) {
        if !self.assistant.has_analyzer() {
            return;
        }

        let tasks = match self.store.get_tasks(msg.chat_id).await {
            Ok(tasks) if tasks.is_empty() => return,
            Ok(tasks) => tasks,
            Err(e) => {
                error!("failed to load tasks for chat {}: {e}", msg.chat_id);
                return;
            }
        };

        match self.assistant.analyze_reply(&msg.text, &tasks).await {
            Ok(analysis) => {
                debug!("reply analysis in chat {}: {analysis:?}", msg.chat_id);
                if let Some(number) = analysis.completed_task() {
                    self.complete_task(msg.chat_id, number).await;
                }
            }
            Err(e) => warn!("reply analysis failed in chat {}: {e}", msg.chat_id),
        }

        if self.reply_style == ReplyStyle::Sarcastic {
            match self.assistant.sarcastic_reply(&msg.text, &tasks).await {
                Ok(Some(reply)) => {
                    debug!(
                        "sarcastic reply in chat {} (task {:?})",
                        msg.chat_id, reply.task_number
                    );
                    self.send(OutgoingMessage::text(msg.chat_id, reply.reply))
                        .await;
                }
                Ok(None) => {}
                Err(e) => warn!("sarcastic reply failed in chat {}: {e}", msg.chat_id),
            }
        }
    }

    /// Delete the task at `number` and confirm it in the chat.
    async fn complete_task(&self, chat_id: i64, number: i64) {
        let task = match self.store.get_task_by_number(chat_id, number).await {
            Ok(Some(task)) => task,
            Ok(None) => {
                debug!("chat {chat_id}: analysis named missing task #{number}");
                return;
            }
            Err(e) => {
                error!("failed to look up task #{number} in chat {chat_id}: {e}");
                return;
            }
        };
        match self.store.delete_task(task.id).await {
            Ok(true) => {
                info!("chat {chat_id}: task #{number} completed from reply");
                self.send(OutgoingMessage::text(
                    chat_id,
                    format!("Task completed: {}", task.description),
                ))
                .await;
            }
            Ok(false) => debug!("task {} already gone", task.id),
            Err(e) => error!("failed to delete task {}: {e}", task.id),
        }
    }

    /// Send a message, logging failures.
    pub(super) async fn send(&self, msg: OutgoingMessage) {
        let chat_id = msg.chat_id;
        if let Err(e) = self.channel.send(msg).await {
            error!("failed to send to chat {chat_id}: {e}");
        }
    }
}
