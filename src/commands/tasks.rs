//! Task list command handlers: /start, /add, /task, /done, /clearall.

use super::{
    CallbackAction, CommandContext, CommandReply, ADDED_REACTION, CLEARALL_CANCEL,
    CLEARALL_CONFIRM_PREFIX, DONE_REACTION,
};
use crate::format::format_task_list;
use taskbot_core::message::{InlineButton, OutgoingMessage};
use taskbot_memory::Store;
use tracing::{error, info};

const START_TEXT: &str = "Task Bot\n\n\
                          Commands:\n\
                          /add <task> - Add a new task\n\
                          /task - Show all tasks\n\
                          /done <number> - Complete task by number\n\
                          /clearall - Delete all tasks";

pub(super) const STORAGE_ERROR_TEXT: &str = "Something went wrong, please try again later.";

fn reply(chat_id: i64, text: impl Into<String>) -> CommandReply {
    CommandReply::Send(OutgoingMessage::text(chat_id, text))
}

/// Store failures are logged; the chat only gets a generic line.
fn storage_error(chat_id: i64, e: impl std::fmt::Display) -> CommandReply {
    error!("command failed for chat {chat_id}: {e}");
    reply(chat_id, STORAGE_ERROR_TEXT)
}

/// The integer at the start of `text`, ignoring whatever follows it
/// ("2abc" and "2." both give 2).
pub(super) fn leading_number(text: &str) -> Option<i64> {
    let text = text.trim_start();
    let (sign, rest) = match text.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, text.strip_prefix('+').unwrap_or(text)),
    };
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    rest[..end].parse::<i64>().ok().map(|n| sign * n)
}

pub(super) fn handle_start(chat_id: i64) -> CommandReply {
    reply(chat_id, START_TEXT)
}

pub(super) async fn handle_add(ctx: &CommandContext<'_>) -> CommandReply {
    let description = ctx.args();
    if description.is_empty() {
        return reply(
            ctx.chat_id,
            "Please provide a task description.\nExample: /add Prepare presentation",
        );
    }
    match ctx.store.add_task(ctx.chat_id, description).await {
        Ok(task) => {
            info!("chat {}: added task {}", ctx.chat_id, task.id);
            CommandReply::React(ADDED_REACTION)
        }
        Err(e) => storage_error(ctx.chat_id, e),
    }
}

pub(super) async fn handle_list(ctx: &CommandContext<'_>) -> CommandReply {
    match ctx.store.get_tasks(ctx.chat_id).await {
        Ok(tasks) if tasks.is_empty() => reply(ctx.chat_id, "No tasks yet. Use /add to create one."),
        Ok(tasks) => CommandReply::Send(OutgoingMessage::html(
            ctx.chat_id,
            format_task_list(&tasks, ctx.now),
        )),
        Err(e) => storage_error(ctx.chat_id, e),
    }
}

pub(super) async fn handle_done(ctx: &CommandContext<'_>) -> CommandReply {
    let number = leading_number(ctx.args()).filter(|n| *n >= 1);
    let Some(number) = number else {
        return reply(
            ctx.chat_id,
            "Please provide a valid task number.\nExample: /done 1",
        );
    };

    let task = match ctx.store.get_task_by_number(ctx.chat_id, number).await {
        Ok(Some(task)) => task,
        Ok(None) => return reply(ctx.chat_id, format!("Task #{number} not found.")),
        Err(e) => return storage_error(ctx.chat_id, e),
    };
    match ctx.store.delete_task(task.id).await {
        Ok(_) => {
            info!("chat {}: completed task #{number} ({})", ctx.chat_id, task.id);
            CommandReply::React(DONE_REACTION)
        }
        Err(e) => storage_error(ctx.chat_id, e),
    }
}

pub(super) async fn handle_clearall(ctx: &CommandContext<'_>) -> CommandReply {
    let count = match ctx.store.count_tasks(ctx.chat_id).await {
        Ok(n) => n,
        Err(e) => return storage_error(ctx.chat_id, e),
    };
    if count == 0 {
        return reply(ctx.chat_id, "No tasks to delete.");
    }

    let keyboard = vec![
        InlineButton::new(
            "Yes, delete all",
            format!("{CLEARALL_CONFIRM_PREFIX}{}", ctx.chat_id),
        ),
        InlineButton::new("Cancel", CLEARALL_CANCEL),
    ];
    CommandReply::Send(
        OutgoingMessage::text(
            ctx.chat_id,
            format!("Are you sure you want to delete all {count} tasks?"),
        )
        .with_keyboard(keyboard),
    )
}

/// Run a confirmation button press. Returns the text the prompt should be
/// edited to, or `None` when the press must be ignored.
///
/// A confirmation only acts on the chat the button was posted in.
pub async fn handle_callback(store: &Store, action: CallbackAction, chat_id: i64) -> Option<String> {
    match action {
        CallbackAction::CancelClear => Some("Cancelled.".to_string()),
        CallbackAction::ConfirmClear(target) if target != chat_id => {
            info!("ignoring clearall for chat {target} pressed in chat {chat_id}");
            None
        }
        CallbackAction::ConfirmClear(target) => match store.delete_all_tasks(target).await {
            Ok(deleted) => {
                info!("chat {target}: cleared {deleted} tasks");
                Some(format!("Deleted {deleted} tasks."))
            }
            Err(e) => {
                error!("clearall failed for chat {target}: {e}");
                None
            }
        },
    }
}
