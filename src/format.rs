//! Task list rendering for Telegram HTML messages.

use chrono::{DateTime, Duration, Utc};
use taskbot_memory::Task;

/// Budget for a rendered list, kept under Telegram's 4096 limit.
pub const MAX_MESSAGE_LENGTH: usize = 4000;

/// Tasks older than this are shown in bold.
pub const OVERDUE_HOURS: i64 = 24;

const HEADER: &str = "<b>Open tasks:</b>\n\n";

/// Whether a task has been open for more than [`OVERDUE_HOURS`].
pub fn is_overdue(task: &Task, now: DateTime<Utc>) -> bool {
    now - task.created_at > Duration::hours(OVERDUE_HOURS)
}

/// Escape the characters Telegram's HTML parse mode treats as markup.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render a numbered task list.
///
/// Lengths are counted in chars. When the next line would push the message
/// past [`MAX_MESSAGE_LENGTH`], a "... and N more tasks" trailer is appended
/// instead and rendering stops.
pub fn format_task_list(tasks: &[Task], now: DateTime<Utc>) -> String {
    let mut message = HEADER.to_string();
    let mut len = HEADER.chars().count();

    for (i, task) in tasks.iter().enumerate() {
        let num = i + 1;
        let desc = escape_html(&task.description);
        let line = if is_overdue(task, now) {
            format!("<b>{num}.</b> <b>{desc}</b>\n")
        } else {
            format!("<b>{num}.</b> {desc}\n")
        };

        let line_len = line.chars().count();
        if len + line_len > MAX_MESSAGE_LENGTH {
            message.push_str(&format!("\n... and {} more tasks", tasks.len() - i));
            break;
        }

        message.push_str(&line);
        len += line_len;
    }

    message
}

/// Plain numbered list fed to LLM prompts: `1. first\n2. second`.
pub fn numbered_descriptions(tasks: &[Task]) -> String {
    tasks
        .iter()
        .enumerate()
        .map(|(i, t)| format!("{}. {}", i + 1, t.description))
        .collect::<Vec<_>>()
        .join("\n")
}
