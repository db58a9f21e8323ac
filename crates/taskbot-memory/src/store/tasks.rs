//! Per-chat task list CRUD.
//!
//! Task numbers shown to users are 1-based positions in the id-ordered list
//! of a chat. They are never stored, so they shift whenever an earlier task
//! is deleted.

use super::Store;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use taskbot_core::error::TaskbotError;

/// SQLite `CURRENT_TIMESTAMP` layout.
const SQLITE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A stored task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Task {
    pub id: i64,
    pub chat_id: i64,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl Task {
    fn from_row(row: (i64, i64, String, String)) -> Result<Self, TaskbotError> {
        let (id, chat_id, description, created_at) = row;
        Ok(Self {
            id,
            chat_id,
            description,
            created_at: parse_timestamp(&created_at)?,
        })
    }
}

/// Parse a stored timestamp. Accepts the SQLite default layout and RFC 3339.
pub(super) fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, TaskbotError> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, SQLITE_TIMESTAMP_FORMAT) {
        return Ok(naive.and_utc());
    }
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| TaskbotError::Memory(format!("bad timestamp '{value}': {e}")))
}

impl Store {
    /// Append a task to a chat's list.
    pub async fn add_task(&self, chat_id: i64, description: &str) -> Result<Task, TaskbotError> {
        self.add_task_at(chat_id, description, Utc::now()).await
    }

    /// Append a task with an explicit creation time.
    pub async fn add_task_at(
        &self,
        chat_id: i64,
        description: &str,
        created_at: DateTime<Utc>,
    ) -> Result<Task, TaskbotError> {
        // Second precision, same as CURRENT_TIMESTAMP.
        let stamp = created_at.format(SQLITE_TIMESTAMP_FORMAT).to_string();
        let result =
            sqlx::query("INSERT INTO tasks (chat_id, description, created_at) VALUES (?, ?, ?)")
                .bind(chat_id)
                .bind(description)
                .bind(&stamp)
                .execute(&self.pool)
                .await
                .map_err(|e| TaskbotError::Memory(format!("add task failed: {e}")))?;

        Ok(Task {
            id: result.last_insert_rowid(),
            chat_id,
            description: description.to_string(),
            created_at: parse_timestamp(&stamp)?,
        })
    }

    /// All tasks of a chat, in display order.
    pub async fn get_tasks(&self, chat_id: i64) -> Result<Vec<Task>, TaskbotError> {
        let rows: Vec<(i64, i64, String, String)> = sqlx::query_as(
            "SELECT id, chat_id, description, created_at \
             FROM tasks \
             WHERE chat_id = ? \
             ORDER BY id ASC",
        )
        .bind(chat_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| TaskbotError::Memory(format!("get tasks failed: {e}")))?;

        rows.into_iter().map(Task::from_row).collect()
    }

    /// Look up a task by its 1-based display number.
    pub async fn get_task_by_number(
        &self,
        chat_id: i64,
        number: i64,
    ) -> Result<Option<Task>, TaskbotError> {
        if number < 1 {
            return Ok(None);
        }
        let row: Option<(i64, i64, String, String)> = sqlx::query_as(
            "SELECT id, chat_id, description, created_at \
             FROM tasks \
             WHERE chat_id = ? \
             ORDER BY id ASC \
             LIMIT 1 OFFSET ?",
        )
        .bind(chat_id)
        .bind(number - 1)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| TaskbotError::Memory(format!("get task by number failed: {e}")))?;

        row.map(Task::from_row).transpose()
    }

    /// Delete a task by id. Returns true if a row was removed.
    pub async fn delete_task(&self, id: i64) -> Result<bool, TaskbotError> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| TaskbotError::Memory(format!("delete task failed: {e}")))?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete every task of a chat. Returns the number of removed rows.
    pub async fn delete_all_tasks(&self, chat_id: i64) -> Result<u64, TaskbotError> {
        let result = sqlx::query("DELETE FROM tasks WHERE chat_id = ?")
            .bind(chat_id)
            .execute(&self.pool)
            .await
            .map_err(|e| TaskbotError::Memory(format!("delete all tasks failed: {e}")))?;
        Ok(result.rows_affected())
    }

    /// Number of open tasks in a chat.
    pub async fn count_tasks(&self, chat_id: i64) -> Result<i64, TaskbotError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tasks WHERE chat_id = ?")
            .bind(chat_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| TaskbotError::Memory(format!("count tasks failed: {e}")))?;
        Ok(count)
    }

    /// Every chat that currently has at least one task.
    pub async fn get_all_chats_with_tasks(&self) -> Result<Vec<i64>, TaskbotError> {
        let rows: Vec<(i64,)> = sqlx::query_as("SELECT DISTINCT chat_id FROM tasks ORDER BY chat_id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| TaskbotError::Memory(format!("list chats failed: {e}")))?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}
