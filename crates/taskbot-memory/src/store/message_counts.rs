//! Hourly message counters used by the chatter guard.

use super::Store;
use chrono::{DateTime, Duration, Utc};
use taskbot_core::error::TaskbotError;
use tracing::debug;

/// Bucket key for the UTC hour containing `at`: `YYYY-MM-DD-HH`.
pub fn hour_key(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d-%H").to_string()
}

impl Store {
    /// Count one more message for the current hour. Returns the updated count.
    pub async fn increment_message_count(
        &self,
        chat_id: i64,
        now: DateTime<Utc>,
    ) -> Result<i64, TaskbotError> {
        let (count,): (i64,) = sqlx::query_as(
            "INSERT INTO message_counts (chat_id, hour_key, count) VALUES (?, ?, 1) \
             ON CONFLICT(chat_id, hour_key) DO UPDATE SET count = count + 1 \
             RETURNING count",
        )
        .bind(chat_id)
        .bind(hour_key(now))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| TaskbotError::Memory(format!("increment message count failed: {e}")))?;
        Ok(count)
    }

    /// Messages seen in the current hour, 0 if none.
    pub async fn get_message_count(
        &self,
        chat_id: i64,
        now: DateTime<Utc>,
    ) -> Result<i64, TaskbotError> {
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT count FROM message_counts WHERE chat_id = ? AND hour_key = ?",
        )
        .bind(chat_id)
        .bind(hour_key(now))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| TaskbotError::Memory(format!("get message count failed: {e}")))?;
        Ok(row.map(|(c,)| c).unwrap_or(0))
    }

    /// Drop counters older than the start of yesterday (UTC).
    pub async fn cleanup_old_message_counts(&self, now: DateTime<Utc>) -> Result<u64, TaskbotError> {
        let cutoff = format!("{}-00", (now - Duration::days(1)).format("%Y-%m-%d"));
        let result = sqlx::query("DELETE FROM message_counts WHERE hour_key < ?")
            .bind(&cutoff)
            .execute(&self.pool)
            .await
            .map_err(|e| TaskbotError::Memory(format!("cleanup message counts failed: {e}")))?;
        let removed = result.rows_affected();
        if removed > 0 {
            debug!("pruned {removed} message counters older than {cutoff}");
        }
        Ok(removed)
    }
}
