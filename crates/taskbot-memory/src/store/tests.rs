use super::{hour_key, Store};
use chrono::{TimeZone, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;
use taskbot_core::config::MemoryConfig;

/// Create an in-memory store for testing.
async fn test_store() -> Store {
    // For in-memory, we need to bypass shellexpand.
    let opts = SqliteConnectOptions::from_str("sqlite::memory:")
        .unwrap()
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(opts)
        .await
        .unwrap();
    Store::run_migrations(&pool).await.unwrap();
    Store { pool }
}

#[tokio::test]
async fn test_add_and_list_tasks_in_order() {
    let store = test_store().await;
    let a = store.add_task(10, "Prepare presentation").await.unwrap();
    let b = store.add_task(10, "Call the bank").await.unwrap();
    store.add_task(20, "Other chat").await.unwrap();

    assert!(b.id > a.id);
    assert_eq!(a.chat_id, 10);

    let tasks = store.get_tasks(10).await.unwrap();
    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[0].description, "Prepare presentation");
    assert_eq!(tasks[1].description, "Call the bank");
    assert_eq!(tasks[0], a);
}

#[tokio::test]
async fn test_empty_chat_has_no_tasks() {
    let store = test_store().await;
    assert!(store.get_tasks(99).await.unwrap().is_empty());
    assert_eq!(store.count_tasks(99).await.unwrap(), 0);
}

#[tokio::test]
async fn test_created_at_round_trips_at_second_precision() {
    let store = test_store().await;
    let at = Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap();
    store.add_task_at(1, "pi day", at).await.unwrap();
    let tasks = store.get_tasks(1).await.unwrap();
    assert_eq!(tasks[0].created_at, at);
}

#[tokio::test]
async fn test_default_timestamp_is_parsed() {
    let store = test_store().await;
    sqlx::query("INSERT INTO tasks (chat_id, description) VALUES (?, ?)")
        .bind(5_i64)
        .bind("legacy row")
        .execute(store.pool())
        .await
        .unwrap();
    let tasks = store.get_tasks(5).await.unwrap();
    assert_eq!(tasks.len(), 1);
    assert!(tasks[0].created_at <= Utc::now());
}

#[tokio::test]
async fn test_get_task_by_number() {
    let store = test_store().await;
    store.add_task(1, "first").await.unwrap();
    store.add_task(1, "second").await.unwrap();
    store.add_task(1, "third").await.unwrap();

    let t = store.get_task_by_number(1, 2).await.unwrap().unwrap();
    assert_eq!(t.description, "second");

    assert!(store.get_task_by_number(1, 0).await.unwrap().is_none());
    assert!(store.get_task_by_number(1, -3).await.unwrap().is_none());
    assert!(store.get_task_by_number(1, 4).await.unwrap().is_none());
    assert!(store.get_task_by_number(2, 1).await.unwrap().is_none());
}

#[tokio::test]
async fn test_numbers_shift_after_delete() {
    let store = test_store().await;
    let first = store.add_task(1, "first").await.unwrap();
    store.add_task(1, "second").await.unwrap();

    assert!(store.delete_task(first.id).await.unwrap());
    let t = store.get_task_by_number(1, 1).await.unwrap().unwrap();
    assert_eq!(t.description, "second");

    // Second delete of the same id is a no-op.
    assert!(!store.delete_task(first.id).await.unwrap());
}

#[tokio::test]
async fn test_delete_all_tasks_is_scoped_to_chat() {
    let store = test_store().await;
    store.add_task(1, "a").await.unwrap();
    store.add_task(1, "b").await.unwrap();
    store.add_task(2, "c").await.unwrap();

    assert_eq!(store.delete_all_tasks(1).await.unwrap(), 2);
    assert_eq!(store.count_tasks(1).await.unwrap(), 0);
    assert_eq!(store.count_tasks(2).await.unwrap(), 1);
    assert_eq!(store.delete_all_tasks(1).await.unwrap(), 0);
}

#[tokio::test]
async fn test_get_all_chats_with_tasks() {
    let store = test_store().await;
    assert!(store.get_all_chats_with_tasks().await.unwrap().is_empty());

    store.add_task(-100, "group task").await.unwrap();
    store.add_task(7, "a").await.unwrap();
    store.add_task(7, "b").await.unwrap();

    assert_eq!(store.get_all_chats_with_tasks().await.unwrap(), vec![-100, 7]);
}

#[test]
fn test_hour_key_format() {
    let at = Utc.with_ymd_and_hms(2025, 1, 2, 3, 59, 59).unwrap();
    assert_eq!(hour_key(at), "2025-01-02-03");
}

#[tokio::test]
async fn test_message_count_increments_per_hour() {
    let store = test_store().await;
    let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 10, 0).unwrap();

    assert_eq!(store.get_message_count(1, now).await.unwrap(), 0);
    assert_eq!(store.increment_message_count(1, now).await.unwrap(), 1);
    assert_eq!(store.increment_message_count(1, now).await.unwrap(), 2);
    assert_eq!(store.increment_message_count(2, now).await.unwrap(), 1);
    assert_eq!(store.get_message_count(1, now).await.unwrap(), 2);

    let next_hour = Utc.with_ymd_and_hms(2025, 6, 1, 13, 0, 0).unwrap();
    assert_eq!(store.get_message_count(1, next_hour).await.unwrap(), 0);
    assert_eq!(store.increment_message_count(1, next_hour).await.unwrap(), 1);
}

#[tokio::test]
async fn test_cleanup_keeps_yesterday_and_today() {
    let store = test_store().await;
    let two_days_ago = Utc.with_ymd_and_hms(2025, 6, 1, 23, 0, 0).unwrap();
    let yesterday = Utc.with_ymd_and_hms(2025, 6, 2, 0, 0, 0).unwrap();
    let now = Utc.with_ymd_and_hms(2025, 6, 3, 15, 0, 0).unwrap();

    store.increment_message_count(1, two_days_ago).await.unwrap();
    store.increment_message_count(1, yesterday).await.unwrap();
    store.increment_message_count(1, now).await.unwrap();

    assert_eq!(store.cleanup_old_message_counts(now).await.unwrap(), 1);
    assert_eq!(store.get_message_count(1, two_days_ago).await.unwrap(), 0);
    assert_eq!(store.get_message_count(1, yesterday).await.unwrap(), 1);
    assert_eq!(store.get_message_count(1, now).await.unwrap(), 1);
}

#[tokio::test]
async fn test_migrations_are_idempotent() {
    let store = test_store().await;
    store.add_task(1, "survives").await.unwrap();
    Store::run_migrations(store.pool()).await.unwrap();
    assert_eq!(store.count_tasks(1).await.unwrap(), 1);
}

#[tokio::test]
async fn test_new_creates_file_database() {
    let tmp = tempfile::tempdir().unwrap();
    let db_path = tmp.path().join("nested/dir/tasks.db");
    let config = MemoryConfig {
        db_path: db_path.to_string_lossy().into_owned(),
    };

    let store = Store::new(&config).await.unwrap();
    store.add_task(1, "persisted").await.unwrap();
    assert!(db_path.exists());
    assert!(store.db_size().await.unwrap() > 0);
    store.close().await;

    let reopened = Store::new(&config).await.unwrap();
    assert_eq!(reopened.count_tasks(1).await.unwrap(), 1);
}
