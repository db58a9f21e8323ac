//! Tests for the Telegram channel module.

use super::polling::update_to_event;
use super::send::message_body;
use super::types::*;
use taskbot_core::message::{ChannelEvent, InlineButton, TextFormat};

fn parse_update(json: &str) -> TgUpdate {
    serde_json::from_str(json).unwrap()
}

const BOT_ID: i64 = 999;

#[test]
fn test_plain_text_message() {
    let update = parse_update(
        r#"{
            "update_id": 1,
            "message": {
                "message_id": 42,
                "date": 1700000000,
                "from": {"id": 7, "is_bot": false, "first_name": "Ana", "username": "ana"},
                "chat": {"id": 7, "type": "private"},
                "text": "/add buy milk"
            }
        }"#,
    );
    let Some(ChannelEvent::Message(msg)) = update_to_event(update, Some(BOT_ID), &[]) else {
        panic!("expected a message event");
    };
    assert_eq!(msg.chat_id, 7);
    assert_eq!(msg.message_id, 42);
    assert_eq!(msg.sender_id, 7);
    assert_eq!(msg.sender_name.as_deref(), Some("@ana"));
    assert_eq!(msg.text, "/add buy milk");
    assert_eq!(msg.timestamp.timestamp(), 1700000000);
    assert!(!msg.reply_to_bot);
    assert!(!msg.is_group);
}

#[test]
fn test_group_reply_to_bot() {
    let update = parse_update(
        r#"{
            "update_id": 2,
            "message": {
                "message_id": 50,
                "from": {"id": 8, "first_name": "Bo", "last_name": "Li"},
                "chat": {"id": -100123, "type": "supergroup"},
                "text": "first one is done",
                "reply_to_message": {
                    "message_id": 49,
                    "from": {"id": 999, "is_bot": true, "first_name": "taskbot"},
                    "chat": {"id": -100123, "type": "supergroup"},
                    "text": "Open tasks:"
                }
            }
        }"#,
    );
    let Some(ChannelEvent::Message(msg)) = update_to_event(update, Some(BOT_ID), &[]) else {
        panic!("expected a message event");
    };
    assert!(msg.reply_to_bot);
    assert!(msg.is_group);
    assert_eq!(msg.sender_name.as_deref(), Some("Bo Li"));
}

#[test]
fn test_reply_to_other_bot_is_not_reply_to_us() {
    let json = r#"{
        "update_id": 3,
        "message": {
            "message_id": 60,
            "from": {"id": 8, "first_name": "Bo"},
            "chat": {"id": 8, "type": "private"},
            "text": "done",
            "reply_to_message": {
                "message_id": 59,
                "from": {"id": 555, "is_bot": true, "first_name": "otherbot"},
                "chat": {"id": 8, "type": "private"}
            }
        }
    }"#;
    let Some(ChannelEvent::Message(msg)) = update_to_event(parse_update(json), Some(BOT_ID), &[])
    else {
        panic!("expected a message event");
    };
    assert!(!msg.reply_to_bot);

    // Without a known bot id any bot author counts.
    let Some(ChannelEvent::Message(msg)) = update_to_event(parse_update(json), None, &[]) else {
        panic!("expected a message event");
    };
    assert!(msg.reply_to_bot);
}

#[test]
fn test_non_text_message_is_skipped() {
    let update = parse_update(
        r#"{
            "update_id": 4,
            "message": {
                "message_id": 1,
                "from": {"id": 7, "first_name": "Ana"},
                "chat": {"id": 7, "type": "private"}
            }
        }"#,
    );
    assert!(update_to_event(update, Some(BOT_ID), &[]).is_none());
}

#[test]
fn test_allowed_users_filter() {
    let json = r#"{
        "update_id": 5,
        "message": {
            "message_id": 1,
            "from": {"id": 7, "first_name": "Ana"},
            "chat": {"id": 7, "type": "private"},
            "text": "/task"
        }
    }"#;
    assert!(update_to_event(parse_update(json), Some(BOT_ID), &[1, 2]).is_none());
    assert!(update_to_event(parse_update(json), Some(BOT_ID), &[7]).is_some());
}

#[test]
fn test_callback_query() {
    let update = parse_update(
        r#"{
            "update_id": 6,
            "callback_query": {
                "id": "cb-1",
                "from": {"id": 7, "first_name": "Ana"},
                "message": {
                    "message_id": 77,
                    "chat": {"id": 7, "type": "private"},
                    "text": "Are you sure you want to delete all 3 tasks?"
                },
                "data": "clearall_confirm_7"
            }
        }"#,
    );
    let Some(ChannelEvent::Callback(cb)) = update_to_event(update, Some(BOT_ID), &[]) else {
        panic!("expected a callback event");
    };
    assert_eq!(cb.id, "cb-1");
    assert_eq!(cb.chat_id, 7);
    assert_eq!(cb.message_id, 77);
    assert_eq!(cb.sender_id, 7);
    assert_eq!(cb.data, "clearall_confirm_7");
}

#[test]
fn test_callback_without_message_is_skipped() {
    let update = parse_update(
        r#"{
            "update_id": 7,
            "callback_query": {
                "id": "cb-2",
                "from": {"id": 7, "first_name": "Ana"},
                "data": "clearall_cancel"
            }
        }"#,
    );
    assert!(update_to_event(update, Some(BOT_ID), &[]).is_none());
}

#[test]
fn test_tg_chat_type_defaults_when_missing() {
    let chat: TgChat = serde_json::from_str(r#"{"id": 123}"#).unwrap();
    assert_eq!(chat.chat_type, "");
    assert!(!chat.is_group());
}

#[test]
fn test_message_body_plain() {
    let body = message_body(7, "Cancelled.", TextFormat::Plain, &[]);
    assert_eq!(body["chat_id"], 7);
    assert_eq!(body["text"], "Cancelled.");
    assert!(body.get("parse_mode").is_none());
    assert!(body.get("reply_markup").is_none());
}

#[test]
fn test_message_body_html_with_keyboard() {
    let keyboard = vec![
        InlineButton::new("Yes, delete all", "clearall_confirm_7"),
        InlineButton::new("Cancel", "clearall_cancel"),
    ];
    let body = message_body(7, "<b>Open tasks:</b>", TextFormat::Html, &keyboard);
    assert_eq!(body["parse_mode"], "HTML");
    let row = &body["reply_markup"]["inline_keyboard"][0];
    assert_eq!(row[0]["text"], "Yes, delete all");
    assert_eq!(row[0]["callback_data"], "clearall_confirm_7");
    assert_eq!(row[1]["callback_data"], "clearall_cancel");
}

#[test]
fn test_error_response_parsing() {
    let resp: TgResponse<TgSentMessage> = serde_json::from_str(
        r#"{"ok": false, "error_code": 400, "description": "Bad Request: chat not found"}"#,
    )
    .unwrap();
    assert!(!resp.ok);
    assert!(resp.result.is_none());
    assert_eq!(
        resp.description.as_deref(),
        Some("Bad Request: chat not found")
    );
}

#[tokio::test]
async fn test_transport_error_does_not_leak_token() {
    let token = "123456:SECRET-TOKEN";
    let mut channel = super::TelegramChannel::new(taskbot_core::config::TelegramConfig {
        bot_token: token.into(),
        allowed_users: Vec::new(),
    });
    channel.base_url = format!("http://127.0.0.1:1/bot{token}");

    let err = channel
        .answer_callback_query("cb-1")
        .await
        .unwrap_err()
        .to_string();
    assert!(err.contains("telegram answerCallbackQuery failed"), "{err}");
    assert!(!err.contains("SECRET-TOKEN"), "{err}");
}
