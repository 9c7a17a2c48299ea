//! Tests for `src/messages.rs` — message persistence against SQLite.

use chrono::{TimeZone, Utc};
use serde_json::json;

use wa_inbox::messages::{
    save_message, save_message_at, ConversationTouch, MessageError, NewMessage,
};
use wa_inbox::store::{Direction, SqliteStore};

async fn setup_store() -> SqliteStore {
    let store = SqliteStore::connect("sqlite::memory:")
        .await
        .expect("in-memory pool should connect");
    store.migrate().await.expect("schema should apply");
    sqlx::raw_sql(
        "INSERT INTO contacts (id, full_name) VALUES ('ct-1', 'Ana Souza');
         INSERT INTO conversations (id, company_id, contact_id, external_id, status) \
         VALUES ('conv-1', 'co-1', 'ct-1', '5511999999999@s.whatsapp.net', 'open');",
    )
    .execute(store.pool())
    .await
    .expect("seed should apply");
    store
}

async fn stored_metadata(store: &SqliteStore, id: &str) -> serde_json::Value {
    let (metadata,): (String,) = sqlx::query_as("SELECT metadata FROM messages WHERE id = ?1")
        .bind(id)
        .fetch_one(store.pool())
        .await
        .expect("message row should exist");
    serde_json::from_str(&metadata).expect("metadata is JSON")
}

#[tokio::test]
async fn saves_message_and_touches_conversation() {
    let store = setup_store().await;
    let now = Utc
        .with_ymd_and_hms(2026, 10, 16, 14, 5, 0)
        .single()
        .expect("valid timestamp");

    let saved = save_message_at(
        &store,
        NewMessage::text("conv-1", Direction::Outbound, "Your order shipped"),
        now,
    )
    .await
    .expect("save should succeed");

    assert!(saved.is_complete());
    assert_eq!(saved.conversation_touch, ConversationTouch::Touched);

    let (status, sent_at): (String, String) =
        sqlx::query_as("SELECT status, sent_at FROM messages WHERE id = ?1")
            .bind(&saved.id)
            .fetch_one(store.pool())
            .await
            .expect("message row should exist");
    assert_eq!(status, "sent");
    assert_eq!(sent_at, "2026-10-16T14:05:00.000Z");

    let (last,): (Option<String>,) =
        sqlx::query_as("SELECT last_message_at FROM conversations WHERE id = 'conv-1'")
            .fetch_one(store.pool())
            .await
            .expect("conversation row should exist");
    assert_eq!(last.as_deref(), Some("2026-10-16T14:05:00.000Z"));
}

#[tokio::test]
async fn plain_message_metadata_marks_conversation_api() {
    let store = setup_store().await;

    let saved = save_message(
        &store,
        NewMessage::text("conv-1", Direction::Inbound, "hi there"),
    )
    .await
    .expect("save should succeed");

    assert_eq!(
        stored_metadata(&store, &saved.id).await,
        json!({ "sent_via": "conversation_api" })
    );
}

#[tokio::test]
async fn attachment_and_agent_flag_end_up_in_metadata() {
    let store = setup_store().await;
    let mut message = NewMessage::text("conv-1", Direction::Outbound, "");
    message.message_type = "document".to_owned();
    message.attachment = Some(json!({ "url": "x" }));
    message.sent_via_agent = true;

    let saved = save_message(&store, message)
        .await
        .expect("save should succeed");

    assert_eq!(
        stored_metadata(&store, &saved.id).await,
        json!({ "attachment": { "url": "x" }, "sent_via_agent": true })
    );
}

#[tokio::test]
async fn unknown_conversation_fails_without_touching_anything() {
    let store = setup_store().await;

    let err = save_message(
        &store,
        NewMessage::text("conv-404", Direction::Outbound, "hello"),
    )
    .await
    .expect_err("foreign key should reject the insert");

    assert!(matches!(err, MessageError::Insert(_)));
    assert!(err.details().is_some());

    let (count,): (i64,) = sqlx::query_as("SELECT count(*) FROM messages")
        .fetch_one(store.pool())
        .await
        .expect("count should succeed");
    assert_eq!(count, 0);
}

#[tokio::test]
async fn oversized_attachment_writes_nothing() {
    let store = setup_store().await;
    let mut message = NewMessage::text("conv-1", Direction::Outbound, "video");
    message.attachment = Some(json!({ "url": "x", "size": 60 * 1024 * 1024 }));

    let err = save_message(&store, message)
        .await
        .expect_err("attachment over the ceiling should fail");
    assert!(matches!(err, MessageError::AttachmentTooLarge { .. }));

    let (count,): (i64,) = sqlx::query_as("SELECT count(*) FROM messages")
        .fetch_one(store.pool())
        .await
        .expect("count should succeed");
    assert_eq!(count, 0);
}
