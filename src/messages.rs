//! Message persistence.
//!
//! A save is two writes: insert the message, then bump the parent
//! conversation's `last_message_at`. They are not one transaction. When the
//! second write does not land, the message is still saved and the miss is
//! reported in [`SavedMessage::conversation_touch`].

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::store::{ConversationStore, Direction, MessageRecord};

/// Delivery status written for every persisted message.
pub const SENT: &str = "sent";

/// `sent_via` marker for messages without an attachment.
pub const SENT_VIA_CONVERSATION_API: &str = "conversation_api";

/// Largest attachment accepted, matching the upload ceiling (50 MiB).
pub const MAX_ATTACHMENT_BYTES: u64 = 50 * 1024 * 1024;

/// Errors from [`save_message`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MessageError {
    /// The message insert failed.
    #[error("failed to save message: {0}")]
    Insert(String),

    /// The attachment exceeds the upload ceiling.
    #[error("attachment too large: {size} bytes exceeds {max} byte limit")]
    AttachmentTooLarge {
        /// Declared attachment size in bytes.
        size: u64,
        /// Maximum allowed size.
        max: u64,
    },
}

impl MessageError {
    /// Diagnostic detail to surface next to the error message.
    pub fn details(&self) -> Option<String> {
        match self {
            Self::Insert(cause) => Some(cause.clone()),
            Self::AttachmentTooLarge { .. } => None,
        }
    }
}

/// A message to persist.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMessage {
    /// Parent conversation.
    pub conversation_id: String,
    /// Inbound or outbound.
    pub direction: Direction,
    /// Provider message type.
    pub message_type: String,
    /// Body or caption.
    pub content: String,
    /// Attachment metadata (url, mime type, size, ...).
    pub attachment: Option<Value>,
    /// Whether an automation produced the message.
    pub sent_by_ai: bool,
    /// Provider message id.
    pub external_id: Option<String>,
    /// Whether the message went out through an agent.
    pub sent_via_agent: bool,
}

impl NewMessage {
    /// A plain text message with every optional field unset.
    pub fn text(
        conversation_id: impl Into<String>,
        direction: Direction,
        content: impl Into<String>,
    ) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            direction,
            message_type: "text".to_owned(),
            content: content.into(),
            attachment: None,
            sent_by_ai: false,
            external_id: None,
            sent_via_agent: false,
        }
    }
}

/// What happened to the conversation's `last_message_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "error")]
pub enum ConversationTouch {
    /// Timestamp updated.
    Touched,
    /// No conversation row matched.
    ConversationMissing,
    /// The update failed.
    Failed(String),
}

/// Result of a successful insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SavedMessage {
    /// Id of the new message.
    pub id: String,
    /// Outcome of the conversation timestamp update.
    pub conversation_touch: ConversationTouch,
}

impl SavedMessage {
    /// `true` when both writes landed.
    pub fn is_complete(&self) -> bool {
        self.conversation_touch == ConversationTouch::Touched
    }
}

/// Persist a message stamped with the current time.
///
/// # Errors
///
/// See [`save_message_at`].
pub async fn save_message(
    store: &dyn ConversationStore,
    message: NewMessage,
) -> Result<SavedMessage, MessageError> {
    save_message_at(store, message, Utc::now()).await
}

/// Persist a message with an explicit timestamp.
///
/// `now` is used both as `sent_at` and as the conversation's new
/// `last_message_at`.
///
/// # Errors
///
/// - [`MessageError::AttachmentTooLarge`] before anything is written.
/// - [`MessageError::Insert`] when the insert fails. The conversation is
///   not touched in that case.
pub async fn save_message_at(
    store: &dyn ConversationStore,
    message: NewMessage,
    now: DateTime<Utc>,
) -> Result<SavedMessage, MessageError> {
    validate(&message)?;

    let record = build_record(message, now);
    let id = store.insert_message(&record).await.map_err(|err| {
        warn!(conversation_id = %record.conversation_id, error = %err, "message insert failed");
        MessageError::Insert(err.to_string())
    })?;

    let conversation_touch = match store.touch_conversation(&record.conversation_id, now).await {
        Ok(true) => ConversationTouch::Touched,
        Ok(false) => {
            warn!(conversation_id = %record.conversation_id, message_id = %id,
                "message saved but conversation row is gone");
            ConversationTouch::ConversationMissing
        }
        Err(err) => {
            warn!(conversation_id = %record.conversation_id, message_id = %id, error = %err,
                "message saved but last_message_at update failed");
            ConversationTouch::Failed(err.to_string())
        }
    };

    debug!(message_id = %id, direction = record.direction.as_str(), "message saved");
    Ok(SavedMessage {
        id,
        conversation_touch,
    })
}

fn validate(message: &NewMessage) -> Result<(), MessageError> {
    let Some(size) = message
        .attachment
        .as_ref()
        .and_then(|a| a.get("size"))
        .and_then(declared_size)
    else {
        return Ok(());
    };
    if size > MAX_ATTACHMENT_BYTES {
        return Err(MessageError::AttachmentTooLarge {
            size,
            max: MAX_ATTACHMENT_BYTES,
        });
    }
    Ok(())
}

/// Attachment `size` as whole bytes. Accepts integers, floats, and numeric
/// strings; fractions round up.
fn declared_size(size: &Value) -> Option<u64> {
    if let Some(bytes) = size.as_u64() {
        return Some(bytes);
    }
    let bytes = match size {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !bytes.is_finite() || bytes < 0.0 {
        return None;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // finite, non-negative; saturates
    let whole = bytes.ceil() as u64;
    Some(whole)
}

fn build_record(message: NewMessage, now: DateTime<Utc>) -> MessageRecord {
    let metadata = build_metadata(message.attachment, message.sent_via_agent);
    MessageRecord {
        conversation_id: message.conversation_id,
        direction: message.direction,
        message_type: message.message_type,
        content: message.content,
        sent_by_ai: message.sent_by_ai,
        status: SENT.to_owned(),
        sent_at: now,
        external_id: message.external_id,
        metadata,
    }
}

/// `{attachment}` or `{sent_via: "conversation_api"}`, plus
/// `sent_via_agent: true` when flagged.
pub fn build_metadata(attachment: Option<Value>, sent_via_agent: bool) -> Value {
    let mut meta = Map::new();
    match attachment {
        Some(attachment) => {
            meta.insert("attachment".to_owned(), attachment);
        }
        None => {
            meta.insert("sent_via".to_owned(), json!(SENT_VIA_CONVERSATION_API));
        }
    }
    if sent_via_agent {
        meta.insert("sent_via_agent".to_owned(), Value::Bool(true));
    }
    Value::Object(meta)
}
