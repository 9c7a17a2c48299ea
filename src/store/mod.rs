//! Data store seam for conversations, contacts, instances, and messages.
//!
//! [`ConversationStore`] is the narrow query surface the inbox needs: a
//! tenant-scoped conversation+contact lookup, an instance lookup, a message
//! insert, and a conversation timestamp bump. [`SqliteStore`] implements it
//! over a `sqlx` pool.

pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use self::sqlite::SqliteStore;

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

/// A conversation as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationRow {
    /// Conversation id.
    pub id: String,
    /// Owning company (tenant).
    pub company_id: String,
    /// Contact on the other side.
    pub contact_id: String,
    /// Provider conversation id, e.g. a WhatsApp JID.
    pub external_id: Option<String>,
    /// Optional display title.
    pub title: Option<String>,
    /// Conversation status (`open`, `closed`, ...).
    pub status: String,
    /// Messaging instance serving this conversation.
    pub whatsapp_instance_id: Option<String>,
    /// RFC 3339 timestamp of the last message.
    pub last_message_at: Option<String>,
}

/// A contact as stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactRow {
    /// Contact id.
    pub id: String,
    /// Given name.
    pub first_name: Option<String>,
    /// Family name.
    pub last_name: Option<String>,
    /// Full display name, preferred when present.
    pub full_name: Option<String>,
    /// Stored phone number.
    pub phone: Option<String>,
    /// Email address.
    pub email: Option<String>,
    /// Contact's company.
    pub company_name: Option<String>,
}

/// The identity columns of a messaging instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceRow {
    /// Instance id.
    pub id: String,
    /// Instance name.
    pub name: String,
    /// Linked phone number.
    pub phone_number: Option<String>,
}

/// Direction of a message relative to the business.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Sent by the contact.
    Inbound,
    /// Sent to the contact.
    Outbound,
}

impl Direction {
    /// Returns the string representation stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inbound => "inbound",
            Self::Outbound => "outbound",
        }
    }

    /// Parse from a stored text value.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidEnum`] if the value is not a known direction.
    pub fn parse(s: &str) -> Result<Self, StoreError> {
        match s {
            "inbound" => Ok(Self::Inbound),
            "outbound" => Ok(Self::Outbound),
            other => Err(StoreError::InvalidEnum {
                field: "direction",
                value: other.to_owned(),
            }),
        }
    }
}

/// A message ready to be inserted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageRecord {
    /// Parent conversation.
    pub conversation_id: String,
    /// Inbound or outbound.
    pub direction: Direction,
    /// Provider message type (`text`, `image`, `document`, ...).
    pub message_type: String,
    /// Message body or caption.
    pub content: String,
    /// Whether an automation produced the message.
    pub sent_by_ai: bool,
    /// Delivery status.
    pub status: String,
    /// When the message was sent.
    pub sent_at: DateTime<Utc>,
    /// Provider message id, if known.
    pub external_id: Option<String>,
    /// Free-form JSON object.
    pub metadata: serde_json::Value,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A store implementation without a SQL pool failed (in-memory fakes,
    /// remote backends). [`SqliteStore`] never returns it.
    #[error("store backend error: {0}")]
    Backend(String),

    /// An invalid enum value was read from the database.
    #[error("invalid {field} value: {value:?}")]
    InvalidEnum {
        /// Which field contained the bad value.
        field: &'static str,
        /// The unexpected value.
        value: String,
    },
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Query surface used by the aggregator and the persister.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Fetch a conversation owned by `company_id` together with its contact.
    ///
    /// Returns `None` when no conversation matches both ids or the contact is
    /// missing.
    async fn find_conversation(
        &self,
        conversation_id: &str,
        company_id: &str,
    ) -> Result<Option<(ConversationRow, ContactRow)>, StoreError>;

    /// Fetch the identity columns of a messaging instance.
    async fn find_instance(&self, instance_id: &str) -> Result<Option<InstanceRow>, StoreError>;

    /// Insert a message and return its new id.
    async fn insert_message(&self, record: &MessageRecord) -> Result<String, StoreError>;

    /// Set a conversation's `last_message_at`.
    ///
    /// Returns `false` when no conversation has that id.
    async fn touch_conversation(
        &self,
        conversation_id: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError>;
}
