//! SQLite implementation of [`ConversationStore`].

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::{debug, info, trace};

use super::{ContactRow, ConversationRow, ConversationStore, InstanceRow, MessageRecord, StoreError};

/// Schema applied by [`SqliteStore::migrate`].
const SCHEMA_SQL: &str = include_str!("../../migrations/001_schema.sql");

/// Pool size for file-backed databases.
const MAX_CONNECTIONS: u32 = 5;

/// Row type for the conversation + contact join.
type ConversationContactRow = (
    String,
    String,
    String,
    Option<String>,
    Option<String>,
    String,
    Option<String>,
    Option<String>,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
);

/// Row type for instance lookups.
type InstanceTuple = (String, String, Option<String>);

/// [`ConversationStore`] backed by a SQLite connection pool.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    db: SqlitePool,
}

impl SqliteStore {
    /// Wrap an existing pool.
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Open a pool for a `sqlite:` URL, creating the file if missing.
    ///
    /// In-memory databases get a single connection that is never recycled, so
    /// every query sees the same database for the life of the pool.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the URL is invalid or the
    /// connection fails.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let opts = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let in_memory = url.contains(":memory:");
        let mut pool = SqlitePoolOptions::new();
        let max_connections = if in_memory {
            pool = pool
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
            1
        } else {
            MAX_CONNECTIONS
        };
        let db = pool
            .max_connections(max_connections)
            .connect_with(opts)
            .await?;
        debug!(max_connections, "sqlite pool opened");
        Ok(Self { db })
    }

    /// Apply the inbox schema. Safe to run repeatedly.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if a statement fails.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA_SQL).execute(&self.db).await?;
        info!("inbox schema applied");
        Ok(())
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.db
    }
}

/// RFC 3339 with millisecond precision and a `Z` suffix, so text ordering
/// matches time ordering.
fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[async_trait]
impl ConversationStore for SqliteStore {
    async fn find_conversation(
        &self,
        conversation_id: &str,
        company_id: &str,
    ) -> Result<Option<(ConversationRow, ContactRow)>, StoreError> {
        let row: Option<ConversationContactRow> = sqlx::query_as(
            "SELECT c.id, c.company_id, c.contact_id, c.external_id, c.title, c.status, \
             c.whatsapp_instance_id, c.last_message_at, \
             ct.id, ct.first_name, ct.last_name, ct.full_name, ct.phone, ct.email, \
             ct.company_name \
             FROM conversations c \
             INNER JOIN contacts ct ON ct.id = c.contact_id \
             WHERE c.id = ?1 AND c.company_id = ?2",
        )
        .bind(conversation_id)
        .bind(company_id)
        .fetch_optional(&self.db)
        .await?;

        trace!(conversation_id, found = row.is_some(), "conversation lookup");

        Ok(row.map(
            |(
                id,
                company_id,
                contact_id,
                external_id,
                title,
                status,
                whatsapp_instance_id,
                last_message_at,
                ct_id,
                first_name,
                last_name,
                full_name,
                phone,
                email,
                company_name,
            )| {
                (
                    ConversationRow {
                        id,
                        company_id,
                        contact_id,
                        external_id,
                        title,
                        status,
                        whatsapp_instance_id,
                        last_message_at,
                    },
                    ContactRow {
                        id: ct_id,
                        first_name,
                        last_name,
                        full_name,
                        phone,
                        email,
                        company_name,
                    },
                )
            },
        ))
    }

    async fn find_instance(&self, instance_id: &str) -> Result<Option<InstanceRow>, StoreError> {
        let row: Option<InstanceTuple> = sqlx::query_as(
            "SELECT id, name, phone_number FROM whatsapp_instances WHERE id = ?1",
        )
        .bind(instance_id)
        .fetch_optional(&self.db)
        .await?;

        trace!(instance_id, found = row.is_some(), "instance lookup");

        Ok(row.map(|(id, name, phone_number)| InstanceRow {
            id,
            name,
            phone_number,
        }))
    }

    async fn insert_message(&self, record: &MessageRecord) -> Result<String, StoreError> {
        let id = uuid::Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO messages (id, conversation_id, direction, message_type, content, \
             sent_by_ai, status, sent_at, external_id, metadata) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        )
        .bind(&id)
        .bind(&record.conversation_id)
        .bind(record.direction.as_str())
        .bind(&record.message_type)
        .bind(&record.content)
        .bind(record.sent_by_ai)
        .bind(&record.status)
        .bind(format_timestamp(record.sent_at))
        .bind(&record.external_id)
        .bind(record.metadata.to_string())
        .execute(&self.db)
        .await?;

        trace!(message_id = %id, conversation_id = %record.conversation_id, "message inserted");
        Ok(id)
    }

    async fn touch_conversation(
        &self,
        conversation_id: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE conversations SET last_message_at = ?1 WHERE id = ?2")
            .bind(format_timestamp(at))
            .bind(conversation_id)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
