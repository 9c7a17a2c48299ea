//! Conversation context aggregation.
//!
//! [`get_conversation_data`] assembles what a request handler needs before
//! replying in a conversation: the conversation itself, the contact on the other
//! side, and the provider instance to send through.

use serde::Serialize;
use tracing::{debug, warn};

use crate::config::{ConfigError, EvolutionConfig};
use crate::instance::InstanceConfig;
use crate::phone::extract_phone_number;
use crate::store::{ContactRow, ConversationRow, ConversationStore};

/// Errors from [`get_conversation_data`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConversationError {
    /// No conversation with that id belongs to the company, or the lookup failed.
    #[error("conversation not found or inaccessible")]
    ConversationNotFound {
        /// Underlying cause, if any.
        details: Option<String>,
    },

    /// The conversation has no usable messaging instance.
    #[error("WhatsApp instance not found")]
    InstanceNotFound {
        /// Underlying cause, if any.
        details: Option<String>,
    },

    /// Connection settings are incomplete.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl ConversationError {
    /// Diagnostic detail to surface next to the error message.
    pub fn details(&self) -> Option<String> {
        match self {
            Self::ConversationNotFound { details } | Self::InstanceNotFound { details } => {
                details.clone()
            }
            Self::Config(err) => Some(err.to_string()),
        }
    }
}

/// Conversation fields exposed to handlers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversationView {
    /// Conversation id.
    pub id: String,
    /// Display title.
    pub title: Option<String>,
    /// Conversation status.
    pub status: String,
    /// Provider conversation id.
    pub external_id: Option<String>,
    /// Contact id.
    pub contact_id: String,
    /// Instance id.
    pub whatsapp_instance_id: Option<String>,
    /// Last activity timestamp.
    pub last_message_at: Option<String>,
}

/// Contact fields exposed to handlers, with derived phone numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContactView {
    /// Contact id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Stored phone, or the JID phone when none is stored.
    pub phone: String,
    /// Phone extracted from the conversation's JID (may be empty).
    pub whatsapp_phone: String,
    /// Email address.
    pub email: Option<String>,
    /// Contact's company.
    pub company_name: Option<String>,
}

/// Everything [`get_conversation_data`] returns on success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversationData {
    /// The conversation.
    pub conversation: ConversationView,
    /// The contact on the other side.
    pub contact: ContactView,
    /// The instance to send through.
    pub instance: InstanceConfig,
}

impl ConversationData {
    /// Copy of this data with the instance API key masked.
    pub fn redacted(&self) -> Self {
        Self {
            instance: self.instance.redacted(),
            ..self.clone()
        }
    }
}

/// Load a conversation, its contact, and its instance config.
///
/// Access control is limited to the tenant filter: the conversation must
/// belong to `company_id`. Callers are expected to have checked that the
/// requester may act for that company.
///
/// Server URL and API key of the returned instance always come from
/// `evolution`, never from the instance row.
///
/// # Errors
///
/// - [`ConversationError::ConversationNotFound`] when no conversation matches
///   both ids (or its contact is missing) or the lookup fails.
/// - [`ConversationError::InstanceNotFound`] when the conversation has no
///   instance id, the instance row is missing, or that lookup fails.
/// - [`ConversationError::Config`] when no API key is configured. Checked
///   before any lookup.
pub async fn get_conversation_data(
    store: &dyn ConversationStore,
    evolution: &EvolutionConfig,
    conversation_id: &str,
    company_id: &str,
) -> Result<ConversationData, ConversationError> {
    evolution.require_api_key()?;

    let (conversation, contact) = match store.find_conversation(conversation_id, company_id).await
    {
        Ok(Some(found)) => found,
        Ok(None) => {
            debug!(conversation_id, company_id, "conversation not found");
            return Err(ConversationError::ConversationNotFound { details: None });
        }
        Err(err) => {
            warn!(conversation_id, error = %err, "conversation lookup failed");
            return Err(ConversationError::ConversationNotFound {
                details: Some(err.to_string()),
            });
        }
    };

    let Some(instance_id) = conversation.whatsapp_instance_id.as_deref() else {
        return Err(ConversationError::InstanceNotFound {
            details: Some("conversation has no WhatsApp instance".to_owned()),
        });
    };

    let instance_row = match store.find_instance(instance_id).await {
        Ok(Some(row)) => row,
        Ok(None) => {
            debug!(conversation_id, instance_id, "instance not found");
            return Err(ConversationError::InstanceNotFound {
                details: Some(format!("no instance with id {instance_id}")),
            });
        }
        Err(err) => {
            warn!(instance_id, error = %err, "instance lookup failed");
            return Err(ConversationError::InstanceNotFound {
                details: Some(err.to_string()),
            });
        }
    };

    let whatsapp_phone = extract_phone_number(conversation.external_id.as_deref());
    let instance = InstanceConfig::from_row(instance_row, evolution)?;

    Ok(ConversationData {
        contact: contact_view(contact, whatsapp_phone),
        conversation: conversation_view(conversation),
        instance,
    })
}

fn conversation_view(row: ConversationRow) -> ConversationView {
    ConversationView {
        id: row.id,
        title: row.title,
        status: row.status,
        external_id: row.external_id,
        contact_id: row.contact_id,
        whatsapp_instance_id: row.whatsapp_instance_id,
        last_message_at: row.last_message_at,
    }
}

fn contact_view(row: ContactRow, whatsapp_phone: String) -> ContactView {
    let name = display_name(&row);
    let phone = row
        .phone
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| whatsapp_phone.clone());
    ContactView {
        id: row.id,
        name,
        phone,
        whatsapp_phone,
        email: row.email,
        company_name: row.company_name,
    }
}

/// `full_name` when present, else first and last name joined and trimmed.
fn display_name(row: &ContactRow) -> String {
    if let Some(full) = row.full_name.as_deref().filter(|n| !n.is_empty()) {
        return full.to_owned();
    }
    format!(
        "{} {}",
        row.first_name.as_deref().unwrap_or_default(),
        row.last_name.as_deref().unwrap_or_default()
    )
    .trim()
    .to_owned()
}
