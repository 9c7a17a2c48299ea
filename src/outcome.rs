//! Tagged JSON bodies for handler responses.
//!
//! Success serializes as `{"success": true, ...payload}` and failure as
//! `{"success": false, "error": "...", "details": "..."}` (`details` omitted
//! when absent).

use serde::Serialize;

use crate::conversation::{ConversationData, ConversationError};
use crate::messages::{ConversationTouch, MessageError, SavedMessage};

/// Failure body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    /// Human-readable error message.
    pub error: String,
    /// Diagnostic detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Success-or-failure response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome<T> {
    /// `true` when `body` is a payload.
    pub success: bool,
    /// Payload or failure fields, flattened into the body.
    #[serde(flatten)]
    pub body: Body<T>,
}

/// The fields next to `success`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Body<T> {
    /// Payload of a successful operation.
    Success(T),
    /// Error of a failed operation.
    Failure(Failure),
}

impl<T> Outcome<T> {
    /// Wrap a payload.
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            body: Body::Success(data),
        }
    }

    /// Wrap an error message and optional detail.
    pub fn failure(error: impl Into<String>, details: Option<String>) -> Self {
        Self {
            success: false,
            body: Body::Failure(Failure {
                error: error.into(),
                details,
            }),
        }
    }

    /// `true` for a successful operation.
    pub fn is_success(&self) -> bool {
        self.success
    }
}

impl From<Result<ConversationData, ConversationError>> for Outcome<ConversationData> {
    fn from(result: Result<ConversationData, ConversationError>) -> Self {
        match result {
            Ok(data) => Self::success(data),
            Err(err) => Self::failure(err.to_string(), err.details()),
        }
    }
}

/// Success payload for a saved message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageSaved {
    /// Id of the new message.
    pub message_id: String,
    /// Outcome of the conversation timestamp update.
    pub conversation_touch: ConversationTouch,
}

impl From<Result<SavedMessage, MessageError>> for Outcome<MessageSaved> {
    fn from(result: Result<SavedMessage, MessageError>) -> Self {
        match result {
            Ok(saved) => Self::success(MessageSaved {
                message_id: saved.id,
                conversation_touch: saved.conversation_touch,
            }),
            Err(err) => Self::failure(err.to_string(), err.details()),
        }
    }
}
