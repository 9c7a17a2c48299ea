//! wa-inbox — conversation context and message persistence for a WhatsApp inbox.
//!
//! Request handlers call [`conversation::get_conversation_data`] to assemble
//! the conversation, contact, and instance views, then
//! [`messages::save_message`] to record a message. Storage sits behind the
//! [`store::ConversationStore`] trait.
//!
//! See `DESIGN.md` for how the pieces fit together.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod logging;

pub mod instance;
pub mod phone;
pub mod store;

pub mod conversation;
pub mod messages;
pub mod outcome;
