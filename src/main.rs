//! wa-inbox CLI entry point.
//!
//! Operator commands over the inbox database: apply the schema, show a
//! conversation's context, record a message, extract a phone from a JID.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{debug, info};

use wa_inbox::config::Config;
use wa_inbox::conversation::get_conversation_data;
use wa_inbox::logging::{self, LoggingGuard};
use wa_inbox::messages::{save_message, NewMessage};
use wa_inbox::outcome::{MessageSaved, Outcome};
use wa_inbox::phone::extract_phone_number;
use wa_inbox::store::{Direction, SqliteStore};

/// wa-inbox — WhatsApp conversation context and message log.
#[derive(Parser)]
#[command(name = "wa-inbox", version, about)]
struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

/// Available CLI subcommands.
#[derive(Subcommand)]
enum Command {
    /// Create the inbox tables if they do not exist.
    Init,
    /// Print a conversation with its contact and instance.
    Show {
        /// Conversation id.
        conversation_id: String,
        /// Company that owns the conversation.
        #[arg(long)]
        company: String,
    },
    /// Record a message in a conversation.
    Send {
        /// Conversation id.
        conversation_id: String,
        /// `inbound` or `outbound`.
        #[arg(long, value_parser = parse_direction, default_value = "outbound")]
        direction: Direction,
        /// Provider message type.
        #[arg(long = "type", default_value = "text")]
        message_type: String,
        /// Message body or caption.
        #[arg(long, default_value = "")]
        content: String,
        /// Attachment metadata as a JSON object.
        #[arg(long, value_parser = parse_attachment)]
        attachment: Option<serde_json::Value>,
        /// Mark the message as produced by automation.
        #[arg(long)]
        ai: bool,
        /// Mark the message as sent through an agent.
        #[arg(long)]
        via_agent: bool,
        /// Provider message id.
        #[arg(long)]
        external_id: Option<String>,
    },
    /// Print the phone number embedded in a WhatsApp JID.
    Phone {
        /// JID such as `5511999999999@s.whatsapp.net`.
        jid: String,
    },
}

fn parse_direction(s: &str) -> Result<Direction, String> {
    Direction::parse(s).map_err(|e| e.to_string())
}

fn parse_attachment(s: &str) -> Result<serde_json::Value, String> {
    let value: serde_json::Value =
        serde_json::from_str(s).map_err(|e| format!("invalid attachment JSON: {e}"))?;
    if !value.is_object() {
        return Err("attachment must be a JSON object".to_owned());
    }
    Ok(value)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Phone extraction needs no config or database.
    if let Command::Phone { jid } = &cli.command {
        println!("{}", extract_phone_number(Some(jid)));
        return Ok(());
    }

    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            return Err(e).context("failed to load .env");
        }
    }
    let config = Config::load().context("failed to load configuration")?;
    let _logging_guard = init_logging(&config)?;
    debug!(?config, "configuration loaded");

    let store = SqliteStore::connect(&config.database.url)
        .await
        .with_context(|| format!("failed to open database {}", config.database.url))?;

    match cli.command {
        Command::Init => {
            store.migrate().await.context("failed to apply schema")?;
            info!(url = %config.database.url, "database ready");
        }
        Command::Show {
            conversation_id,
            company,
        } => {
            let result =
                get_conversation_data(&store, &config.evolution, &conversation_id, &company)
                    .await
                    .map(|data| data.redacted());
            print_json(&Outcome::from(result))?;
        }
        Command::Send {
            conversation_id,
            direction,
            message_type,
            content,
            attachment,
            ai,
            via_agent,
            external_id,
        } => {
            let message = NewMessage {
                conversation_id,
                direction,
                message_type,
                content,
                attachment,
                sent_by_ai: ai,
                external_id,
                sent_via_agent: via_agent,
            };
            let outcome: Outcome<MessageSaved> = save_message(&store, message).await.into();
            print_json(&outcome)?;
        }
        Command::Phone { .. } => {}
    }

    Ok(())
}

fn init_logging(config: &Config) -> anyhow::Result<Option<LoggingGuard>> {
    match config.logging.dir.as_deref() {
        Some(dir) => Ok(Some(logging::init_production(dir, &config.logging.level)?)),
        None => {
            logging::init_cli(&config.logging.level);
            Ok(None)
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("failed to render JSON")?;
    println!("{rendered}");
    Ok(())
}
