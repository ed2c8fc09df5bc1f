//! `devopscli query`: multi-turn conversations persisted between runs.

use anyhow::{bail, Context, Result};
use tracing::{debug, warn};

use crate::client::{ChatTransport, ClientError};
use crate::config::Config;
use crate::protocol::Turn;
use crate::store::{
    ConversationStore, ConversationSummary, FileBackend, StorageBackend, StoreError,
};

/// What `devopscli query` was asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryAction {
    Ask {
        message: String,
        conversation_id: Option<u64>,
    },
    List,
    Delete(u64),
    Clear,
}

impl QueryAction {
    /// Pick the action from the raw flags. `--clear` wins over `--delete`,
    /// which wins over `--list`; otherwise a message is required.
    pub fn from_flags(
        message: Option<String>,
        conversation_id: Option<u64>,
        list: bool,
        clear: bool,
        delete: Option<u64>,
    ) -> Result<Self> {
        if clear {
            return Ok(Self::Clear);
        }
        if let Some(id) = delete {
            return Ok(Self::Delete(id));
        }
        if list {
            return Ok(Self::List);
        }
        match message {
            Some(message) if !message.trim().is_empty() => Ok(Self::Ask {
                message,
                conversation_id,
            }),
            _ => bail!("Please provide a query or use --list, --clear, or --delete."),
        }
    }
}

/// Result of one question/answer exchange.
#[derive(Debug)]
pub struct TurnOutcome {
    pub reply: String,
    /// Id the exchange was saved under, or why saving failed.
    pub saved: Result<u64, StoreError>,
}

pub async fn handle_query(config: &Config, action: QueryAction) -> Result<()> {
    let store = ConversationStore::new(FileBackend::new(config.sessions_path()));

    match action {
        QueryAction::Clear => {
            store
                .delete_all()
                .context("Error clearing conversations")?;
            println!("🗑️  All conversations have been deleted.");
        }
        QueryAction::Delete(id) => {
            let deleted = store
                .delete_one(id)
                .with_context(|| format!("Error deleting conversation ID {id}"))?;
            if deleted {
                println!("✅ Conversation ID {id} has been deleted.");
            } else {
                println!("Conversation ID {id} not found; nothing to delete.");
            }
        }
        QueryAction::List => print!("{}", format_list(&store.list())),
        QueryAction::Ask {
            message,
            conversation_id,
        } => {
            let client = super::connect(config)?;
            let outcome = run_turn(&client, &store, conversation_id, &message)
                .await
                .context("Error from OpenWebUI")?;

            super::print_markdown(&outcome.reply);
            match outcome.saved {
                Ok(id) => println!("\n🆔 Conversation ID: {id}"),
                Err(e) => eprintln!("Warning: failed to save conversation: {e}"),
            }
        }
    }

    Ok(())
}

/// Send `message` (plus any earlier history) and record the exchange.
///
/// An unknown `conversation_id` starts a fresh conversation. A failed
/// request leaves the store untouched; a failed save is reported in the
/// outcome rather than as an error, since the reply is still usable.
pub async fn run_turn<T, B>(
    transport: &T,
    store: &ConversationStore<B>,
    conversation_id: Option<u64>,
    message: &str,
) -> Result<TurnOutcome, ClientError>
where
    T: ChatTransport + ?Sized,
    B: StorageBackend,
{
    let (mut history, existing_id) = match conversation_id {
        Some(id) => match store.find_by_id(id) {
            Some(history) => (history, Some(id)),
            None => {
                warn!("Conversation {} not found; starting a new one", id);
                (Vec::new(), None)
            }
        },
        None => (Vec::new(), None),
    };

    debug!(
        "query: using {} model, conversation ID: {:?}, {} earlier turn(s)",
        transport.model(),
        existing_id,
        history.len()
    );

    let user_turn = Turn::user(message);
    history.push(user_turn.clone());
    let reply = transport.send_chat(&history).await?;

    let saved = store.append(
        existing_id,
        vec![user_turn, Turn::assistant(reply.clone())],
        message,
    );
    Ok(TurnOutcome { reply, saved })
}

fn format_list(conversations: &[ConversationSummary]) -> String {
    if conversations.is_empty() {
        return "No previous conversations found.\n".to_string();
    }

    let mut out = String::from("📝 Previous Conversations:\n");
    for conversation in conversations {
        out.push_str(&format!("🆔 {}: {}\n", conversation.id, conversation.query));
    }
    out
}
