//! Conversation store.
//!
//! All conversations live in a single JSON document:
//!
//! ```json
//! {"next_id": 3, "conversations": [{"id": 1, "history": [...], "query": "..."}]}
//! ```
//!
//! Every mutation loads the whole document, changes the snapshot and writes it
//! back. There is no locking; one mutating invocation at a time is assumed.

mod backend;
mod error;

#[cfg(test)]
pub use backend::MemoryBackend;
pub use backend::{FileBackend, StorageBackend};
pub use error::StoreError;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::protocol::Turn;

/// One persisted conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub id: u64,
    #[serde(default)]
    pub history: Vec<Turn>,
    /// Text of the message that started the conversation.
    #[serde(default)]
    pub query: String,
}

/// `(id, query)` pair shown by `query --list`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationSummary {
    pub id: u64,
    pub query: String,
}

/// Immutable-by-convention snapshot of the whole store document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversations {
    /// Next id to hand out. Older documents lack it; it is then derived.
    #[serde(default)]
    next_id: u64,
    #[serde(rename = "conversations", default)]
    list: Vec<ConversationRecord>,
}

impl Conversations {
    pub fn records(&self) -> &[ConversationRecord] {
        &self.list
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn find(&self, id: u64) -> Option<&ConversationRecord> {
        self.list.iter().find(|c| c.id == id)
    }

    /// Next id to hand out. `u64::MAX` means the id space is used up.
    pub fn next_id(&self) -> u64 {
        let max_id = self.list.iter().map(|c| c.id).max().unwrap_or(0);
        self.next_id.max(max_id.saturating_add(1))
    }

    /// Add a new conversation and return its id.
    fn insert(&mut self, history: Vec<Turn>, query: &str) -> Result<u64, StoreError> {
        let id = self.next_id();
        if id == u64::MAX {
            return Err(StoreError::IdsExhausted);
        }
        self.list.push(ConversationRecord {
            id,
            history,
            query: query.to_string(),
        });
        self.next_id = id + 1;
        Ok(id)
    }

    /// Append turns to an existing conversation.
    fn extend(&mut self, id: u64, turns: Vec<Turn>) {
        if let Some(record) = self.list.iter_mut().find(|c| c.id == id) {
            record.history.extend(turns);
        }
    }

    fn remove(&mut self, id: u64) -> bool {
        let before = self.list.len();
        // Pin the counter so the removed id is never handed out again.
        self.next_id = self.next_id();
        self.list.retain(|c| c.id != id);
        self.list.len() != before
    }

    /// Restore invariants on a freshly decoded document: ids are unique and
    /// lie in `1..u64::MAX`, and the counter is ahead of every id.
    fn normalize(mut self) -> Self {
        if self.next_id == u64::MAX {
            warn!("Ignoring exhausted id counter in conversation store");
            self.next_id = 0;
        }

        let mut seen = HashSet::new();
        let mut clashes = Vec::new();
        for (index, record) in self.list.iter_mut().enumerate() {
            if record.id == 0 || record.id == u64::MAX || !seen.insert(record.id) {
                clashes.push((index, record.id));
                record.id = 0;
            }
        }

        self.next_id = self.next_id();
        let mut unplaced = Vec::new();
        for (index, original) in clashes {
            let fresh = self.next_id;
            if fresh == u64::MAX {
                unplaced.push(index);
                continue;
            }
            warn!(
                "Conversation id {} is invalid or duplicated; renumbering to {}",
                original, fresh
            );
            self.list[index].id = fresh;
            self.next_id = fresh + 1;
        }

        // Only reachable when valid ids already reach u64::MAX - 1.
        for index in unplaced.into_iter().rev() {
            let record = self.list.remove(index);
            warn!(
                "No id left for conversation {:?}; dropping it",
                record.query
            );
        }
        self
    }
}

/// File-as-database store over a pluggable backend.
pub struct ConversationStore<B> {
    backend: B,
}

impl<B: StorageBackend> ConversationStore<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    #[cfg(test)]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Load the full snapshot.
    ///
    /// A missing, unreadable or malformed document yields an empty snapshot.
    /// The file is an advisory cache, so callers never see a load error.
    pub fn load_all(&self) -> Conversations {
        let bytes = match self.backend.read() {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return Conversations::default(),
            Err(e) => {
                warn!("Ignoring unreadable conversation store: {}", e);
                return Conversations::default();
            }
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Conversations::default();
        }

        match serde_json::from_slice::<Conversations>(&bytes) {
            Ok(conversations) => conversations.normalize(),
            Err(e) => {
                warn!(
                    "Ignoring malformed conversation store {}: {}",
                    self.backend.describe(),
                    e
                );
                Conversations::default()
            }
        }
    }

    /// Write the full snapshot back, replacing whatever was stored.
    pub fn persist(&self, conversations: &Conversations) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(conversations)
            .map_err(|e| StoreError::serialize(self.backend.describe(), e))?;
        self.backend.write(&json)?;
        debug!(
            "Saved {} conversation(s) to {}",
            conversations.len(),
            self.backend.describe()
        );
        Ok(())
    }

    /// History of a conversation, or `None` if the id is unknown.
    pub fn find_by_id(&self, id: u64) -> Option<Vec<Turn>> {
        self.load_all().find(id).map(|c| c.history.clone())
    }

    /// Record turns for a conversation and return the id they were stored
    /// under.
    ///
    /// With `existing_id` set to a known conversation, the turns are appended
    /// to its history. Otherwise a new conversation labelled `query` is
    /// created with a fresh id.
    pub fn append(
        &self,
        existing_id: Option<u64>,
        new_turns: Vec<Turn>,
        query: &str,
    ) -> Result<u64, StoreError> {
        let mut conversations = self.load_all();

        let id = match existing_id.filter(|id| *id != 0) {
            Some(id) if conversations.find(id).is_some() => {
                conversations.extend(id, new_turns);
                id
            }
            Some(id) => {
                let fresh = conversations.insert(new_turns, query)?;
                warn!(
                    "Conversation {} not found; started conversation {}",
                    id, fresh
                );
                fresh
            }
            None => conversations.insert(new_turns, query)?,
        };

        self.persist(&conversations)?;
        Ok(id)
    }

    /// Delete one conversation. Returns whether it existed; an unknown id
    /// leaves the store untouched.
    pub fn delete_one(&self, id: u64) -> Result<bool, StoreError> {
        let mut conversations = self.load_all();
        if !conversations.remove(id) {
            debug!("Conversation {} not present; nothing to delete", id);
            return Ok(false);
        }
        self.persist(&conversations)?;
        Ok(true)
    }

    /// Remove the backing document entirely.
    pub fn delete_all(&self) -> Result<(), StoreError> {
        self.backend.remove()
    }

    /// All conversations in insertion order.
    pub fn list(&self) -> Vec<ConversationSummary> {
        self.load_all()
            .records()
            .iter()
            .map(|c| ConversationSummary {
                id: c.id,
                query: c.query.clone(),
            })
            .collect()
    }
}
