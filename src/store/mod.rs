use crate::message::{Message, MessageId};
use log::{debug, warn};
use std::collections::HashMap;
use tokio::sync::{watch, RwLock};

pub type StoreResult<T> = Result<T, Error>;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum Error {
    #[error("Store is full ({limit} messages)")]
    CapacityExceeded { limit: usize },
}

/// How `find_messages` treats its cursor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CursorMode {
    /// Accept the cursor but return everything.
    #[default]
    Ignore,
    /// Return only messages inserted strictly after the cursor.
    After,
}

#[derive(Debug, Clone, Default)]
pub struct StoreOptions {
    pub cursor_mode: CursorMode,
    pub max_messages: Option<usize>,
}

#[derive(Debug, Default)]
struct Messages {
    by_id: HashMap<MessageId, Message>,
    order: Vec<MessageId>,
}

impl Messages {
    fn snapshot(&self, from: usize) -> Vec<Message> {
        self.order[from..]
            .iter()
            .filter_map(|id| self.by_id.get(id))
            .cloned()
            .collect()
    }

    fn position(&self, id: &MessageId) -> Option<usize> {
        self.order.iter().rposition(|candidate| candidate == id)
    }
}

/// In-memory message log shared by writers and pollers.
///
/// Writers hold the lock exclusively for a single insert; readers share it.
/// Every insert bumps a `watch` counter so waiting pollers can re-check
/// without sleeping out their interval.
#[derive(Debug)]
pub struct MessageStore {
    options: StoreOptions,
    messages: RwLock<Messages>,
    inserted: watch::Sender<u64>,
}

impl Default for MessageStore {
    fn default() -> Self {
        Self::new(StoreOptions::default())
    }
}

impl MessageStore {
    pub fn new(options: StoreOptions) -> Self {
        let (inserted, _) = watch::channel(0);
        MessageStore {
            options,
            messages: Default::default(),
            inserted,
        }
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    pub async fn create_message(&self, body: impl Into<String>) -> StoreResult<Message> {
        let message = Message::new(body);

        {
            let mut guard = self.messages.write().await;
            if let Some(limit) = self.options.max_messages {
                if guard.order.len() >= limit {
                    warn!("Rejecting message, store holds {limit} messages");
                    return Err(Error::CapacityExceeded { limit });
                }
            }
            guard.order.push(*message.id());
            guard.by_id.insert(*message.id(), message.clone());
        }

        debug!("Stored message {}", message.id());
        self.inserted.send_modify(|count| *count += 1);

        Ok(message)
    }

    pub async fn find_messages(&self, cursor: Option<&MessageId>) -> StoreResult<Vec<Message>> {
        let guard = self.messages.read().await;

        let from = match (self.options.cursor_mode, cursor) {
            (CursorMode::After, Some(cursor)) if !cursor.is_nil() => guard
                .position(cursor)
                .map(|position| position + 1)
                .unwrap_or(0),
            _ => 0,
        };

        Ok(guard.snapshot(from))
    }

    pub async fn get(&self, id: &MessageId) -> Option<Message> {
        self.messages.read().await.by_id.get(id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.messages.read().await.order.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Receiver whose value is the number of messages inserted so far.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inserted.subscribe()
    }
}
