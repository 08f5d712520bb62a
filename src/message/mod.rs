use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    id: MessageId,
    created_at: DateTime<Utc>,
    body: String,
}

impl Message {
    /// Builds a message with a fresh id stamped with the current UTC time.
    pub fn new<B: Into<String>>(body: B) -> Self {
        Message {
            id: MessageId::new(),
            created_at: Utc::now(),
            body: body.into(),
        }
    }

    pub fn id(&self) -> &MessageId {
        &self.id
    }

    pub fn created_at(&self) -> &DateTime<Utc> {
        &self.created_at
    }

    pub fn body(&self) -> &str {
        &self.body
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Invalid message id {value:?}: {source}")]
pub struct ParseIdError {
    value: String,
    source: uuid::Error,
}

#[derive(
    Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct MessageId(Uuid);

impl MessageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The all-zero id. As a cursor it means "from the beginning".
    pub fn nil() -> Self {
        Self(Uuid::nil())
    }

    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::nil()
    }
}

impl From<Uuid> for MessageId {
    fn from(value: Uuid) -> Self {
        MessageId(value)
    }
}

impl Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for MessageId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(MessageId).map_err(|source| ParseIdError {
            value: s.to_owned(),
            source,
        })
    }
}

impl TryFrom<&str> for MessageId {
    type Error = ParseIdError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        value.parse()
    }
}
