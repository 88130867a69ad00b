//! Vote models

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// What a vote is cast on: a pending queue entry or a played history entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "lowercase")]
pub enum VoteTarget {
    Queue(i64),
    History(i64),
}

impl VoteTarget {
    /// Split into the (queue_entry_id, history_entry_id) column pair
    pub fn columns(&self) -> (Option<i64>, Option<i64>) {
        match *self {
            VoteTarget::Queue(id) => (Some(id), None),
            VoteTarget::History(id) => (None, Some(id)),
        }
    }

    /// Rebuild from the column pair. Exactly one side must be set.
    pub fn from_columns(queue_entry_id: Option<i64>, history_entry_id: Option<i64>) -> Option<Self> {
        match (queue_entry_id, history_entry_id) {
            (Some(id), None) => Some(VoteTarget::Queue(id)),
            (None, Some(id)) => Some(VoteTarget::History(id)),
            _ => None,
        }
    }
}

impl std::fmt::Display for VoteTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VoteTarget::Queue(id) => write!(f, "queue entry {}", id),
            VoteTarget::History(id) => write!(f, "history entry {}", id),
        }
    }
}

/// Direction of a vote. Neutral is what a retracted vote looks like.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum VoteDirection {
    Down,
    #[default]
    Neutral,
    Up,
}

impl VoteDirection {
    pub fn value(&self) -> i64 {
        match self {
            VoteDirection::Down => -1,
            VoteDirection::Neutral => 0,
            VoteDirection::Up => 1,
        }
    }
}

impl TryFrom<i64> for VoteDirection {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(VoteDirection::Down),
            0 => Ok(VoteDirection::Neutral),
            1 => Ok(VoteDirection::Up),
            other => Err(Error::InvalidDirection(other)),
        }
    }
}

impl From<VoteDirection> for i64 {
    fn from(direction: VoteDirection) -> Self {
        direction.value()
    }
}

/// One user's vote on one target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub id: i64,
    pub user_id: i64,
    pub target: VoteTarget,
    pub direction: VoteDirection,
}
