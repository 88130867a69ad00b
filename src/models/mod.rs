//! Data models for Partify
//!
//! Plain data carried between the tables, the stores and the serializers.

mod history;
mod queue;
mod track;
mod user;
mod vote;

pub use history::{PlayHistoryEntry, TrackPlayCount, UserPlayCount};
pub use queue::{BackendSlot, PriorityStrategy, QueueEntry};
pub use track::{Track, TrackMetadata};
pub use user::{display_fields, User};
pub use vote::{Vote, VoteDirection, VoteTarget};
