//! Stores for Partify
//!
//! One type per component. Each holds a clone of the connection pool; the
//! operations that take part in a larger unit of work also accept a
//! caller-owned connection.

mod catalog;
mod history_ledger;
mod identity_store;
mod queue_store;
mod vote_aggregator;

pub use catalog::TrackCatalog;
pub use history_ledger::HistoryLedger;
pub use identity_store::IdentityStore;
pub use queue_store::QueueStore;
pub use vote_aggregator::VoteAggregator;
