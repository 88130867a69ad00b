//! Database table operations

mod history_table;
mod queue_table;
mod track_table;
mod user_table;
mod vote_table;

pub use history_table::{HistoryFilter, HistoryTable};
pub use queue_table::{QueueSlotRow, QueueTable};
pub use track_table::TrackTable;
pub use user_table::UserTable;
pub use vote_table::VoteTable;

// Every table read drains its result set with `fetch_all`. A statement that
// stops short of its last row keeps SQLite's implicit transaction open on the
// pooled connection: later reads there see an old snapshot and a `RETURNING`
// write is not committed.

/// The only row of a drained result set
pub(crate) fn single_row<T>(rows: Vec<T>) -> Result<T, sqlx::Error> {
    rows.into_iter().next().ok_or(sqlx::Error::RowNotFound)
}

/// The first row of a drained result set, if any
pub(crate) fn first_row<T>(rows: Vec<T>) -> Option<T> {
    rows.into_iter().next()
}
