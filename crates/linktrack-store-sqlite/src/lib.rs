//! SQLite backend for the link tracker's subscription store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Two interchangeable query sets are
//! provided: [`RawSql`] (hand-written statements) and [`Builder`]
//! (statements assembled with `sea-query`). Both sit behind [`Queries`] and
//! share the same [`Transactor`].

mod encode;
mod schema;
mod store;

pub mod error;
pub mod queries;
pub mod transactor;

pub use error::{Error, Result};
pub use queries::{Builder, Queries, RawSql};
pub use store::{SqlitePaginator, SqliteStore};
pub use transactor::Transactor;
