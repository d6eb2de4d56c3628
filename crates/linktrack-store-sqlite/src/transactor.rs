//! [`Transactor`]: scoped transactional execution on the SQLite worker.
//!
//! Query functions take a `&rusqlite::Connection`. A
//! [`rusqlite::Transaction`] derefs to one, so the same function runs inside
//! [`Transactor::with_transaction`] (against the open transaction) or
//! [`Transactor::run`] (against the plain connection in autocommit mode).
//!
//! Both closures execute on the connection's worker thread. Once submitted,
//! a closure runs to completion even if the awaiting task is cancelled, so a
//! failing transaction body is always rolled back.

use std::path::Path;

use rusqlite::Connection;

use crate::{Error, Result};

/// Cheap to clone; the inner connection handle is reference-counted.
#[derive(Clone)]
pub struct Transactor {
  conn: tokio_rusqlite::Connection,
}

impl Transactor {
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Ok(Self { conn })
  }

  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Ok(Self { conn })
  }

  /// Execute a batch of statements, e.g. schema DDL.
  pub async fn execute_batch(&self, sql: &'static str) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute_batch(sql)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run `f` against the connection outside any explicit transaction.
  pub async fn run<T, F>(&self, f: F) -> Result<T>
  where
    F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    T: Send + 'static,
  {
    self.conn.call(move |conn| Ok(f(conn))).await?
  }

  /// Run `f` inside a transaction.
  ///
  /// Commits when `f` succeeds. When `f` fails the transaction is rolled
  /// back and the failure returned; if the rollback fails too, both are
  /// joined in [`Error::Rollback`].
  pub async fn with_transaction<T, F>(&self, f: F) -> Result<T>
  where
    F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    T: Send + 'static,
  {
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let outcome = match f(&tx) {
          Ok(value) => tx.commit().map(|()| value).map_err(Error::from),
          Err(cause) => match tx.rollback() {
            Ok(()) => Err(cause),
            Err(rollback) => {
              tracing::error!(%cause, %rollback, "transaction rollback failed");
              Err(Error::Rollback { cause: Box::new(cause), rollback })
            }
          },
        };
        Ok(outcome)
      })
      .await?
  }
}
