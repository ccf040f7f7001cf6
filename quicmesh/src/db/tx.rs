//! Transaction guard (§2, §4.4): `BEGIN` on acquire, explicit `COMMIT` or
//! automatic `ROLLBACK` on drop. Grounded on the teacher's connection
//! `Guard` (`backend/pool/guard.rs`), which checks a connection back into
//! its pool on drop and rolls back unfinished work first.

use sqlx::{Executor, MySqlConnection};
use tokio::task::spawn_local;
use tracing::{error, warn};

use super::pool::DbPool;

/// A leased transactional connection. `BEGIN` has already run by the time
/// callers get one; call [`TxGuard::commit`] to commit, or simply drop the
/// guard to roll back and return the connection to the pool.
pub struct TxGuard {
    conn: Option<MySqlConnection>,
    pool: DbPool,
    committed: bool,
}

impl TxGuard {
    /// Take a connection from `pool`'s transactional queue and run `BEGIN`.
    ///
    /// Returns `Ok(None)` if the queue is empty — the caller re-enqueues
    /// the frame on the same shard's logic system (§4.4, §7) instead of
    /// waiting. Returns `Err` if a connection was taken but `BEGIN`
    /// failed; the connection is still returned to the pool (§4.6: "the
    /// connection does not self-remove from the pool") so a later
    /// heartbeat tick can reconnect it, and the caller should surface a
    /// 500 to the sender rather than retry (§7: "DB error inside a
    /// transaction").
    pub async fn acquire(pool: &DbPool) -> Result<Option<Self>, sqlx::Error> {
        let Some(mut conn) = pool.take_tx().await else {
            return Ok(None);
        };

        if let Err(err) = conn.execute("BEGIN").await {
            error!(%err, "BEGIN failed, returning connection to tx pool");
            pool.put_tx(conn).await;
            return Err(err);
        }

        Ok(Some(Self {
            conn: Some(conn),
            pool: pool.clone(),
            committed: false,
        }))
    }

    pub fn connection(&mut self) -> &mut MySqlConnection {
        self.conn.as_mut().expect("TxGuard used after commit")
    }

    /// Commit the transaction. The connection is returned to the pool by
    /// `Drop` either way.
    pub async fn commit(mut self) -> Result<(), sqlx::Error> {
        let conn = self.conn.as_mut().expect("TxGuard used after commit");
        conn.execute("COMMIT").await?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for TxGuard {
    fn drop(&mut self) {
        let Some(mut conn) = self.conn.take() else {
            return;
        };
        let pool = self.pool.clone();
        let committed = self.committed;

        // Rollback (if needed) and checkin must happen on the owning
        // shard's LocalSet; spawn_local keeps the connection off other
        // threads.
        let result = spawn_local(async move {
            if !committed {
                if let Err(err) = conn.execute("ROLLBACK").await {
                    warn!(%err, "rollback on drop failed");
                }
            }
            pool.put_tx(conn).await;
        });
        drop(result);
    }
}
