//! DB pool (§4.6): a round-robin shared, non-transactional pool plus a FIFO
//! queue of transactional connections with a heartbeat-driven reconnector.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use sqlx::{Connection, Executor, MySqlConnection};
use tokio::sync::Mutex;
use tokio::time::interval;
use tracing::{error, warn};

use super::Error;

/// Shared, non-transactional connections plus the transactional queue.
///
/// Cloning is cheap: every clone refers to the same underlying slots (the
/// pool is a handle, not the storage).
#[derive(Clone)]
pub struct DbPool {
    inner: Arc<Inner>,
}

struct Inner {
    shared: Vec<Mutex<MySqlConnection>>,
    shared_next: AtomicUsize,
    tx_queue: Mutex<VecDeque<MySqlConnection>>,
    url: String,
}

impl DbPool {
    /// Connect `pool_size` shared connections and `tx_pool_size` (§4.6:
    /// "sized at size/2" by convention, configurable) transactional ones.
    pub async fn connect(url: &str, pool_size: usize, tx_pool_size: usize) -> Result<Self, Error> {
        let mut shared = Vec::with_capacity(pool_size);
        for _ in 0..pool_size {
            shared.push(Mutex::new(MySqlConnection::connect(url).await?));
        }

        let mut tx_queue = VecDeque::with_capacity(tx_pool_size);
        for _ in 0..tx_pool_size {
            tx_queue.push_back(MySqlConnection::connect(url).await?);
        }

        Ok(Self {
            inner: Arc::new(Inner {
                shared,
                shared_next: AtomicUsize::new(0),
                tx_queue: Mutex::new(tx_queue),
                url: url.to_owned(),
            }),
        })
    }

    /// Borrow the next shared connection in round-robin order. The caller
    /// does not release it explicitly — it stays checked into `shared`
    /// and is handed back out to later callers once this guard drops.
    pub async fn acquire_shared(&self) -> tokio::sync::MutexGuard<'_, MySqlConnection> {
        let index =
            self.inner.shared_next.fetch_add(1, Ordering::Relaxed) % self.inner.shared.len();
        self.inner.shared[index].lock().await
    }

    /// Dequeue one transactional connection, or `None` if the queue is
    /// empty — the caller (the logic system) re-enqueues the frame (§4.4,
    /// §7) rather than waiting.
    pub async fn take_tx(&self) -> Option<MySqlConnection> {
        self.inner.tx_queue.lock().await.pop_front()
    }

    /// Return a transactional connection to the queue.
    pub async fn put_tx(&self, conn: MySqlConnection) {
        self.inner.tx_queue.lock().await.push_back(conn);
    }

    /// Background task: every `interval`, heartbeat idle transactional
    /// connections and the shared pool, reconnecting any that fail
    /// `SELECT 1` (§4.6, §5). Runs until the process exits; not cancelled
    /// on shutdown since it only touches already-idle connections.
    pub async fn run_heartbeat(self, interval_period: Duration) {
        let mut ticker = interval(interval_period);
        loop {
            ticker.tick().await;
            self.heartbeat_shared().await;
            self.heartbeat_tx_queue().await;
        }
    }

    async fn heartbeat_shared(&self) {
        for (index, slot) in self.inner.shared.iter().enumerate() {
            let mut conn = slot.lock().await;
            if conn.execute("SELECT 1").await.is_err() {
                warn!(slot = index, "shared connection heartbeat failed, reconnecting");
                match MySqlConnection::connect(&self.inner.url).await {
                    Ok(new_conn) => *conn = new_conn,
                    Err(err) => error!(slot = index, %err, "reconnect failed"),
                }
            }
        }
    }

    async fn heartbeat_tx_queue(&self) {
        let mut queue = self.inner.tx_queue.lock().await;
        let n = queue.len();
        for _ in 0..n {
            let Some(mut conn) = queue.pop_front() else {
                break;
            };
            if conn.execute("SELECT 1").await.is_err() {
                warn!("idle transactional connection heartbeat failed, reconnecting");
                match MySqlConnection::connect(&self.inner.url).await {
                    Ok(new_conn) => queue.push_back(new_conn),
                    Err(err) => {
                        error!(%err, "reconnect failed, connection dropped from tx pool");
                    }
                }
            } else {
                queue.push_back(conn);
            }
        }
    }
}
