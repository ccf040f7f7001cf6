//! Executor pool (§4.7): `N` single-threaded cooperative runners, one per
//! shard. Each runner owns a `current_thread` Tokio runtime plus a
//! `LocalSet`, so non-`Send` per-session state (`Rc<SockHandle>`, the
//! shard's routing tables) never has to cross a thread boundary.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use once_cell::sync::OnceCell;
use tokio::sync::mpsc;
use tracing::{debug, error};

use super::Shard;

static EXECUTORS: OnceCell<Arc<ExecutorPool>> = OnceCell::new();

/// Install the process-wide executor pool. Called once at startup.
pub fn install(pool: Arc<ExecutorPool>) {
    if EXECUTORS.set(pool).is_err() {
        error!("executor pool installed twice");
    }
}

/// The process-wide executor pool, for code (handlers, the router) that
/// doesn't have one threaded through a call chain.
pub fn executors() -> Arc<ExecutorPool> {
    EXECUTORS
        .get()
        .expect("executor pool not installed")
        .clone()
}

/// A unit of work scheduled onto a specific shard's runner. The closure is
/// `Send` (it carries only plain data — ids, frames), but it runs against
/// `&mut Shard`, which never leaves its owning thread.
pub type ShardJob = Box<dyn FnOnce(&mut Shard) + Send + 'static>;

/// A handle other threads use to schedule work on one shard.
pub struct ShardHandle {
    pub index: usize,
    sender: mpsc::UnboundedSender<ShardJob>,
    /// Debug-only pressure counter: outstanding jobs not yet observed as
    /// drained. Not authoritative, only used for the metrics endpoint.
    pressure: AtomicUsize,
}

impl ShardHandle {
    /// Schedule `job` to run on this shard's runner. Errors (and
    /// exceptions the job itself raises) are logged, never propagated —
    /// the scheduler boundary does not rethrow (§7).
    pub fn post(&self, job: impl FnOnce(&mut Shard) + Send + 'static) {
        self.pressure.fetch_add(1, Ordering::Relaxed);
        if self.sender.send(Box::new(job)).is_err() {
            error!(shard = self.index, "post to a shut-down shard dropped");
        }
    }

    pub fn pressure(&self) -> usize {
        self.pressure.load(Ordering::Relaxed)
    }
}

pub struct ExecutorPool {
    shards: Vec<ShardHandle>,
    threads: Vec<JoinHandle<()>>,
    next: AtomicUsize,
}

impl ExecutorPool {
    /// Start `n` shard threads, each running its own `Shard` behind a
    /// `LocalSet`. `route_cache_capacity` is forwarded to every shard.
    pub fn start(n: usize, route_cache_capacity: usize) -> Self {
        let mut shards = Vec::with_capacity(n);
        let mut threads = Vec::with_capacity(n);
        let mut senders = Vec::with_capacity(n);

        for index in 0..n {
            let (tx, rx) = mpsc::unbounded_channel::<ShardJob>();
            senders.push(tx.clone());
            shards.push(ShardHandle {
                index,
                sender: tx,
                pressure: AtomicUsize::new(0),
            });

            let handle = std::thread::Builder::new()
                .name(format!("quicmesh-shard-{index}"))
                .spawn(move || run_shard(index, n, route_cache_capacity, rx))
                .expect("failed to spawn shard thread");
            threads.push(handle);
        }

        Self {
            shards,
            threads,
            next: AtomicUsize::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.shards.len()
    }

    pub fn shard(&self, index: usize) -> &ShardHandle {
        &self.shards[index]
    }

    /// Round-robin load-balancer used to assign newly-accepted sessions to
    /// a shard (§2, §4.7).
    pub fn next(&self) -> &ShardHandle {
        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.shards.len();
        &self.shards[index]
    }

    /// Drain queued work and join every shard thread.
    pub fn shutdown(self) {
        drop(self.shards);
        for thread in self.threads {
            if thread.join().is_err() {
                error!("shard thread panicked during shutdown");
            }
        }
    }
}

fn run_shard(
    index: usize,
    n_shards: usize,
    route_cache_capacity: usize,
    mut rx: mpsc::UnboundedReceiver<ShardJob>,
) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("failed to build shard runtime");
    let local = tokio::task::LocalSet::new();

    local.block_on(&runtime, async move {
        let mut shard = Shard::new(index, n_shards, route_cache_capacity);
        debug!(shard = index, "shard runner started");

        while let Some(job) = rx.recv().await {
            job(&mut shard);
        }

        debug!(shard = index, "shard runner stopped");
    });
}
