//! Shard (`Mgr`): one per executor thread (§4.2).
//!
//! Everything in a [`Shard`] — `local_map`, `owner_index`, `route_cache` —
//! is touched only from the owning executor thread. Cross-shard access goes
//! exclusively through [`crate::shard::executor::ExecutorPool::post`].

pub mod executor;

use std::collections::HashMap;
use std::hash::{Hash, Hasher as _};
use std::rc::Rc;

use lru::LruCache;
use std::num::NonZeroUsize;
use tracing::warn;

use crate::sock::SockHandle;

pub use executor::{ExecutorPool, ShardHandle, ShardJob};

/// Sentinel stored in `route_cache` for "unknown", per §3.
pub const ROUTE_UNKNOWN: i64 = -1;

pub struct Shard {
    pub index: usize,
    pub n_shards: usize,
    local_map: HashMap<String, Rc<SockHandle>>,
    owner_index: HashMap<String, usize>,
    route_cache: LruCache<String, i64>,
}

impl Shard {
    pub fn new(index: usize, n_shards: usize, route_cache_capacity: usize) -> Self {
        Self {
            index,
            n_shards,
            local_map: HashMap::new(),
            owner_index: HashMap::new(),
            route_cache: LruCache::new(
                NonZeroUsize::new(route_cache_capacity.max(1)).unwrap(),
            ),
        }
    }

    /// `hash(id) mod N`, the deterministic owning shard for `id` (§3).
    pub fn owner_shard_of(id: &str, n_shards: usize) -> usize {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        id.hash(&mut hasher);
        (hasher.finish() as usize) % n_shards
    }

    /// Insert into `local_map` and asynchronously register ownership on
    /// `hash(id) mod N`'s shard (§4.2).
    pub fn attach(&mut self, id: String, sock: Rc<SockHandle>, executors: &ExecutorPool) {
        let owner = Self::owner_shard_of(&id, self.n_shards);
        self.local_map.insert(id.clone(), sock);

        let mine = self.index;
        executors.shard(owner).post(move |shard| {
            shard.owner_index.insert(id, mine);
        });
    }

    /// Remove from `local_map` and asynchronously clear ownership.
    /// Idempotent; logs a warning if `id` wasn't present (§4.2).
    pub fn detach(&mut self, id: &str, executors: &ExecutorPool) {
        if self.local_map.remove(id).is_none() {
            warn!(id, "detach of unknown session");
        }

        let owner = Self::owner_shard_of(id, self.n_shards);
        let id = id.to_owned();
        executors.shard(owner).post(move |shard| {
            shard.owner_index.remove(&id);
        });
    }

    pub fn local(&self, id: &str) -> Option<Rc<SockHandle>> {
        self.local_map.get(id).cloned()
    }

    pub fn owner_of(&self, id: &str) -> Option<usize> {
        self.owner_index.get(id).copied()
    }

    /// Cached last-known owning shard for `id`, or the `-1` sentinel.
    pub fn cached_route(&mut self, id: &str) -> i64 {
        self.route_cache.get(id).copied().unwrap_or(ROUTE_UNKNOWN)
    }

    pub fn cache_route(&mut self, id: &str, shard: usize) {
        self.route_cache.put(id.to_owned(), shard as i64);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_owner_shard_of_is_deterministic() {
        let a = Shard::owner_shard_of("abc", 8);
        let b = Shard::owner_shard_of("abc", 8);
        assert_eq!(a, b);
        assert!(a < 8);
    }

    #[test]
    fn test_route_cache_sentinel_for_unknown() {
        let mut shard = Shard::new(0, 4, 8);
        assert_eq!(shard.cached_route("nobody"), ROUTE_UNKNOWN);
        shard.cache_route("nobody", 2);
        assert_eq!(shard.cached_route("nobody"), 2);
    }

    #[test]
    fn test_route_cache_is_bounded() {
        let mut shard = Shard::new(0, 4, 2);
        shard.cache_route("a", 0);
        shard.cache_route("b", 1);
        shard.cache_route("c", 2);
        // "a" was least-recently-used and should have been evicted.
        assert_eq!(shard.cached_route("a"), ROUTE_UNKNOWN);
        assert_eq!(shard.cached_route("c"), 2);
    }

    /// §8 Invariant 2 / §9 Open Question: a second `attach` for an id
    /// already live displaces the first rather than being rejected — the
    /// chosen, documented duplicate-register policy (see DESIGN.md).
    ///
    /// The only test in the crate allowed to call `executor::install`
    /// (it's a process-wide `OnceCell`); everything else exercises
    /// `Shard` directly without a running pool.
    #[test]
    fn test_second_attach_displaces_first() {
        use crate::sock::SockHandle;
        use std::sync::mpsc as std_mpsc;

        let pool = std::sync::Arc::new(ExecutorPool::start(2, 10));
        executor::install(pool.clone());

        let first = Rc::new(SockHandle::detached());
        let second = Rc::new(SockHandle::detached());
        first.set_account_id("alice");
        second.set_account_id("alice");

        let first_for_post = first.clone();
        pool.shard(0).post(move |shard| {
            shard.attach("alice".into(), first_for_post, &executor::executors());
        });

        let second_for_post = second.clone();
        pool.shard(0).post(move |shard| {
            shard.attach("alice".into(), second_for_post, &executor::executors());
        });

        let (tx, rx) = std_mpsc::channel();
        pool.shard(0).post(move |shard| {
            let local = shard.local("alice");
            let _ = tx.send(local.map(|s| Rc::ptr_eq(&s, &second)));
        });

        let displaced_to_second = rx
            .recv_timeout(std::time::Duration::from_secs(1))
            .expect("shard job did not complete")
            .expect("\"alice\" missing from local_map after two attaches");
        assert!(displaced_to_second, "second attach should win over the first");
    }
}
