//! Cloud-process idle pool (§3 "Cloud-process pool", §4.5).
//!
//! Process-wide mapping from game-type string to the set of process
//! identifiers known to be idle. Lives outside any single shard; updated
//! only *after* the allocator's transaction commits (§4.5 "Concurrency
//! note").

use std::collections::HashMap;
use std::sync::OnceLock;

use parking_lot::RwLock;

static IDLE_POOL: OnceLock<RwLock<HashMap<String, Vec<String>>>> = OnceLock::new();

fn pool() -> &'static RwLock<HashMap<String, Vec<String>>> {
    IDLE_POOL.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Mark `process_id` idle for `game_type` (GAME_STOP, handler 12, and the
/// allocator's reuse/provision paths).
pub fn push(game_type: &str, process_id: String) {
    pool()
        .write()
        .entry(game_type.to_owned())
        .or_default()
        .push(process_id);
}

/// Pop one idle process id for `game_type`, if any are available
/// (USER_REQUEST_BY_GAME_TYPE, handler 13).
pub fn pop(game_type: &str) -> Option<String> {
    pool().write().get_mut(game_type).and_then(|ids| ids.pop())
}

/// Current idle-pool size per game type, for the metrics endpoint.
pub fn sizes() -> Vec<(String, usize)> {
    pool()
        .read()
        .iter()
        .map(|(game_type, ids)| (game_type.clone(), ids.len()))
        .collect()
}

/// Remove a specific process id from the idle set for `game_type`
/// (GAME_START, handler 11: the worker is now occupied).
pub fn remove(game_type: &str, process_id: &str) {
    if let Some(ids) = pool().write().get_mut(game_type) {
        ids.retain(|id| id != process_id);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_push_pop_round_trip() {
        let game_type = format!("test-game-{}", crate::util::instance_id());
        push(&game_type, "p1".into());
        push(&game_type, "p2".into());
        assert!(pop(&game_type).is_some());
        assert!(pop(&game_type).is_some());
        assert_eq!(pop(&game_type), None);
    }

    #[test]
    fn test_remove_specific_id() {
        let game_type = format!("test-remove-{}", crate::util::instance_id());
        push(&game_type, "a".into());
        push(&game_type, "b".into());
        remove(&game_type, "a");
        assert_eq!(pop(&game_type), Some("b".into()));
        assert_eq!(pop(&game_type), None);
    }
}
