//! Cross-shard forwarding (§4.3).
//!
//! `route` is always called from inside a shard job (i.e. with `&mut Shard`
//! for the frame's *originating* shard available). It reads that shard's
//! `route_cache` and `local_map` directly, then hops through peer shards
//! via [`crate::shard::executor::executors`]`().post` for everything else.
//! At most three hops; every path ends in exactly one write or one 404.

use std::rc::Rc;

use serde_json::{json, Value};
use tracing::error;

use crate::shard::{executor::executors, Shard};
use crate::sock::SockHandle;

/// Shape the sender's frame into the forward message delivered to the
/// target (§4.3 "Forward frame shape").
fn forward_frame(mut frame: Value, request_type: i64) -> Value {
    if let Value::Object(map) = &mut frame {
        map.insert("requestType".into(), json!(request_type));
        map.insert("state".into(), json!(200));
        map.insert("message".into(), json!("forward"));
    }
    frame
}

/// §4.3 "404 frame shape".
fn not_found_frame(request_type: i64) -> Value {
    json!({
        "requestType": request_type,
        "state": 404,
        "message": "targetId is not register",
    })
}

/// Entry point: route `frame` (originally addressed to `target_id`) from
/// `from_sock`, which lives on `shard` (the currently-executing shard).
pub fn route(
    shard: &mut Shard,
    from_sock: Rc<SockHandle>,
    frame: Value,
    target_id: String,
    request_type: i64,
) {
    // 1. Local fast path.
    if let Some(target) = shard.local(&target_id) {
        target.write(forward_frame(frame, request_type));
        return;
    }

    // 2. Cache lookup.
    let cached = shard.cached_route(&target_id);
    if cached >= 0 {
        let cached = cached as usize;
        let from_shard = shard.index;
        let target_id_for_cache_miss = target_id.clone();
        let frame_for_cache_miss = frame.clone();

        executors().shard(cached).post(move |candidate| {
            if let Some(target) = candidate.local(&target_id) {
                target.write(forward_frame(frame, request_type));
                executors().shard(from_shard).post(move |origin| {
                    origin.cache_route(&target_id, cached);
                });
            } else {
                // Stale cache entry: fall through to the owner-lookup path.
                two_hop_resolve(
                    from_shard,
                    from_sock,
                    frame_for_cache_miss,
                    target_id_for_cache_miss,
                    request_type,
                );
            }
        });
        return;
    }

    // 3. Two-hop resolve via the owning shard's `owner_index`.
    two_hop_resolve(shard.index, from_sock, frame, target_id, request_type);
}

fn two_hop_resolve(
    from_shard: usize,
    from_sock: Rc<SockHandle>,
    frame: Value,
    target_id: String,
    request_type: i64,
) {
    let owner = Shard::owner_shard_of(&target_id, executors().len());

    executors().shard(owner).post(move |owner_shard| {
        let Some(target_shard_index) = owner_shard.owner_of(&target_id) else {
            from_sock.write(not_found_frame(request_type));
            return;
        };

        let target_id = target_id.clone();
        executors().shard(target_shard_index).post(move |target_shard| {
            if let Some(target) = target_shard.local(&target_id) {
                target.write(forward_frame(frame, request_type));
                executors().shard(from_shard).post(move |origin| {
                    origin.cache_route(&target_id, target_shard_index);
                });
            } else {
                error!(target_id, "owner_index pointed at a shard with no local session");
                from_sock.write(not_found_frame(request_type));
            }
        });
    });
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_forward_frame_shape() {
        let frame = json!({"requestType": 1, "accountId": "a", "targetId": "b"});
        let forwarded = forward_frame(frame, 1);
        assert_eq!(forwarded["state"], 200);
        assert_eq!(forwarded["message"], "forward");
        assert_eq!(forwarded["accountId"], "a");
    }

    #[test]
    fn test_not_found_frame_shape() {
        let frame = not_found_frame(1);
        assert_eq!(frame["state"], 404);
        assert_eq!(frame["message"], "targetId is not register");
    }
}
