//! Logic system (§4.4): per-shard handler dispatch keyed by `requestType`.

pub mod allocator;
pub mod auth;
pub mod handlers;
pub mod request_type;

use std::rc::Rc;
use std::sync::{Arc, OnceLock};

use serde_json::Value;
use tokio::task::spawn_local;
use tracing::error;

use crate::db::DbPool;
use crate::net::frame;
use crate::shard::{executor::executors, Shard};
use crate::sock::SockHandle;

static LOGIC: OnceLock<Arc<Logic>> = OnceLock::new();

/// Install the process-wide logic system. Called once at startup.
pub fn install(logic: Arc<Logic>) {
    if LOGIC.set(logic).is_err() {
        error!("logic system installed twice");
    }
}

pub fn get() -> Arc<Logic> {
    LOGIC.get().expect("logic system not installed").clone()
}

/// Holds what every handler needs that isn't already reachable through the
/// shard or the session: the DB pool. Cheap to clone (wraps an `Arc`), kept
/// behind the [`get`] global so handlers don't need it threaded through
/// every call.
pub struct Logic {
    db: DbPool,
}

impl Logic {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    /// Normalise and dispatch one frame. Must be called from inside a
    /// `ShardJob` running on `shard`'s own thread (§4.4, §5).
    pub fn dispatch(&self, shard: &mut Shard, sock: Rc<SockHandle>, frame: Value) {
        let frame = frame::sanitize(frame);
        let Some(request_type) = frame.get("requestType").and_then(Value::as_i64) else {
            error!("frame missing integer requestType, dropped");
            return;
        };

        use request_type as rt;

        match request_type {
            rt::REGISTER => handlers::register(shard, &sock, frame),
            rt::REQUEST | rt::RESTART | rt::STOPREMOTE => {
                handlers::forward(shard, &sock, frame, request_type)
            }
            rt::CLOSE => handlers::close(shard, &sock),
            rt::GAME_START => handlers::game_start(&sock, &frame),
            rt::GAME_STOP => handlers::game_stop(&sock, &frame),
            rt::USER_REQUEST_BY_GAME_TYPE => {
                handlers::user_request_by_game_type(self, shard, sock, frame)
            }
            rt::SERVER_REGISTER => {
                let db = self.db.clone();
                let shard_index = shard.index;
                spawn_local(handlers::server_register(db, shard_index, sock, frame));
            }
            rt::SERVER_LOGIN => {
                let db = self.db.clone();
                let shard_index = shard.index;
                spawn_local(handlers::server_login(db, shard_index, sock, frame));
            }
            rt::PROCESS_LOGIN => {
                let db = self.db.clone();
                let shard_index = shard.index;
                spawn_local(handlers::process_login(db, shard_index, sock, frame));
            }
            rt::PROCESS_LOGOUT => {
                let db = self.db.clone();
                spawn_local(handlers::process_logout(db, sock, frame));
            }
            _ => {
                error!(request_type, "unknown requestType, frame dropped");
            }
        }
    }

    /// Synthesise and dispatch the implicit PROCESS_LOGOUT frame for a
    /// cloud-process session torn down without an explicit logout
    /// (§4.1 "Cloud-process logout hook").
    pub fn synthesize_logout(&self, shard_index: usize, account_id: String) {
        let request_type = request_type::PROCESS_LOGOUT;
        executors().shard(shard_index).post(move |_shard| {
            let db = get().db.clone();
            spawn_local(async move {
                let frame = serde_json::json!({
                    "requestType": request_type,
                    "accountId": account_id,
                });
                // `_sock` is never read by process_logout beyond moving it
                // through; there is no real session left to reply to.
                handlers::process_logout(db, Rc::new(phantom_sock()), frame).await;
            });
        });
    }
}

/// A session handle is required by the handler signature but unused by
/// `process_logout`'s body; this stands in for the already-torn-down
/// session when synthesising the logout frame.
fn phantom_sock() -> SockHandle {
    SockHandle::detached()
}
