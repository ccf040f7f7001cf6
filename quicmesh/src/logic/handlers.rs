//! Handler bodies for each defined `requestType` (§4.4 table).

use serde_json::{json, Value};
use tracing::{error, warn};

use crate::alloc;
use crate::config::config;
use crate::db::{DbPool, TxGuard};
use crate::router;
use crate::shard::{executor::executors, Shard};
use crate::sock::{SockHandle, SockKind};
use std::rc::Rc;

use super::allocator::{self, Outcome, ProcessLoginRequest};
use super::auth;
use super::request_type as rt;

fn reply(sock: &SockHandle, request_type: i64, state: i64, message: &str) {
    sock.write(json!({
        "requestType": request_type,
        "state": state,
        "message": message,
    }));
}

fn string_field<'a>(frame: &'a Value, key: &str) -> Option<&'a str> {
    frame.get(key).and_then(Value::as_str)
}

/// `requestType = 0`: verify the REGISTER token and attach to the shard.
pub fn register(shard: &mut Shard, sock: &Rc<SockHandle>, frame: Value) {
    let Some(token) = string_field(&frame, "authorization") else {
        reply(sock, rt::REGISTER, 500, "missing authorization");
        return;
    };

    let secret = config().general.hmac_secret.clone();
    match auth::verify(token, &secret) {
        Ok(account_id) => {
            sock.set_account_id(account_id.clone());
            sock.set_registered();
            sock.set_kind(SockKind::Generic);
            shard.attach(account_id, sock.clone(), &executors());
            reply(sock, rt::REGISTER, 200, "registered");
        }
        Err(err) => {
            warn!(%err, "REGISTER token verification failed");
            reply(sock, rt::REGISTER, 500, "invalid token");
        }
    }
}

/// `requestType ∈ {1, 2, 3}`: route to `targetId` (§4.3).
pub fn forward(shard: &mut Shard, sock: &Rc<SockHandle>, frame: Value, request_type: i64) {
    let Some(target_id) = string_field(&frame, "targetId").map(str::to_owned) else {
        reply(sock, request_type, 500, "missing targetId");
        return;
    };

    router::route(shard, sock.clone(), frame, target_id, request_type);
}

/// `requestType = 4`: detach and let the transport shutdown path free the
/// session.
pub fn close(shard: &mut Shard, sock: &Rc<SockHandle>) {
    let account_id = sock.account_id();
    if !account_id.is_empty() {
        shard.detach(&account_id, &executors());
    }
}

/// `requestType = 11`: the worker is now occupied.
pub fn game_start(sock: &Rc<SockHandle>, frame: &Value) {
    if let (Some(account_id), Some(game_type)) = (
        string_field(frame, "accountId"),
        sock.game_type().or_else(|| string_field(frame, "gameType").map(str::to_owned)),
    ) {
        alloc::remove(&game_type, account_id);
    }
    reply(sock, rt::GAME_START, 200, "ok");
}

/// `requestType = 12`: mark the worker idle again.
pub fn game_stop(sock: &Rc<SockHandle>, frame: &Value) {
    if let (Some(account_id), Some(game_type)) =
        (string_field(frame, "accountId"), string_field(frame, "gameType"))
    {
        alloc::push(game_type, account_id.to_owned());
    }
    reply(sock, rt::GAME_STOP, 200, "ok");
}

/// `requestType = 13`: pop an idle process and re-dispatch as a REQUEST.
pub fn user_request_by_game_type(
    logic: &super::Logic,
    shard: &mut Shard,
    sock: Rc<SockHandle>,
    frame: Value,
) {
    let Some(game_type) = string_field(&frame, "gameType").map(str::to_owned) else {
        reply(&sock, rt::USER_REQUEST_BY_GAME_TYPE, 500, "missing gameType");
        return;
    };

    match alloc::pop(&game_type) {
        Some(process_id) => {
            let mut rewritten = frame;
            if let Value::Object(map) = &mut rewritten {
                map.insert("requestType".into(), json!(rt::REQUEST));
                map.insert("targetId".into(), json!(process_id));
            }
            logic.dispatch(shard, sock, rewritten);
        }
        None => reply(&sock, rt::USER_REQUEST_BY_GAME_TYPE, 500, "no idle process available"),
    }
}

/// `requestType = 5`: register a new cloud-server host.
pub async fn server_register(db: DbPool, shard_index: usize, sock: Rc<SockHandle>, frame: Value) {
    let (
        Some(name),
        Some(max_processes),
        Some(_hostname),
        Some(_location),
        Some(region),
    ) = (
        string_field(&frame, "name"),
        frame.get("maxProcess").and_then(Value::as_i64),
        string_field(&frame, "hostname"),
        string_field(&frame, "location"),
        string_field(&frame, "region"),
    )
    else {
        reply(&sock, rt::SERVER_REGISTER, 500, "missing required field");
        return;
    };

    let ip_address = sock.remote_addr.ip().to_string();
    let tags = string_field(&frame, "tags");
    let specifications = string_field(&frame, "specifications");
    let server_id = uuid::Uuid::new_v4().to_string();

    let result = async {
        let mut conn = db.acquire_shared().await;
        let existing: Option<(i64,)> = sqlx::query_as(
            "SELECT 1 FROM game_servers WHERE ip_address = ? AND del_flag = 0",
        )
        .bind(&ip_address)
        .fetch_optional(&mut *conn)
        .await?;

        if existing.is_some() {
            return Ok::<_, sqlx::Error>(None);
        }

        sqlx::query(
            "INSERT INTO game_servers \
             (server_id, ip_address, name, status, max_processes, current_processes, \
              region, tags, specifications, created_at, updated_at, del_flag) \
             VALUES (?, ?, ?, 'offline', ?, 0, ?, ?, ?, NOW(), NOW(), 0)",
        )
        .bind(&server_id)
        .bind(&ip_address)
        .bind(name)
        .bind(max_processes)
        .bind(region)
        .bind(tags)
        .bind(specifications)
        .execute(&mut *conn)
        .await?;

        Ok(Some(server_id.clone()))
    }
    .await;

    match result {
        Ok(Some(server_id)) => {
            sock.set_account_id(server_id.clone());
            sock.set_registered();
            sock.set_kind(SockKind::CloudServer);
            executors().shard(shard_index).post(move |shard| {
                shard.attach(server_id.clone(), sock.clone(), &executors());
                sock.write(json!({
                    "requestType": rt::SERVER_REGISTER,
                    "state": 200,
                    "message": "registered",
                    "serverId": server_id,
                }));
            });
        }
        Ok(None) => reply(&sock, rt::SERVER_REGISTER, 500, "ip_address already registered"),
        Err(err) => {
            error!(%err, "SERVER_REGISTER failed");
            reply(&sock, rt::SERVER_REGISTER, 500, "database error");
        }
    }
}

/// `requestType = 6`: bring a registered server online.
pub async fn server_login(db: DbPool, shard_index: usize, sock: Rc<SockHandle>, frame: Value) {
    let ip_address = sock.remote_addr.ip().to_string();

    let result = async {
        let mut conn = db.acquire_shared().await;
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT server_id FROM game_servers \
             WHERE ip_address = ? AND status != 'online' AND del_flag = 0",
        )
        .bind(&ip_address)
        .fetch_optional(&mut *conn)
        .await?;

        let Some((server_id,)) = row else {
            return Ok::<_, sqlx::Error>(None);
        };

        sqlx::query("UPDATE game_servers SET status = 'online', last_heartbeat = NOW() WHERE server_id = ?")
            .bind(&server_id)
            .execute(&mut *conn)
            .await?;

        Ok(Some(server_id))
    }
    .await;

    match result {
        Ok(Some(server_id)) => {
            sock.set_account_id(server_id.clone());
            sock.set_registered();
            sock.set_kind(SockKind::CloudServer);
            executors().shard(shard_index).post(move |shard| {
                shard.attach(server_id, sock.clone(), &executors());
                reply(&sock, rt::SERVER_LOGIN, 200, "online");
            });
        }
        Ok(None) => reply(&sock, rt::SERVER_LOGIN, 404, "server not found or already online"),
        Err(err) => {
            error!(%err, "SERVER_LOGIN failed");
            reply(&sock, rt::SERVER_LOGIN, 500, "database error");
        }
    }
}

/// `requestType = 7`: the idle-process allocator (§4.5).
pub async fn process_login(
    db: DbPool,
    shard_index: usize,
    sock: Rc<SockHandle>,
    frame: Value,
) {
    let (Some(server_id), Some(process_name), Some(game_type)) = (
        string_field(&frame, "serverId").map(str::to_owned),
        string_field(&frame, "processName").map(str::to_owned),
        string_field(&frame, "gameType").map(str::to_owned),
    ) else {
        reply(&sock, rt::PROCESS_LOGIN, 500, "missing required field");
        return;
    };
    let game_version = string_field(&frame, "gameVersion").map(str::to_owned);
    let remote_ip = sock.remote_addr.ip().to_string();

    let mut guard = match TxGuard::acquire(&db).await {
        Ok(Some(guard)) => guard,
        Ok(None) => {
            // Cooperative retry: re-enqueue on the same shard's logic
            // system, no backoff (§4.4, §7).
            executors().shard(shard_index).post(move |shard| {
                super::get().dispatch(shard, sock, frame);
            });
            return;
        }
        Err(err) => {
            error!(%err, "PROCESS_LOGIN failed to BEGIN transaction");
            reply(&sock, rt::PROCESS_LOGIN, 500, "database error");
            return;
        }
    };

    let request = ProcessLoginRequest {
        server_id,
        process_name,
        game_type: game_type.clone(),
        game_version,
        remote_ip,
    };

    let outcome = allocator::process_login(&mut guard, request).await;

    match outcome {
        Ok(Outcome::Ok(reply_body)) => {
            if let Err(err) = guard.commit().await {
                error!(%err, "PROCESS_LOGIN commit failed");
                reply(&sock, rt::PROCESS_LOGIN, 500, "database error");
                return;
            }
            allocator::mark_idle_after_commit(&game_type, reply_body.process_id.clone());

            sock.set_account_id(reply_body.process_id.clone());
            sock.set_registered();
            sock.set_kind(SockKind::CloudProcess);
            sock.set_game_type(game_type.clone());
            let process_id = reply_body.process_id.clone();
            executors().shard(shard_index).post(move |shard| {
                shard.attach(process_id, sock.clone(), &executors());
                sock.write(json!({
                    "requestType": rt::PROCESS_LOGIN,
                    "state": 200,
                    "processId": reply_body.process_id,
                    "processName": reply_body.process_name,
                    "gameType": reply_body.game_type,
                }));
            });
        }
        Ok(Outcome::ServerNotFound) => reply(&sock, rt::PROCESS_LOGIN, 404, "server not found"),
        Ok(Outcome::AtCapacity) => reply(&sock, rt::PROCESS_LOGIN, 507, "server at capacity"),
        Err(err) => {
            error!(%err, "PROCESS_LOGIN failed");
            reply(&sock, rt::PROCESS_LOGIN, 500, "database error");
        }
    }
}

/// `requestType = 9`: mark a process idle and logged out. Also synthesised
/// by the shard when a cloud-process session is torn down (§4.1).
pub async fn process_logout(db: DbPool, _sock: Rc<SockHandle>, frame: Value) {
    let Some(process_id) = string_field(&frame, "accountId").map(str::to_owned) else {
        return;
    };

    let result = async {
        let mut conn = db.acquire_shared().await;
        sqlx::query(
            "UPDATE game_processes SET is_login = 0, is_idle = 1, last_heartbeat = NOW() \
             WHERE process_id = ?",
        )
        .bind(&process_id)
        .execute(&mut *conn)
        .await
    }
    .await;

    if let Err(err) = result {
        error!(%err, "PROCESS_LOGOUT failed");
    }
}
