//! Idle-process allocator (§4.5, handler `PROCESS_LOGIN`).
//!
//! Runs entirely under one [`TxGuard`]: reuse an idle process row if one
//! matches, else provision a fresh one under the server's capacity
//! invariant, else reply 507. The in-memory idle pool is only touched
//! after commit (§4.5 "Concurrency note").

use sqlx::Row;
use uuid::Uuid;

use crate::alloc;
use crate::db::{Error, TxGuard};

pub struct ProcessLoginRequest {
    pub server_id: String,
    pub process_name: String,
    pub game_type: String,
    pub game_version: Option<String>,
    pub remote_ip: String,
}

pub struct ProcessLoginReply {
    pub process_id: String,
    pub process_name: String,
    pub game_type: String,
}

/// Outcome that maps directly onto the handler's reply `state` (§7).
pub enum Outcome {
    Ok(ProcessLoginReply),
    ServerNotFound,
    AtCapacity,
}

pub async fn process_login(
    guard: &mut TxGuard,
    request: ProcessLoginRequest,
) -> Result<Outcome, Error> {
    let conn = guard.connection();

    // 1. Look up the server by (server_id, ip_address).
    let server = sqlx::query(
        "SELECT max_processes, current_processes FROM game_servers \
         WHERE server_id = ? AND ip_address = ? AND del_flag = 0 FOR UPDATE",
    )
    .bind(&request.server_id)
    .bind(&request.remote_ip)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(server) = server else {
        return Ok(Outcome::ServerNotFound);
    };

    let max_processes: i64 = server.try_get("max_processes")?;
    let current_processes: i64 = server.try_get("current_processes")?;

    // 2+3. Filter for an idle, healthy, non-logged-in, non-deleted row
    // matching game_type.
    let idle_row = sqlx::query("SELECT process_id FROM game_processes \
         WHERE server_id = ? AND game_type = ? AND is_idle = 1 AND is_login = 0 \
           AND health_status = 'healthy' AND del_flag = 0 \
         LIMIT 1 FOR UPDATE")
        .bind(&request.server_id)
        .bind(&request.game_type)
        .fetch_optional(&mut *conn)
        .await?;

    let process_id = if let Some(row) = idle_row {
        // 4. Reuse path.
        let process_id: String = row.try_get("process_id")?;
        sqlx::query(
            "UPDATE game_processes SET is_login = 1, is_idle = 1, last_heartbeat = NOW() \
             WHERE process_id = ?",
        )
        .bind(&process_id)
        .execute(&mut *conn)
        .await?;
        process_id
    } else if current_processes < max_processes {
        // 5. Provision path.
        let process_id = Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO game_processes \
             (process_id, server_id, process_name, game_type, game_version, \
              is_idle, is_login, health_status, started_at, last_heartbeat, \
              created_at, updated_at, del_flag) \
             VALUES (?, ?, ?, ?, ?, 1, 1, 'healthy', NOW(), NOW(), NOW(), NOW(), 0)",
        )
        .bind(&process_id)
        .bind(&request.server_id)
        .bind(&request.process_name)
        .bind(&request.game_type)
        .bind(&request.game_version)
        .execute(&mut *conn)
        .await?;

        let updated = sqlx::query(
            "UPDATE game_servers SET current_processes = ? WHERE server_id = ? \
             AND current_processes = ?",
        )
        .bind(current_processes + 1)
        .bind(&request.server_id)
        .bind(current_processes)
        .execute(&mut *conn)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(Error::NotFound);
        }

        process_id
    } else {
        // 6. At capacity.
        return Ok(Outcome::AtCapacity);
    };

    // 7. Commit is the caller's responsibility (the handler owns the
    // guard); the idle pool is updated by the caller after that commit.
    Ok(Outcome::Ok(ProcessLoginReply {
        process_id,
        process_name: request.process_name,
        game_type: request.game_type,
    }))
}

/// Record `process_id` as idle for `game_type` in the process-wide pool.
/// Called by the handler only after the allocator's transaction commits.
pub fn mark_idle_after_commit(game_type: &str, process_id: String) {
    alloc::push(game_type, process_id);
}
