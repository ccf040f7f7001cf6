//! End-to-end allocator scenarios (spec.md §8 S4/S5) against a live MySQL
//! instance. Skipped cleanly when `QUICMESH_TEST_DATABASE_URL` isn't set,
//! since no retrieved environment ships a MySQL server by default.

use quicmesh::db::{DbPool, TxGuard};
use quicmesh::logic::allocator::{self, Outcome, ProcessLoginRequest};
use sqlx::Row;

fn test_database_url() -> Option<String> {
    std::env::var("QUICMESH_TEST_DATABASE_URL").ok()
}

async fn fresh_server(pool: &sqlx::MySqlPool, max_processes: i64) -> (String, String) {
    let server_id = uuid::Uuid::new_v4().to_string();
    let ip_address = format!("10.0.0.{}", rand::random::<u8>());
    sqlx::query(
        "INSERT INTO game_servers \
         (server_id, ip_address, name, status, max_processes, current_processes, \
          created_at, updated_at, del_flag) \
         VALUES (?, ?, 'test-server', 'online', ?, 0, NOW(), NOW(), 0)",
    )
    .bind(&server_id)
    .bind(&ip_address)
    .bind(max_processes)
    .execute(pool)
    .await
    .expect("insert fresh server");
    (server_id, ip_address)
}

async fn current_processes(pool: &sqlx::MySqlPool, server_id: &str) -> i64 {
    sqlx::query("SELECT current_processes FROM game_servers WHERE server_id = ?")
        .bind(server_id)
        .fetch_one(pool)
        .await
        .expect("fetch current_processes")
        .try_get("current_processes")
        .unwrap()
}

/// S4 — a fresh server's first PROCESS_LOGIN provisions a new process row
/// and bumps `current_processes` to 1.
///
/// `TxGuard::drop` rolls back via `spawn_local`, mirroring how it runs
/// inside a shard's `LocalSet` in production (§4.7); the test provides the
/// same context explicitly.
#[tokio::test]
async fn s4_process_allocation_fresh_server() {
    let Some(url) = test_database_url() else {
        eprintln!("QUICMESH_TEST_DATABASE_URL not set, skipping");
        return;
    };

    let local = tokio::task::LocalSet::new();
    local
        .run_until(async move {
            quicmesh::db::migrate(&url).await.expect("migrate");
            let verify_pool =
                sqlx::MySqlPool::connect(&url).await.expect("connect verify pool");
            let db = DbPool::connect(&url, 2, 2).await.expect("connect DbPool");

            let (server_id, ip_address) = fresh_server(&verify_pool, 2).await;

            let mut guard = TxGuard::acquire(&db)
                .await
                .expect("BEGIN should succeed")
                .expect("tx queue should not be empty");
            let outcome = allocator::process_login(
                &mut guard,
                ProcessLoginRequest {
                    server_id: server_id.clone(),
                    process_name: "proc-a".into(),
                    game_type: "shooter".into(),
                    game_version: Some("1.0".into()),
                    remote_ip: ip_address,
                },
            )
            .await
            .expect("process_login");

            match outcome {
                Outcome::Ok(reply) => {
                    guard.commit().await.expect("commit");
                    assert!(!reply.process_id.is_empty());
                    assert_eq!(current_processes(&verify_pool, &server_id).await, 1);
                }
                _ => panic!("expected a fresh server to provision a process"),
            }
        })
        .await;
}

/// S5 — after the server is already at capacity, a further PROCESS_LOGIN
/// replies 507-equivalent (`Outcome::AtCapacity`), inserts no row, and
/// leaves `current_processes` unchanged because the transaction rolls back
/// (the guard is dropped without `commit()`).
#[tokio::test]
async fn s5_process_allocation_at_capacity() {
    let Some(url) = test_database_url() else {
        eprintln!("QUICMESH_TEST_DATABASE_URL not set, skipping");
        return;
    };

    let local = tokio::task::LocalSet::new();
    local
        .run_until(async move {
            quicmesh::db::migrate(&url).await.expect("migrate");
            let verify_pool =
                sqlx::MySqlPool::connect(&url).await.expect("connect verify pool");
            let db = DbPool::connect(&url, 2, 2).await.expect("connect DbPool");

            // max_processes = 1, pre-filled to current_processes = 1 so the
            // server already sits at capacity.
            let (server_id, ip_address) = fresh_server(&verify_pool, 1).await;
            sqlx::query("UPDATE game_servers SET current_processes = 1 WHERE server_id = ?")
                .bind(&server_id)
                .execute(&verify_pool)
                .await
                .expect("prefill current_processes");

            let mut guard = TxGuard::acquire(&db)
                .await
                .expect("BEGIN should succeed")
                .expect("tx queue should not be empty");
            let outcome = allocator::process_login(
                &mut guard,
                ProcessLoginRequest {
                    server_id: server_id.clone(),
                    process_name: "proc-b".into(),
                    game_type: "shooter".into(),
                    game_version: None,
                    remote_ip: ip_address,
                },
            )
            .await
            .expect("process_login");

            assert!(matches!(outcome, Outcome::AtCapacity));
            drop(guard); // rolls back, no commit() was called

            assert_eq!(current_processes(&verify_pool, &server_id).await, 1);
            let rows: i64 =
                sqlx::query("SELECT COUNT(*) AS n FROM game_processes WHERE server_id = ?")
                    .bind(&server_id)
                    .fetch_one(&verify_pool)
                    .await
                    .expect("count processes")
                    .try_get("n")
                    .unwrap();
            assert_eq!(rows, 0);
        })
        .await;
}
