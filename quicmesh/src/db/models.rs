//! Row types for the persisted schema (§3).

use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct GameServer {
    pub server_id: String,
    pub ip_address: String,
    pub name: String,
    pub status: String,
    pub max_processes: i64,
    pub current_processes: i64,
    pub region: Option<String>,
    pub tags: Option<String>,
    pub specifications: Option<String>,
    pub last_heartbeat: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub del_flag: i8,
}

#[derive(Debug, Clone, FromRow)]
pub struct GameProcess {
    pub process_id: String,
    pub server_id: String,
    pub process_name: String,
    pub game_type: String,
    pub game_version: Option<String>,
    pub is_idle: i8,
    pub is_login: i8,
    pub health_status: String,
    pub started_at: Option<DateTime<Utc>>,
    pub last_heartbeat: Option<DateTime<Utc>>,
    pub last_health_check: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub del_flag: i8,
}
