//! `[mysql]` table — `Mysql.*` in the specification.

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Mysql {
    pub ip: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
    /// Size of the shared, non-transactional connection pool (§4.6).
    pub pool_size: usize,
    /// Size of the transactional connection queue (§4.6: "sized at size/2").
    /// `None` derives it from `pool_size / 2`.
    pub tx_pool_size: Option<usize>,
    pub heartbeat_interval_secs: u64,
}

impl Default for Mysql {
    fn default() -> Self {
        Self {
            ip: "127.0.0.1".into(),
            port: 3306,
            username: "root".into(),
            password: String::new(),
            database: "quicmesh".into(),
            pool_size: 8,
            tx_pool_size: None,
            heartbeat_interval_secs: 300,
        }
    }
}

impl Mysql {
    pub fn tx_pool_size(&self) -> usize {
        self.tx_pool_size.unwrap_or((self.pool_size / 2).max(1))
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    /// A `mysql://` URL suitable for `sqlx::MySqlConnection::connect`.
    pub fn url(&self) -> String {
        format!(
            "mysql://{}:{}@{}:{}/{}",
            self.username, self.password, self.ip, self.port, self.database
        )
    }
}
