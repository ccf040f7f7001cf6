//! `[general]` table — cross-cutting knobs that aren't tied to a single
//! transport or the database, per §4.7/§6/§9 of the specification.

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct General {
    /// Number of shards (executor threads), per §4.7.
    pub shards: usize,
    /// Per-shard route-cache capacity, per §9 (Open Question: left as an
    /// arbitrary constant in the original; kept at 100 here).
    pub route_cache_capacity: usize,
    /// Seconds a session has to REGISTER before it's dropped, per §4.1.
    pub registration_timeout_secs: u64,
    /// Graceful shutdown drain budget before sessions are force-closed.
    pub shutdown_timeout_secs: u64,
    /// Shared secret used to verify REGISTER JWTs (HS256), per §6.
    pub hmac_secret: String,
    /// Port serving the OpenMetrics text endpoint.
    pub metrics_port: u16,
    /// Port serving the healthcheck endpoint.
    pub healthcheck_port: u16,
}

impl Default for General {
    fn default() -> Self {
        Self {
            shards: 4,
            route_cache_capacity: 100,
            registration_timeout_secs: 10,
            shutdown_timeout_secs: 30,
            hmac_secret: "change-me".into(),
            metrics_port: 9090,
            healthcheck_port: 9091,
        }
    }
}
