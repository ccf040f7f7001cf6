//! Statistics: the OpenMetrics endpoint (§2, §6).

pub mod http_server;
pub mod metrics;
pub mod open_metric;

pub use open_metric::*;
