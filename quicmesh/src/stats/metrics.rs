//! Router-specific metrics surfaced on the OpenMetrics endpoint: shard
//! pressure (§4.7, "observable; used only for debugging") and idle-pool
//! occupancy (§4.5).

use super::open_metric::{Measurement, OpenMetric};
use crate::alloc;
use crate::shard::executor::executors;

pub struct ShardPressure;

impl OpenMetric for ShardPressure {
    fn name(&self) -> String {
        "quicmesh_shard_pressure".into()
    }

    fn help(&self) -> Option<String> {
        Some("outstanding jobs posted to each shard, debug-only".into())
    }

    fn measurements(&self) -> Vec<Measurement> {
        let executors = executors();
        (0..executors.len())
            .map(|index| Measurement {
                labels: vec![("shard".into(), index.to_string())],
                measurement: executors.shard(index).pressure() as f64,
            })
            .collect()
    }
}

pub struct IdlePoolSize;

impl OpenMetric for IdlePoolSize {
    fn name(&self) -> String {
        "quicmesh_idle_pool_size".into()
    }

    fn help(&self) -> Option<String> {
        Some("idle cloud-process workers currently eligible for dispatch".into())
    }

    fn measurements(&self) -> Vec<Measurement> {
        alloc::sizes()
            .into_iter()
            .map(|(game_type, size)| Measurement {
                labels: vec![("game_type".into(), game_type)],
                measurement: size as f64,
            })
            .collect()
    }
}
