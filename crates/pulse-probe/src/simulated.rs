use crate::health::health_score;
use crate::probe::Probe;
use async_trait::async_trait;
use pulse_types::{MetricSnapshot, MonitoringTarget};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// 模拟探测器
///
/// 按目标 ID 播种的伪随机子指标；同一目标的连续探测产生有界波动，
/// 便于在没有真实浏览器探测的情况下驱动告警与趋势链路。
pub struct SimulatedProbe {
    seed: u64,
    nonce: AtomicU64,
}

impl SimulatedProbe {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            nonce: AtomicU64::new(0),
        }
    }

    fn rng_for(&self, target_id: &str) -> StdRng {
        let mut hasher = DefaultHasher::new();
        target_id.hash(&mut hasher);
        self.nonce.fetch_add(1, Ordering::Relaxed).hash(&mut hasher);
        StdRng::seed_from_u64(self.seed ^ hasher.finish())
    }
}

impl Default for SimulatedProbe {
    fn default() -> Self {
        Self::new(0)
    }
}

#[async_trait]
impl Probe for SimulatedProbe {
    async fn probe(&self, target: &MonitoringTarget) -> anyhow::Result<MetricSnapshot> {
        let mut rng = self.rng_for(&target.id);

        let mut snapshot = MetricSnapshot::new(&target.id);
        snapshot.load_time_ms = rng.gen_range(500.0..2500.0);
        snapshot.first_contentful_paint_ms = rng.gen_range(300.0..1800.0);
        snapshot.cumulative_layout_shift = rng.gen_range(0.0..0.3);
        snapshot.console_errors = rng.gen_range(0..3);
        snapshot.console_warnings = rng.gen_range(0..5);
        snapshot.failed_requests = rng.gen_range(0..3);
        snapshot.accessibility_score = rng.gen_range(80.0..100.0);
        snapshot.health = health_score(&snapshot);

        debug!(
            target_id = %target.id,
            health = snapshot.health,
            load_time_ms = snapshot.load_time_ms,
            "Probe completed"
        );

        Ok(snapshot)
    }
}
