//! 按目标追加的指标历史序列
//!
//! 每次追加独立生效；读取得到的是读取时刻的一致快照。

use chrono::{Duration, Utc};
use pulse_types::MetricSnapshot;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// 历史保留策略
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionPolicy {
    /// 保留天数
    pub retention_days: i64,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self { retention_days: 90 }
    }
}

/// 指标历史存储
pub struct MetricSeriesStore {
    series: Arc<RwLock<HashMap<String, Vec<MetricSnapshot>>>>,
    retention: RetentionPolicy,
}

impl MetricSeriesStore {
    pub fn new(retention: RetentionPolicy) -> Self {
        Self {
            series: Arc::new(RwLock::new(HashMap::new())),
            retention,
        }
    }

    /// 追加一条快照，并裁剪超出保留期的旧数据
    pub async fn append(&self, snapshot: MetricSnapshot) {
        let target_id = snapshot.target_id.clone();
        let cutoff = Utc::now() - Duration::days(self.retention.retention_days);
        let mut series = self.series.write().await;

        let entries = series.entry(target_id.clone()).or_insert_with(Vec::new);
        entries.push(snapshot);
        entries.retain(|s| s.timestamp > cutoff);

        debug!(
            target_id = %target_id,
            points = entries.len(),
            "Snapshot appended to history"
        );
    }

    /// 读取目标在最近 window_days 内的快照（按时间升序）
    pub async fn window(&self, target_id: &str, window_days: i64) -> Vec<MetricSnapshot> {
        let cutoff = Utc::now() - Duration::days(window_days);
        let series = self.series.read().await;

        let mut entries: Vec<MetricSnapshot> = series
            .get(target_id)
            .map(|v| v.iter().filter(|s| s.timestamp > cutoff).cloned().collect())
            .unwrap_or_default();

        entries.sort_by_key(|s| s.timestamp);
        entries
    }

    /// 按抽取函数提取单一指标的数值序列（跳过缺失值）
    pub async fn series<F>(&self, target_id: &str, window_days: i64, extract: F) -> Vec<f64>
    where
        F: Fn(&MetricSnapshot) -> Option<f64>,
    {
        self.window(target_id, window_days)
            .await
            .iter()
            .filter_map(extract)
            .collect()
    }

    /// 目标当前持有的数据点数
    pub async fn len(&self, target_id: &str) -> usize {
        let series = self.series.read().await;
        series.get(target_id).map(|v| v.len()).unwrap_or(0)
    }

    pub async fn is_empty(&self, target_id: &str) -> bool {
        self.len(target_id).await == 0
    }
}

impl Default for MetricSeriesStore {
    fn default() -> Self {
        Self::new(RetentionPolicy::default())
    }
}
