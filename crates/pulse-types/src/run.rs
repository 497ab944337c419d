use crate::snapshot::MetricSnapshot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 监控运行类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunKind {
    /// 快速巡检（生产目标子集）
    Quick,
    /// 全量巡检
    Comprehensive,
    /// 深度巡检（含趋势分析）
    Deep,
}

impl RunKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunKind::Quick => "quick",
            RunKind::Comprehensive => "comprehensive",
            RunKind::Deep => "deep",
        }
    }
}

/// 一次监控会话的结果集
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringRun {
    /// 会话 ID
    pub session_id: String,

    /// 运行类型
    pub kind: RunKind,

    /// 开始时间
    pub started_at: DateTime<Utc>,

    /// 结束时间
    pub finished_at: Option<DateTime<Utc>>,

    /// 各目标快照
    pub snapshots: Vec<MetricSnapshot>,
}

impl MonitoringRun {
    pub fn begin(kind: RunKind) -> Self {
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            kind,
            started_at: Utc::now(),
            finished_at: None,
            snapshots: Vec::new(),
        }
    }

    pub fn record(&mut self, snapshot: MetricSnapshot) {
        self.snapshots.push(snapshot);
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// 生成会话汇总
    pub fn summary(&self) -> RunSummary {
        let successful: Vec<&MetricSnapshot> = self
            .snapshots
            .iter()
            .filter(|s| s.status.is_success())
            .collect();

        let healthy = successful.iter().filter(|s| s.health >= 80.0).count();
        let total_errors: u32 = successful.iter().map(|s| s.console_errors).sum();
        let total_warnings: u32 = successful.iter().map(|s| s.console_warnings).sum();

        let (avg_health, avg_load_time_ms) = if successful.is_empty() {
            (0.0, 0.0)
        } else {
            let n = successful.len() as f64;
            (
                successful.iter().map(|s| s.health).sum::<f64>() / n,
                successful.iter().map(|s| s.load_time_ms).sum::<f64>() / n,
            )
        };

        RunSummary {
            total_targets: self.snapshots.len(),
            successful_targets: successful.len(),
            healthy_targets: healthy,
            avg_health,
            avg_load_time_ms,
            total_errors,
            total_warnings,
        }
    }
}

/// 会话汇总
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub total_targets: usize,
    pub successful_targets: usize,
    pub healthy_targets: usize,
    pub avg_health: f64,
    pub avg_load_time_ms: f64,
    pub total_errors: u32,
    pub total_warnings: u32,
}
