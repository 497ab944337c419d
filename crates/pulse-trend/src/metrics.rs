use pulse_types::MetricSnapshot;
use serde::{Deserialize, Serialize};

/// 参与趋势分析的指标
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackedMetric {
    Health,
    LoadTime,
    FirstContentfulPaint,
    LayoutShift,
    ErrorCount,
    Accessibility,
}

/// 全部指标，按综合评分权重排列
pub const ALL_METRICS: [TrackedMetric; 6] = [
    TrackedMetric::Health,
    TrackedMetric::LoadTime,
    TrackedMetric::FirstContentfulPaint,
    TrackedMetric::LayoutShift,
    TrackedMetric::ErrorCount,
    TrackedMetric::Accessibility,
];

impl TrackedMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackedMetric::Health => "health",
            TrackedMetric::LoadTime => "load_time",
            TrackedMetric::FirstContentfulPaint => "first_contentful_paint",
            TrackedMetric::LayoutShift => "layout_shift",
            TrackedMetric::ErrorCount => "error_count",
            TrackedMetric::Accessibility => "accessibility",
        }
    }

    /// 综合评分权重
    pub fn weight(&self) -> f64 {
        match self {
            TrackedMetric::Health => 0.30,
            TrackedMetric::LoadTime => 0.25,
            TrackedMetric::FirstContentfulPaint => 0.15,
            TrackedMetric::LayoutShift => 0.10,
            TrackedMetric::ErrorCount => 0.15,
            TrackedMetric::Accessibility => 0.05,
        }
    }

    /// 理想值
    pub fn ideal(&self) -> f64 {
        match self {
            TrackedMetric::Health => 95.0,
            TrackedMetric::LoadTime => 2000.0,
            TrackedMetric::FirstContentfulPaint => 1000.0,
            TrackedMetric::LayoutShift => 0.05,
            TrackedMetric::ErrorCount => 0.0,
            TrackedMetric::Accessibility => 100.0,
        }
    }

    /// 从快照提取数值；error 快照不参与
    pub fn extract(&self, snapshot: &MetricSnapshot) -> Option<f64> {
        if !snapshot.status.is_success() {
            return None;
        }

        Some(match self {
            TrackedMetric::Health => snapshot.health,
            TrackedMetric::LoadTime => snapshot.load_time_ms,
            TrackedMetric::FirstContentfulPaint => snapshot.first_contentful_paint_ms,
            TrackedMetric::LayoutShift => snapshot.cumulative_layout_shift,
            TrackedMetric::ErrorCount => snapshot.console_errors as f64,
            TrackedMetric::Accessibility => snapshot.accessibility_score,
        })
    }
}

/// 单条快照的综合加权性能分（0-100）
///
/// 每个指标按理想值归一，低优指标反向计分，再按权重合成。
pub fn performance_score(snapshot: &MetricSnapshot) -> f64 {
    let mut total_score = 0.0;
    let mut total_weight = 0.0;

    for metric in ALL_METRICS {
        let Some(value) = metric.extract(snapshot) else {
            continue;
        };

        let score = match metric {
            TrackedMetric::LayoutShift => (100.0 - value / metric.ideal() * 100.0).max(0.0),
            TrackedMetric::ErrorCount => (100.0 - value * 20.0).max(0.0),
            _ => (value / metric.ideal() * 100.0).min(100.0),
        };

        total_score += score * metric.weight();
        total_weight += metric.weight();
    }

    if total_weight > 0.0 {
        total_score / total_weight
    } else {
        0.0
    }
}
