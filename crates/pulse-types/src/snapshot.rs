use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 探测结果状态
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ProbeStatus {
    /// 探测成功
    Success,
    /// 探测失败
    Error {
        /// 失败原因
        message: String,
    },
}

impl ProbeStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, ProbeStatus::Success)
    }
}

/// 一次监控运行产出的指标快照
///
/// 创建后不可变，追加到目标的历史序列。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricSnapshot {
    /// 目标 ID
    pub target_id: String,

    /// 采集时间
    pub timestamp: DateTime<Utc>,

    /// 探测状态
    pub status: ProbeStatus,

    /// 健康分（0-100）
    pub health: f64,

    /// 页面加载耗时（毫秒）
    pub load_time_ms: f64,

    /// 首次内容绘制（毫秒）
    pub first_contentful_paint_ms: f64,

    /// 累计布局偏移
    pub cumulative_layout_shift: f64,

    /// 控制台错误数
    pub console_errors: u32,

    /// 控制台警告数
    pub console_warnings: u32,

    /// 失败的网络请求数
    pub failed_requests: u32,

    /// 可访问性评分（0-100）
    pub accessibility_score: f64,
}

impl MetricSnapshot {
    pub fn new(target_id: impl Into<String>) -> Self {
        Self {
            target_id: target_id.into(),
            timestamp: Utc::now(),
            status: ProbeStatus::Success,
            health: 100.0,
            load_time_ms: 0.0,
            first_contentful_paint_ms: 0.0,
            cumulative_layout_shift: 0.0,
            console_errors: 0,
            console_warnings: 0,
            failed_requests: 0,
            accessibility_score: 100.0,
        }
    }

    /// 构造失败快照（探测本身出错时记录）
    pub fn failed(target_id: impl Into<String>, message: impl Into<String>) -> Self {
        let mut snapshot = Self::new(target_id);
        snapshot.status = ProbeStatus::Error {
            message: message.into(),
        };
        snapshot.health = 0.0;
        snapshot
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_health(mut self, health: f64) -> Self {
        self.health = health;
        self
    }
}
