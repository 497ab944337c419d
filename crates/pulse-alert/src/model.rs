use chrono::{DateTime, Utc};
use pulse_types::{Environment, MonitoringTarget};
use serde::{Deserialize, Serialize};

/// 告警级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Critical,
    Warning,
    Info,
}

impl AlertLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertLevel::Critical => "critical",
            AlertLevel::Warning => "warning",
            AlertLevel::Info => "info",
        }
    }
}

/// 告警类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    HealthScore,
    LoadTime,
    ConsoleErrors,
    NetworkFailures,
    LayoutShift,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::HealthScore => "health_score",
            AlertType::LoadTime => "load_time",
            AlertType::ConsoleErrors => "console_errors",
            AlertType::NetworkFailures => "network_failures",
            AlertType::LayoutShift => "layout_shift",
        }
    }
}

/// 告警状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Active,
    Acknowledged,
    Resolved,
}

/// 告警关联的目标信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetRef {
    pub id: String,
    pub name: String,
    pub url: String,
    pub environment: Environment,
}

impl From<&MonitoringTarget> for TargetRef {
    fn from(target: &MonitoringTarget) -> Self {
        Self {
            id: target.id.clone(),
            name: target.name.clone(),
            url: target.url.clone(),
            environment: target.environment,
        }
    }
}

/// 数值明细（当前值与阈值）
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AlertDetail {
    pub current: f64,
    pub threshold: f64,
}

/// 告警候选
///
/// 阈值评估产出，立即交给抑制逻辑消费，不落盘。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertCandidate {
    pub level: AlertLevel,
    pub alert_type: AlertType,
    pub message: String,
    pub target: TargetRef,
    pub detail: AlertDetail,
    pub timestamp: DateTime<Utc>,
}

impl AlertCandidate {
    pub fn new(
        level: AlertLevel,
        alert_type: AlertType,
        message: impl Into<String>,
        target: TargetRef,
        detail: AlertDetail,
    ) -> Self {
        Self {
            level,
            alert_type,
            message: message.into(),
            target,
            detail,
            timestamp: Utc::now(),
        }
    }

    /// 去重指纹：(目标, 类型, 级别)
    pub fn fingerprint(&self) -> String {
        fingerprint_of(&self.target.id, self.alert_type, self.level)
    }
}

/// 一次通知投递记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationEntry {
    /// 渠道名
    pub channel: String,

    /// 升级阶段名
    pub stage: String,

    /// 投递时间
    pub timestamp: DateTime<Utc>,
}

/// 持久化的告警记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRecord {
    /// 告警 ID
    pub id: String,

    pub level: AlertLevel,
    pub alert_type: AlertType,
    pub message: String,
    pub target: TargetRef,
    pub detail: AlertDetail,

    /// 创建时间
    pub created_at: DateTime<Utc>,

    /// 状态
    pub status: AlertStatus,

    /// 确认时间
    pub acknowledged_at: Option<DateTime<Utc>>,

    /// 解决时间
    pub resolved_at: Option<DateTime<Utc>>,

    /// 解决说明
    pub resolution: Option<String>,

    /// 升级计数
    pub escalation_level: u32,

    /// 已发送的通知
    pub notifications_sent: Vec<NotificationEntry>,
}

impl AlertRecord {
    pub fn from_candidate(candidate: AlertCandidate) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            level: candidate.level,
            alert_type: candidate.alert_type,
            message: candidate.message,
            target: candidate.target,
            detail: candidate.detail,
            created_at: candidate.timestamp,
            status: AlertStatus::Active,
            acknowledged_at: None,
            resolved_at: None,
            resolution: None,
            escalation_level: 0,
            notifications_sent: Vec::new(),
        }
    }

    pub fn fingerprint(&self) -> String {
        fingerprint_of(&self.target.id, self.alert_type, self.level)
    }
}

fn fingerprint_of(target_id: &str, alert_type: AlertType, level: AlertLevel) -> String {
    format!("{}:{}:{}", target_id, alert_type.as_str(), level.as_str())
}
