use crate::model::{AlertCandidate, AlertLevel};
use chrono::{DateTime, Utc};
use pulse_core::{parse_windows, Result, TimeWindow};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// 维护窗口抑制规则
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceRule {
    /// 被抑制的级别集合
    pub levels: Vec<AlertLevel>,

    /// 窗口列表（"HH:MM-HH:MM"）
    pub windows: Vec<String>,
}

/// 抑制配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuppressionConfig {
    /// 是否启用
    pub enabled: bool,

    /// 去重窗口（秒）
    pub dedup_window_secs: i64,

    /// 同类告警最大次数（保留字段，当前去重只做存在性检查）
    pub max_count: u32,

    /// 维护窗口规则
    pub maintenance: Vec<MaintenanceRule>,
}

impl Default for SuppressionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dedup_window_secs: 600,
            max_count: 1,
            maintenance: vec![MaintenanceRule {
                levels: vec![AlertLevel::Info, AlertLevel::Warning],
                windows: vec!["02:00-04:00".to_string()],
            }],
        }
    }
}

/// 抑制原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuppressReason {
    /// 落在维护窗口内
    Maintenance,
    /// 去重窗口内的重复告警
    Duplicate,
}

struct RecentAlert {
    fingerprint: String,
    timestamp: DateTime<Utc>,
}

/// 抑制评估器
///
/// 先做维护窗口抑制，再做滚动窗口去重；去重列表在每次检查时
/// 裁剪到窗口内，候选无论去留都会被记录，保证后续重复被捕获。
pub struct SuppressionEvaluator {
    config: SuppressionConfig,
    maintenance: Vec<(Vec<AlertLevel>, Vec<TimeWindow>)>,
    recent: Arc<RwLock<Vec<RecentAlert>>>,
}

impl SuppressionEvaluator {
    pub fn new(config: SuppressionConfig) -> Result<Self> {
        let maintenance = config
            .maintenance
            .iter()
            .map(|rule| Ok((rule.levels.clone(), parse_windows(&rule.windows)?)))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            config,
            maintenance,
            recent: Arc::new(RwLock::new(Vec::new())),
        })
    }

    /// 判断级别在给定时刻是否被维护窗口覆盖
    pub fn in_maintenance(&self, level: AlertLevel, at: DateTime<Utc>) -> bool {
        if !self.config.enabled {
            return false;
        }

        let time = at.time();
        self.maintenance
            .iter()
            .any(|(levels, windows)| {
                levels.contains(&level) && windows.iter().any(|w| w.contains(time))
            })
    }

    /// 评估一个候选；返回 Some(原因) 表示应丢弃
    pub async fn check(&self, candidate: &AlertCandidate, now: DateTime<Utc>) -> Option<SuppressReason> {
        if self.in_maintenance(candidate.level, now) {
            debug!(
                fingerprint = %candidate.fingerprint(),
                "Alert suppressed by maintenance window"
            );
            return Some(SuppressReason::Maintenance);
        }

        if self.is_duplicate_and_record(&candidate.fingerprint(), now).await {
            debug!(
                fingerprint = %candidate.fingerprint(),
                "Duplicate alert within dedup window"
            );
            return Some(SuppressReason::Duplicate);
        }

        None
    }

    /// 去重检查：窗口内同指纹已存在即为重复；候选总是被记录
    async fn is_duplicate_and_record(&self, fingerprint: &str, now: DateTime<Utc>) -> bool {
        let cutoff = now - chrono::Duration::seconds(self.config.dedup_window_secs);
        let mut recent = self.recent.write().await;

        recent.retain(|r| r.timestamp > cutoff);

        let duplicate = recent.iter().any(|r| r.fingerprint == fingerprint);

        recent.push(RecentAlert {
            fingerprint: fingerprint.to_string(),
            timestamp: now,
        });

        duplicate
    }

    /// 去重列表当前长度（检查用）
    pub async fn recent_len(&self) -> usize {
        self.recent.read().await.len()
    }
}
