use pulse_alert::{EscalationPolicy, SuppressionConfig, Thresholds};
use pulse_core::{parse_windows, PulseError, Result};
use pulse_history::RetentionPolicy;
use pulse_schedule::MaintenanceConfig;
use pulse_types::{Criticality, Environment, MonitoringTarget};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// 单个节奏的调度配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleEntry {
    /// 是否启用
    pub enabled: bool,

    /// 间隔（分钟）
    pub interval_minutes: u64,

    /// 目标子集；None 表示全部启用的目标
    pub targets: Option<Vec<String>>,
}

/// 三个监控节奏
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulesConfig {
    pub quick: ScheduleEntry,
    pub comprehensive: ScheduleEntry,
    pub deep: ScheduleEntry,
}

impl Default for SchedulesConfig {
    fn default() -> Self {
        Self {
            quick: ScheduleEntry {
                enabled: true,
                interval_minutes: 15,
                targets: Some(vec![
                    "prod-admin".to_string(),
                    "prod-notifications".to_string(),
                ]),
            },
            comprehensive: ScheduleEntry {
                enabled: true,
                interval_minutes: 60,
                targets: None,
            },
            deep: ScheduleEntry {
                enabled: true,
                interval_minutes: 1440,
                targets: None,
            },
        }
    }
}

/// 通知收件配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    /// 邮件收件人
    pub email_recipients: Vec<String>,

    /// 聊天 Webhook 地址；未配置时不注册 chat 渠道
    pub chat_webhook_url: Option<String>,

    /// 升级邮件额外收件人
    pub escalation_recipients: Vec<String>,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            email_recipients: vec![
                "admin@example.com".to_string(),
                "devops@example.com".to_string(),
            ],
            chat_webhook_url: None,
            escalation_recipients: vec!["manager@example.com".to_string()],
        }
    }
}

/// 历史与告警留存配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// 指标历史保留天数
    pub retention_days: i64,

    /// 告警历史上限
    pub alert_history_cap: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            retention_days: 90,
            alert_history_cap: 1000,
        }
    }
}

impl HistoryConfig {
    pub fn retention_policy(&self) -> RetentionPolicy {
        RetentionPolicy {
            retention_days: self.retention_days,
        }
    }
}

/// 监控平台配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub targets: Vec<MonitoringTarget>,
    pub thresholds: Thresholds,
    pub schedules: SchedulesConfig,
    pub escalation: EscalationPolicy,
    pub suppression: SuppressionConfig,
    pub maintenance: MaintenanceConfig,
    pub history: HistoryConfig,
    pub notifications: NotificationsConfig,
}

impl MonitorConfig {
    /// 带示例目标的默认配置
    pub fn with_default_targets() -> Self {
        Self {
            targets: default_targets(),
            ..Default::default()
        }
    }

    /// 启动期校验；任何问题都是 ConfigurationError，不可带病运行
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for target in &self.targets {
            if target.id.is_empty() {
                return Err(PulseError::Config("Target with empty id".to_string()));
            }
            if target.url.is_empty() {
                return Err(PulseError::Config(format!("Target {} has no url", target.id)));
            }
            if !seen.insert(target.id.as_str()) {
                return Err(PulseError::Config(format!("Duplicate target id: {}", target.id)));
            }
        }

        for (name, entry) in [
            ("quick", &self.schedules.quick),
            ("comprehensive", &self.schedules.comprehensive),
            ("deep", &self.schedules.deep),
        ] {
            if entry.enabled && entry.interval_minutes == 0 {
                return Err(PulseError::Config(format!(
                    "Schedule {} has zero interval",
                    name
                )));
            }
            if let Some(subset) = &entry.targets {
                for id in subset {
                    if !seen.contains(id.as_str()) {
                        return Err(PulseError::Config(format!(
                            "Schedule {} references unknown target: {}",
                            name, id
                        )));
                    }
                }
            }
        }

        parse_windows(&self.maintenance.windows)?;
        for rule in &self.suppression.maintenance {
            parse_windows(&rule.windows)?;
        }

        if self.suppression.dedup_window_secs <= 0 {
            return Err(PulseError::Config(
                "Suppression dedup window must be positive".to_string(),
            ));
        }

        if self.escalation.enabled {
            if self.escalation.stages.is_empty() {
                return Err(PulseError::Config(
                    "Escalation enabled with no stages".to_string(),
                ));
            }
            for stage in &self.escalation.stages {
                if stage.channels.is_empty() {
                    return Err(PulseError::Config(format!(
                        "Escalation stage {} has no channels",
                        stage.name
                    )));
                }
                if stage.delay_secs < 0 {
                    return Err(PulseError::Config(format!(
                        "Escalation stage {} has negative delay",
                        stage.name
                    )));
                }
            }
        }

        if self.history.retention_days <= 0 || self.history.alert_history_cap == 0 {
            return Err(PulseError::Config(
                "History retention must be positive".to_string(),
            ));
        }

        Ok(())
    }

    /// 配置摘要：按环境/重要程度/启用状态计数
    pub fn summary(&self) -> ConfigSummary {
        let mut by_environment = BTreeMap::new();
        let mut by_criticality = BTreeMap::new();

        for target in &self.targets {
            *by_environment
                .entry(target.environment.as_str().to_string())
                .or_insert(0usize) += 1;
            *by_criticality
                .entry(format!("{:?}", target.criticality).to_lowercase())
                .or_insert(0usize) += 1;
        }

        ConfigSummary {
            total_targets: self.targets.len(),
            enabled_targets: self.targets.iter().filter(|t| t.enabled).count(),
            by_environment,
            by_criticality,
        }
    }

    /// 根据子集选出目标；None 返回全部启用的目标
    pub fn select_targets(&self, subset: Option<&[String]>) -> Vec<MonitoringTarget> {
        match subset {
            Some(ids) => self
                .targets
                .iter()
                .filter(|t| t.enabled && ids.contains(&t.id))
                .cloned()
                .collect(),
            None => self.targets.iter().filter(|t| t.enabled).cloned().collect(),
        }
    }
}

/// 配置摘要
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSummary {
    pub total_targets: usize,
    pub enabled_targets: usize,
    pub by_environment: BTreeMap<String, usize>,
    pub by_criticality: BTreeMap<String, usize>,
}

/// 示例目标（生产/预发各两个）
pub fn default_targets() -> Vec<MonitoringTarget> {
    vec![
        MonitoringTarget::new(
            "prod-admin",
            "Production Admin",
            "https://example.com/admin",
            Environment::Production,
        )
        .with_criticality(Criticality::Critical),
        MonitoringTarget::new(
            "prod-notifications",
            "Production Notifications",
            "https://example.com/admin/notifications",
            Environment::Production,
        )
        .with_criticality(Criticality::High),
        MonitoringTarget::new(
            "staging-admin",
            "Staging Admin",
            "https://staging.example.com/admin",
            Environment::Staging,
        ),
        MonitoringTarget::new(
            "staging-notifications",
            "Staging Notifications",
            "https://staging.example.com/admin/notifications",
            Environment::Staging,
        ),
    ]
}
