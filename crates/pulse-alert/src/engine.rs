use crate::escalation::EscalationScheduler;
use crate::model::{
    AlertCandidate, AlertDetail, AlertLevel, AlertRecord, AlertStatus, AlertType, NotificationEntry,
    TargetRef,
};
use crate::store::AlertStore;
use crate::suppression::SuppressionEvaluator;
use chrono::Utc;
use pulse_notify::{NotifyLevel, NotifyManager, NotifyMessage};
use pulse_types::{MetricSnapshot, MonitoringTarget};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// 严重级阈值
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CriticalThresholds {
    pub health_score: f64,
    pub load_time_ms: f64,
    pub console_errors: u32,
    pub failed_requests: u32,
}

impl Default for CriticalThresholds {
    fn default() -> Self {
        Self {
            health_score: 70.0,
            load_time_ms: 5000.0,
            console_errors: 1,
            failed_requests: 2,
        }
    }
}

/// 警告级阈值
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarningThresholds {
    pub health_score: f64,
    pub load_time_ms: f64,
    pub console_warnings: u32,
    pub failed_requests: u32,
}

impl Default for WarningThresholds {
    fn default() -> Self {
        Self {
            health_score: 80.0,
            load_time_ms: 3000.0,
            console_warnings: 5,
            failed_requests: 1,
        }
    }
}

/// 信息级阈值
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfoThresholds {
    pub health_score: f64,
    pub load_time_ms: f64,
    pub layout_shift: f64,
}

impl Default for InfoThresholds {
    fn default() -> Self {
        Self {
            health_score: 90.0,
            load_time_ms: 2000.0,
            layout_shift: 0.1,
        }
    }
}

/// 告警阈值配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Thresholds {
    pub critical: CriticalThresholds,
    pub warning: WarningThresholds,
    pub info: InfoThresholds,
}

/// 告警引擎
///
/// 阈值评估 → 抑制 → 持久化 → 立即通知 → 安排升级。
pub struct AlertEngine {
    thresholds: Thresholds,
    suppression: SuppressionEvaluator,
    store: Arc<AlertStore>,
    escalation: Arc<EscalationScheduler>,
    notifier: Arc<NotifyManager>,
}

impl AlertEngine {
    pub fn new(
        thresholds: Thresholds,
        suppression: SuppressionEvaluator,
        store: Arc<AlertStore>,
        escalation: Arc<EscalationScheduler>,
        notifier: Arc<NotifyManager>,
    ) -> Self {
        Self {
            thresholds,
            suppression,
            store,
            escalation,
            notifier,
        }
    }

    /// 对一条快照做阈值评估
    ///
    /// 各指标独立评估；同一指标的 critical 与 warning 互斥，取更差者。
    pub fn evaluate(
        &self,
        snapshot: &MetricSnapshot,
        target: &MonitoringTarget,
    ) -> Vec<AlertCandidate> {
        if !snapshot.status.is_success() {
            return Vec::new();
        }

        let t = &self.thresholds;
        let target_ref = TargetRef::from(target);
        let mut candidates = Vec::new();

        // 健康分：低于阈值
        if snapshot.health < t.critical.health_score {
            candidates.push(AlertCandidate::new(
                AlertLevel::Critical,
                AlertType::HealthScore,
                format!(
                    "Critical: Health score {}% is below threshold {}%",
                    snapshot.health, t.critical.health_score
                ),
                target_ref.clone(),
                AlertDetail {
                    current: snapshot.health,
                    threshold: t.critical.health_score,
                },
            ));
        } else if snapshot.health < t.warning.health_score {
            candidates.push(AlertCandidate::new(
                AlertLevel::Warning,
                AlertType::HealthScore,
                format!(
                    "Warning: Health score {}% is below threshold {}%",
                    snapshot.health, t.warning.health_score
                ),
                target_ref.clone(),
                AlertDetail {
                    current: snapshot.health,
                    threshold: t.warning.health_score,
                },
            ));
        }

        // 加载耗时：超过阈值
        if snapshot.load_time_ms > t.critical.load_time_ms {
            candidates.push(AlertCandidate::new(
                AlertLevel::Critical,
                AlertType::LoadTime,
                format!(
                    "Critical: Page load time {}ms exceeds threshold {}ms",
                    snapshot.load_time_ms, t.critical.load_time_ms
                ),
                target_ref.clone(),
                AlertDetail {
                    current: snapshot.load_time_ms,
                    threshold: t.critical.load_time_ms,
                },
            ));
        } else if snapshot.load_time_ms > t.warning.load_time_ms {
            candidates.push(AlertCandidate::new(
                AlertLevel::Warning,
                AlertType::LoadTime,
                format!(
                    "Warning: Page load time {}ms exceeds threshold {}ms",
                    snapshot.load_time_ms, t.warning.load_time_ms
                ),
                target_ref.clone(),
                AlertDetail {
                    current: snapshot.load_time_ms,
                    threshold: t.warning.load_time_ms,
                },
            ));
        }

        // 控制台错误数
        if snapshot.console_errors > t.critical.console_errors {
            candidates.push(AlertCandidate::new(
                AlertLevel::Critical,
                AlertType::ConsoleErrors,
                format!(
                    "Critical: {} console errors detected",
                    snapshot.console_errors
                ),
                target_ref.clone(),
                AlertDetail {
                    current: snapshot.console_errors as f64,
                    threshold: t.critical.console_errors as f64,
                },
            ));
        }

        // 失败的网络请求
        if snapshot.failed_requests > t.critical.failed_requests {
            candidates.push(AlertCandidate::new(
                AlertLevel::Critical,
                AlertType::NetworkFailures,
                format!(
                    "Critical: {} network requests failed",
                    snapshot.failed_requests
                ),
                target_ref.clone(),
                AlertDetail {
                    current: snapshot.failed_requests as f64,
                    threshold: t.critical.failed_requests as f64,
                },
            ));
        }

        // 布局偏移
        if snapshot.cumulative_layout_shift > t.info.layout_shift {
            candidates.push(AlertCandidate::new(
                AlertLevel::Info,
                AlertType::LayoutShift,
                format!(
                    "Info: Cumulative layout shift {:.3} exceeds threshold {}",
                    snapshot.cumulative_layout_shift, t.info.layout_shift
                ),
                target_ref,
                AlertDetail {
                    current: snapshot.cumulative_layout_shift,
                    threshold: t.info.layout_shift,
                },
            ));
        }

        candidates
    }

    /// 过滤并持久化候选告警，返回幸存记录
    pub async fn process(&self, candidates: Vec<AlertCandidate>) -> Vec<AlertRecord> {
        let now = Utc::now();
        let mut survivors = Vec::new();

        for candidate in candidates {
            if let Some(reason) = self.suppression.check(&candidate, now).await {
                info!(
                    fingerprint = %candidate.fingerprint(),
                    reason = ?reason,
                    "Alert suppressed"
                );
                continue;
            }

            let mut record = AlertRecord::from_candidate(candidate);
            info!(
                alert_id = %record.id,
                level = %record.level.as_str(),
                alert_type = %record.alert_type.as_str(),
                "Alert fired: {}",
                record.message
            );

            self.store.insert(record.clone()).await;
            self.send_immediate(&mut record).await;
            self.escalation.arm(&record).await;

            survivors.push(record);
        }

        survivors
    }

    /// 立即阶段通知
    async fn send_immediate(&self, record: &mut AlertRecord) {
        let Some(stage) = self.escalation.policy().immediate_stage() else {
            return;
        };
        if !self.escalation.policy().enabled {
            return;
        }

        let level = match record.level {
            AlertLevel::Critical => NotifyLevel::Critical,
            AlertLevel::Warning => NotifyLevel::Warning,
            AlertLevel::Info => NotifyLevel::Info,
        };

        let message = NotifyMessage::new(
            format!(
                "[{}] {} alert: {} ({})",
                stage.name,
                record.level.as_str(),
                record.alert_type.as_str(),
                record.target.name
            ),
            record.message.clone(),
            level,
        );

        let delivered = self.notifier.dispatch(&stage.channels, &message).await;
        let now = Utc::now();
        let entries: Vec<NotificationEntry> = delivered
            .into_iter()
            .map(|channel| NotificationEntry {
                channel,
                stage: stage.name.clone(),
                timestamp: now,
            })
            .collect();

        record.notifications_sent.extend(entries.clone());
        self.store
            .update(&record.id, |r| r.notifications_sent.extend(entries))
            .await;
    }

    /// 确认告警；未知 ID 返回 false
    pub async fn acknowledge(&self, alert_id: &str) -> bool {
        let ok = self
            .store
            .update(alert_id, |r| {
                r.status = AlertStatus::Acknowledged;
                r.acknowledged_at = Some(Utc::now());
            })
            .await;

        if ok {
            info!(alert_id = %alert_id, "Alert acknowledged");
        }
        ok
    }

    /// 解决告警；未知 ID 返回 false
    pub async fn resolve(&self, alert_id: &str, note: &str) -> bool {
        let note = note.to_string();
        let ok = self
            .store
            .update(alert_id, |r| {
                r.status = AlertStatus::Resolved;
                r.resolved_at = Some(Utc::now());
                r.resolution = Some(note);
            })
            .await;

        if ok {
            info!(alert_id = %alert_id, "Alert resolved");
        }
        ok
    }

    pub fn store(&self) -> &Arc<AlertStore> {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::escalation::EscalationPolicy;
    use crate::suppression::{MaintenanceRule, SuppressionConfig};
    use pulse_notify::EmailChannel;
    use pulse_types::Environment;

    fn target() -> MonitoringTarget {
        MonitoringTarget::new(
            "prod-admin",
            "Production Admin",
            "https://example.com/admin",
            Environment::Production,
        )
    }

    fn engine_with(suppression: SuppressionConfig) -> AlertEngine {
        let store = Arc::new(AlertStore::new(1000));
        let mut manager = NotifyManager::new();
        manager.register(Box::new(EmailChannel::new(vec![
            "admin@example.com".to_string(),
        ])));
        let notifier = Arc::new(manager);
        let escalation = Arc::new(EscalationScheduler::new(
            EscalationPolicy::default(),
            notifier.clone(),
            store.clone(),
        ));

        AlertEngine::new(
            Thresholds::default(),
            SuppressionEvaluator::new(suppression).unwrap(),
            store,
            escalation,
            notifier,
        )
    }

    fn engine() -> AlertEngine {
        engine_with(SuppressionConfig {
            maintenance: Vec::new(),
            ..Default::default()
        })
    }

    #[test]
    fn test_health_alert_scenario() {
        let engine = engine();
        let snapshot = MetricSnapshot::new("prod-admin").with_health(65.0);

        let candidates = engine.evaluate(&snapshot, &target());

        assert_eq!(candidates.len(), 1);
        let alert = &candidates[0];
        assert_eq!(alert.level, AlertLevel::Critical);
        assert_eq!(alert.alert_type, AlertType::HealthScore);
        assert_eq!(alert.detail.current, 65.0);
        assert_eq!(alert.detail.threshold, 70.0);
    }

    #[test]
    fn test_health_critical_wins_over_warning() {
        let engine = engine();
        let snapshot = MetricSnapshot::new("prod-admin").with_health(65.0);

        let candidates = engine.evaluate(&snapshot, &target());
        // 同一指标 critical 与 warning 互斥
        assert_eq!(
            candidates
                .iter()
                .filter(|c| c.alert_type == AlertType::HealthScore)
                .count(),
            1
        );
    }

    #[test]
    fn test_warning_tier_for_health() {
        let engine = engine();
        let snapshot = MetricSnapshot::new("prod-admin").with_health(75.0);

        let candidates = engine.evaluate(&snapshot, &target());
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].level, AlertLevel::Warning);
        assert_eq!(candidates[0].detail.threshold, 80.0);
    }

    #[test]
    fn test_multiple_metrics_alert_independently() {
        let engine = engine();
        let mut snapshot = MetricSnapshot::new("prod-admin").with_health(65.0);
        snapshot.load_time_ms = 6000.0;
        snapshot.console_errors = 3;
        snapshot.failed_requests = 4;
        snapshot.cumulative_layout_shift = 0.2;

        let candidates = engine.evaluate(&snapshot, &target());
        assert_eq!(candidates.len(), 5);
    }

    #[test]
    fn test_error_snapshot_yields_no_candidates() {
        let engine = engine();
        let snapshot = MetricSnapshot::failed("prod-admin", "timeout");

        assert!(engine.evaluate(&snapshot, &target()).is_empty());
    }

    #[tokio::test]
    async fn test_dedup_invariant_only_first_persisted() {
        let engine = engine();
        let snapshot = MetricSnapshot::new("prod-admin").with_health(65.0);

        let first = engine.evaluate(&snapshot, &target());
        let survivors = engine.process(first).await;
        assert_eq!(survivors.len(), 1);

        // 去重窗口内同指纹只保留第一条
        let second = engine.evaluate(&snapshot, &target());
        let survivors = engine.process(second).await;
        assert!(survivors.is_empty());

        assert_eq!(engine.store().len().await, 1);
    }

    #[tokio::test]
    async fn test_maintenance_invariant_never_persisted() {
        let engine = engine_with(SuppressionConfig {
            maintenance: vec![MaintenanceRule {
                levels: vec![AlertLevel::Critical],
                windows: vec!["00:00-23:59".to_string()],
            }],
            ..Default::default()
        });

        let snapshot = MetricSnapshot::new("prod-admin").with_health(65.0);
        let candidates = engine.evaluate(&snapshot, &target());
        let survivors = engine.process(candidates).await;

        assert!(survivors.is_empty());
        assert!(engine.store().is_empty().await);
    }

    #[tokio::test]
    async fn test_process_arms_escalation_and_sends_immediate() {
        let engine = engine();
        let snapshot = MetricSnapshot::new("prod-admin").with_health(65.0);

        let survivors = engine.process(engine.evaluate(&snapshot, &target())).await;
        assert_eq!(survivors.len(), 1);

        let record = engine.store().get(&survivors[0].id).await.unwrap();
        // 立即阶段通过 email 渠道投递成功（chat 未注册）
        assert_eq!(record.notifications_sent.len(), 1);
        assert_eq!(record.notifications_sent[0].stage, "immediate");
        assert_eq!(record.notifications_sent[0].channel, "email");
    }

    #[tokio::test]
    async fn test_acknowledge_unknown_id() {
        let engine = engine();

        let snapshot = MetricSnapshot::new("prod-admin").with_health(65.0);
        engine.process(engine.evaluate(&snapshot, &target())).await;
        let before = engine.store().len().await;

        assert!(!engine.acknowledge("does-not-exist").await);
        assert_eq!(engine.store().len().await, before);
        assert_eq!(engine.store().active().await.len(), 1);
    }

    #[tokio::test]
    async fn test_acknowledge_and_resolve() {
        let engine = engine();

        let snapshot = MetricSnapshot::new("prod-admin").with_health(65.0);
        let survivors = engine.process(engine.evaluate(&snapshot, &target())).await;
        let id = survivors[0].id.clone();

        assert!(engine.acknowledge(&id).await);
        let record = engine.store().get(&id).await.unwrap();
        assert_eq!(record.status, AlertStatus::Acknowledged);
        assert!(record.acknowledged_at.is_some());

        assert!(engine.resolve(&id, "deployed a fix").await);
        let record = engine.store().get(&id).await.unwrap();
        assert_eq!(record.status, AlertStatus::Resolved);
        assert_eq!(record.resolution.as_deref(), Some("deployed a fix"));
    }
}
