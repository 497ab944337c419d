use crate::model::{AlertLevel, AlertRecord, NotificationEntry};
use crate::store::AlertStore;
use chrono::{DateTime, Duration, Utc};
use pulse_notify::{NotifyLevel, NotifyManager, NotifyMessage};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// 升级阶段
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationStage {
    /// 阶段名
    pub name: String,

    /// 距告警创建的延迟（秒）
    pub delay_secs: i64,

    /// 本阶段使用的通知渠道
    pub channels: Vec<String>,

    /// 额外收件人
    pub additional_recipients: Vec<String>,
}

/// 升级策略
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationPolicy {
    /// 是否启用
    pub enabled: bool,

    /// 阶段列表，第一个为立即阶段
    pub stages: Vec<EscalationStage>,
}

impl EscalationPolicy {
    /// 立即阶段（持久化后立刻发送）
    pub fn immediate_stage(&self) -> Option<&EscalationStage> {
        self.stages.first()
    }

    /// 立即阶段之后的延迟阶段
    pub fn deferred_stages(&self) -> &[EscalationStage] {
        if self.stages.is_empty() {
            &[]
        } else {
            &self.stages[1..]
        }
    }
}

impl Default for EscalationPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            stages: vec![
                EscalationStage {
                    name: "immediate".to_string(),
                    delay_secs: 0,
                    channels: vec!["email".to_string(), "chat".to_string()],
                    additional_recipients: Vec::new(),
                },
                EscalationStage {
                    name: "followup".to_string(),
                    delay_secs: 300,
                    channels: vec!["email".to_string(), "chat".to_string()],
                    additional_recipients: Vec::new(),
                },
                EscalationStage {
                    name: "escalation".to_string(),
                    delay_secs: 1800,
                    channels: vec![
                        "email".to_string(),
                        "chat".to_string(),
                        "escalation-email".to_string(),
                    ],
                    additional_recipients: vec!["manager@example.com".to_string()],
                },
            ],
        }
    }
}

/// 待触发的升级任务
///
/// 每个延迟阶段一条独立任务，互不串联；确认或解决告警不会撤销任务。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationTask {
    pub alert_id: String,
    pub stage_name: String,
    pub fire_at: DateTime<Utc>,
    pub channels: Vec<String>,
    pub additional_recipients: Vec<String>,
}

/// 升级调度器
///
/// 所有任务进同一个定时队列，由一个泵循环消费。
pub struct EscalationScheduler {
    policy: EscalationPolicy,
    queue: Arc<RwLock<Vec<EscalationTask>>>,
    notifier: Arc<NotifyManager>,
    store: Arc<AlertStore>,
}

impl EscalationScheduler {
    pub fn new(policy: EscalationPolicy, notifier: Arc<NotifyManager>, store: Arc<AlertStore>) -> Self {
        Self {
            policy,
            queue: Arc::new(RwLock::new(Vec::new())),
            notifier,
            store,
        }
    }

    pub fn policy(&self) -> &EscalationPolicy {
        &self.policy
    }

    /// 为一条告警安排全部延迟阶段
    pub async fn arm(&self, record: &AlertRecord) {
        if !self.policy.enabled {
            return;
        }

        let mut queue = self.queue.write().await;
        for stage in self.policy.deferred_stages() {
            queue.push(EscalationTask {
                alert_id: record.id.clone(),
                stage_name: stage.name.clone(),
                fire_at: record.created_at + Duration::seconds(stage.delay_secs),
                channels: stage.channels.clone(),
                additional_recipients: stage.additional_recipients.clone(),
            });
        }

        debug!(
            alert_id = %record.id,
            stages = self.policy.deferred_stages().len(),
            "Escalation stages armed"
        );
    }

    /// 当前待触发任务快照
    pub async fn pending(&self) -> Vec<EscalationTask> {
        self.queue.read().await.clone()
    }

    /// 触发所有到期任务，返回触发条数
    ///
    /// 任务内的失败只记录日志，不中断其余任务。
    pub async fn fire_due(&self, now: DateTime<Utc>) -> usize {
        let due: Vec<EscalationTask> = {
            let mut queue = self.queue.write().await;
            let (ready, pending): (Vec<_>, Vec<_>) =
                queue.drain(..).partition(|t| t.fire_at <= now);
            *queue = pending;
            ready
        };

        let fired = due.len();
        for task in due {
            if let Err(e) = self.fire(&task).await {
                error!(alert_id = %task.alert_id, stage = %task.stage_name, error = %e, "Escalation failed");
            }
        }

        fired
    }

    async fn fire(&self, task: &EscalationTask) -> anyhow::Result<()> {
        let Some(record) = self.store.get(&task.alert_id).await else {
            warn!(alert_id = %task.alert_id, "Alert record missing, escalation skipped");
            return Ok(());
        };

        info!(
            alert_id = %task.alert_id,
            stage = %task.stage_name,
            "Escalating alert"
        );

        // 已解决的告警照样升级：队列没有撤销路径
        let message = build_message(&record, &task.stage_name)
            .with_additional_recipients(task.additional_recipients.clone());

        let delivered = self.notifier.dispatch(&task.channels, &message).await;

        let now = Utc::now();
        let stage = task.stage_name.clone();
        self.store
            .update(&task.alert_id, |r| {
                r.escalation_level += 1;
                r.notifications_sent
                    .extend(delivered.iter().map(|channel| NotificationEntry {
                        channel: channel.clone(),
                        stage: stage.clone(),
                        timestamp: now,
                    }));
            })
            .await;

        Ok(())
    }

    /// 启动泵循环，按 tick 间隔消费到期任务
    pub fn spawn_pump(self: Arc<Self>, tick: std::time::Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(tick);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                self.fire_due(Utc::now()).await;
            }
        })
    }
}

fn build_message(record: &AlertRecord, stage: &str) -> NotifyMessage {
    let level = match record.level {
        AlertLevel::Critical => NotifyLevel::Critical,
        AlertLevel::Warning => NotifyLevel::Warning,
        AlertLevel::Info => NotifyLevel::Info,
    };

    let title = format!(
        "[{}] {} alert: {} ({})",
        stage,
        record.level.as_str(),
        record.alert_type.as_str(),
        record.target.name
    );
    let content = format!(
        "{}\n\nTarget: {} ({})\nURL: {}\nCurrent: {}\nThreshold: {}\nAlert ID: {}",
        record.message,
        record.target.name,
        record.target.environment.as_str(),
        record.target.url,
        record.detail.current,
        record.detail.threshold,
        record.id
    );

    NotifyMessage::new(title, content, level)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AlertCandidate, AlertDetail, AlertStatus, AlertType, TargetRef};
    use pulse_notify::EmailChannel;
    use pulse_types::Environment;

    fn new_record() -> AlertRecord {
        AlertRecord::from_candidate(AlertCandidate::new(
            AlertLevel::Critical,
            AlertType::HealthScore,
            "health 62 below 70",
            TargetRef {
                id: "prod-admin".to_string(),
                name: "Production Admin".to_string(),
                url: "https://example.com/admin".to_string(),
                environment: Environment::Production,
            },
            AlertDetail {
                current: 62.0,
                threshold: 70.0,
            },
        ))
    }

    fn scheduler(store: Arc<AlertStore>) -> EscalationScheduler {
        let mut manager = NotifyManager::new();
        manager.register(Box::new(EmailChannel::new(vec![
            "admin@example.com".to_string(),
        ])));
        EscalationScheduler::new(EscalationPolicy::default(), Arc::new(manager), store)
    }

    #[tokio::test]
    async fn test_arm_queues_deferred_stages_only() {
        let store = Arc::new(AlertStore::new(100));
        let scheduler = scheduler(store.clone());

        let record = new_record();
        store.insert(record.clone()).await;
        scheduler.arm(&record).await;

        let pending = scheduler.pending().await;
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].stage_name, "followup");
        assert_eq!(pending[1].stage_name, "escalation");
        assert_eq!(
            pending[0].fire_at,
            record.created_at + Duration::seconds(300)
        );
        assert_eq!(
            pending[1].fire_at,
            record.created_at + Duration::seconds(1800)
        );
    }

    #[tokio::test]
    async fn test_each_stage_fires_exactly_once() {
        let store = Arc::new(AlertStore::new(100));
        let scheduler = scheduler(store.clone());

        let record = new_record();
        let id = record.id.clone();
        store.insert(record.clone()).await;
        scheduler.arm(&record).await;

        // 未到期不触发
        assert_eq!(scheduler.fire_due(record.created_at).await, 0);

        // followup 到期
        let fired = scheduler
            .fire_due(record.created_at + Duration::seconds(301))
            .await;
        assert_eq!(fired, 1);
        assert_eq!(scheduler.pending().await.len(), 1);

        // escalation 到期；再次推进不会重复触发
        let fired = scheduler
            .fire_due(record.created_at + Duration::seconds(1801))
            .await;
        assert_eq!(fired, 1);
        assert_eq!(
            scheduler
                .fire_due(record.created_at + Duration::seconds(3600))
                .await,
            0
        );

        let updated = store.get(&id).await.unwrap();
        assert_eq!(updated.escalation_level, 2);
        assert_eq!(updated.notifications_sent.len(), 2);
        assert_eq!(updated.notifications_sent[0].stage, "followup");
        assert_eq!(updated.notifications_sent[1].stage, "escalation");
    }

    #[tokio::test]
    async fn test_escalation_survives_resolution() {
        let store = Arc::new(AlertStore::new(100));
        let scheduler = scheduler(store.clone());

        let record = new_record();
        let id = record.id.clone();
        store.insert(record.clone()).await;
        scheduler.arm(&record).await;

        store
            .update(&id, |r| {
                r.status = AlertStatus::Resolved;
                r.resolved_at = Some(Utc::now());
            })
            .await;

        // 解决后的告警仍会收到升级通知
        let fired = scheduler
            .fire_due(record.created_at + Duration::seconds(1801))
            .await;
        assert_eq!(fired, 2);

        let updated = store.get(&id).await.unwrap();
        assert_eq!(updated.escalation_level, 2);
        assert_eq!(updated.status, AlertStatus::Resolved);
    }

    #[tokio::test]
    async fn test_disabled_policy_arms_nothing() {
        let store = Arc::new(AlertStore::new(100));
        let mut manager = NotifyManager::new();
        manager.register(Box::new(EmailChannel::new(Vec::new())));

        let scheduler = EscalationScheduler::new(
            EscalationPolicy {
                enabled: false,
                ..Default::default()
            },
            Arc::new(manager),
            store.clone(),
        );

        let record = new_record();
        scheduler.arm(&record).await;
        assert!(scheduler.pending().await.is_empty());
    }

    #[tokio::test]
    async fn test_missing_record_is_skipped() {
        let store = Arc::new(AlertStore::new(100));
        let scheduler = scheduler(store.clone());

        let record = new_record();
        scheduler.arm(&record).await;

        // 记录不存在时任务被消费但不报错
        let fired = scheduler
            .fire_due(record.created_at + Duration::seconds(3600))
            .await;
        assert_eq!(fired, 2);
        assert!(scheduler.pending().await.is_empty());
    }
}
