use chrono::Utc;
use pulse_alert::{AlertEngine, AlertStore, AlertSummary, EscalationScheduler, SuppressionEvaluator};
use pulse_config::MonitorConfig;
use pulse_history::MetricSeriesStore;
use pulse_notify::{ChatWebhookChannel, EmailChannel, EscalationEmailChannel, NotifyManager};
use pulse_probe::Probe;
use pulse_schedule::{CadenceScheduler, ScheduleStatus};
use pulse_storage::{KvStore, MemoryStore};
use pulse_trend::TrendEngine;
use pulse_types::{MetricSnapshot, MonitoringRun, RunKind};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// 编排器状态
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorStatus {
    pub running: bool,
    pub schedules: Vec<ScheduleStatus>,
    pub alerts: AlertSummary,
}

/// 监控编排器
///
/// 自持全部组件并单向注入：引擎之间不互相引用，结果只通过返回值
/// 流动。探测 → 历史追加 + 告警处理 → 趋势分析。
pub struct Orchestrator {
    config: MonitorConfig,
    scheduler: Arc<CadenceScheduler>,
    history: Arc<MetricSeriesStore>,
    alert_engine: Arc<AlertEngine>,
    trend_engine: Arc<TrendEngine>,
    escalation: Arc<EscalationScheduler>,
    probe: Arc<dyn Probe>,
    kv: Arc<dyn KvStore>,
    running: AtomicBool,
    escalation_pump: Mutex<Option<JoinHandle<()>>>,
}

impl Orchestrator {
    pub fn new(config: MonitorConfig, probe: Arc<dyn Probe>) -> pulse_core::Result<Self> {
        let kv: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        let history = Arc::new(MetricSeriesStore::new(config.history.retention_policy()));

        let mut notifier = NotifyManager::new();
        notifier.register(Box::new(EmailChannel::new(
            config.notifications.email_recipients.clone(),
        )));
        if let Some(webhook_url) = &config.notifications.chat_webhook_url {
            notifier.register(Box::new(ChatWebhookChannel::new(webhook_url.clone())));
        }
        notifier.register(Box::new(EscalationEmailChannel::new(
            config.notifications.email_recipients.clone(),
            config.notifications.escalation_recipients.clone(),
        )));
        let notifier = Arc::new(notifier);

        let store = Arc::new(
            AlertStore::new(config.history.alert_history_cap).with_kv(kv.clone()),
        );
        let escalation = Arc::new(EscalationScheduler::new(
            config.escalation.clone(),
            notifier.clone(),
            store.clone(),
        ));
        let suppression = SuppressionEvaluator::new(config.suppression.clone())?;
        let alert_engine = Arc::new(AlertEngine::new(
            config.thresholds.clone(),
            suppression,
            store,
            escalation.clone(),
            notifier,
        ));
        let trend_engine = Arc::new(TrendEngine::new(history.clone()));
        let scheduler = Arc::new(CadenceScheduler::new(config.maintenance.clone())?);

        Ok(Self {
            config,
            scheduler,
            history,
            alert_engine,
            trend_engine,
            escalation,
            probe,
            kv,
            running: AtomicBool::new(false),
            escalation_pump: Mutex::new(None),
        })
    }

    /// 注册节奏并启动调度
    pub async fn start(self: &Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Orchestrator is already running");
            return;
        }

        info!("Starting monitoring orchestrator");

        let cadences = [
            (RunKind::Quick, &self.config.schedules.quick),
            (RunKind::Comprehensive, &self.config.schedules.comprehensive),
            (RunKind::Deep, &self.config.schedules.deep),
        ];

        for (kind, entry) in cadences {
            if !entry.enabled {
                continue;
            }

            let orchestrator = self.clone();
            self.scheduler
                .register(
                    kind.as_str(),
                    Duration::from_secs(entry.interval_minutes * 60),
                    entry.targets.clone(),
                    move |targets| {
                        let orchestrator = orchestrator.clone();
                        async move {
                            orchestrator.run_cycle(kind, targets).await?;
                            Ok(())
                        }
                    },
                )
                .await;
        }

        self.scheduler.start().await;

        // 升级泵独立于调度器生命周期：stop() 不撤销已安排的升级
        let mut pump = self.escalation_pump.lock().await;
        if pump.is_none() {
            *pump = Some(self.escalation.clone().spawn_pump(Duration::from_secs(1)));
        }

        info!("Monitoring orchestrator started");
    }

    /// 停止调度；在途回调收尾，已安排的升级照常触发
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            warn!("Orchestrator is not running");
            return;
        }

        self.scheduler.stop().await;
        info!("Monitoring orchestrator stopped");
    }

    /// 执行一轮监控
    pub async fn run_cycle(
        &self,
        kind: RunKind,
        subset: Option<Vec<String>>,
    ) -> anyhow::Result<MonitoringRun> {
        let targets = self.config.select_targets(subset.as_deref());
        let mut run = MonitoringRun::begin(kind);

        info!(
            kind = kind.as_str(),
            session_id = %run.session_id,
            targets = targets.len(),
            "Monitoring cycle started"
        );

        for target in &targets {
            let snapshot = match self.probe.probe(target).await {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    // 瞬时探测失败：记录 error 快照，等下一个周期重试
                    error!(target_id = %target.id, error = %e, "Probe failed");
                    MetricSnapshot::failed(&target.id, e.to_string())
                }
            };

            self.history.append(snapshot.clone()).await;

            if snapshot.status.is_success() {
                let candidates = self.alert_engine.evaluate(&snapshot, target);
                if !candidates.is_empty() {
                    self.alert_engine.process(candidates).await;
                }
            }

            run.record(snapshot);
        }

        if kind == RunKind::Deep {
            self.run_trend_analysis(&targets).await;
        }

        run.finish();
        let summary = run.summary();
        info!(
            kind = kind.as_str(),
            session_id = %run.session_id,
            successful = summary.successful_targets,
            healthy = summary.healthy_targets,
            avg_health = summary.avg_health,
            "Monitoring cycle completed"
        );

        if let Ok(value) = serde_json::to_value(&run) {
            if let Err(e) = self.kv.append_to_list("runs:recent", value, 100).await {
                warn!(error = %e, "Failed to persist monitoring run");
            }
        }

        Ok(run)
    }

    /// 深度巡检的趋势阶段
    async fn run_trend_analysis(&self, targets: &[pulse_types::MonitoringTarget]) {
        for target in targets {
            let report = self.trend_engine.analyze(&target.id, 30).await;
            info!(
                target_id = %target.id,
                data_points = report.data_points,
                insights = report.insights.len(),
                recommendations = report.recommendations.len(),
                "Trend analysis completed"
            );
        }

        let ids: Vec<String> = targets.iter().map(|t| t.id.clone()).collect();
        let fleet = self.trend_engine.report(&ids, 7).await;

        if let Ok(value) = serde_json::to_value(&fleet) {
            if let Err(e) = self.kv.put("trends:latest", value).await {
                warn!(error = %e, "Failed to persist trend report");
            }
        }
    }

    /// 手动触发一轮监控
    pub async fn run_now(&self, kind: RunKind) -> anyhow::Result<MonitoringRun> {
        let subset = match kind {
            RunKind::Quick => self.config.schedules.quick.targets.clone(),
            RunKind::Comprehensive => self.config.schedules.comprehensive.targets.clone(),
            RunKind::Deep => self.config.schedules.deep.targets.clone(),
        };
        self.run_cycle(kind, subset).await
    }

    /// 调度与告警汇总
    pub async fn status(&self) -> OrchestratorStatus {
        OrchestratorStatus {
            running: self.running.load(Ordering::SeqCst),
            schedules: self.scheduler.status().await,
            alerts: self.alert_engine.store().summary(Utc::now()).await,
        }
    }

    /// 确认告警；未知 ID 返回 false
    pub async fn acknowledge(&self, alert_id: &str) -> bool {
        self.alert_engine.acknowledge(alert_id).await
    }

    /// 解决告警；未知 ID 返回 false
    pub async fn resolve(&self, alert_id: &str, note: &str) -> bool {
        self.alert_engine.resolve(alert_id, note).await
    }

    pub fn trend_engine(&self) -> &Arc<TrendEngine> {
        &self.trend_engine
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }
}
