use crate::model::{AlertLevel, AlertRecord, AlertStatus};
use chrono::{DateTime, Duration, Utc};
use pulse_storage::KvStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::warn;

/// 最近 24 小时告警汇总
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertSummary {
    pub total: usize,
    pub critical: usize,
    pub warning: usize,
    pub info: usize,
    pub active: usize,
    pub acknowledged: usize,
    pub resolved: usize,
    /// 最近 10 条（新在前）
    pub recent: Vec<AlertRecord>,
}

/// 告警存储
///
/// 按插入顺序保存，超出上限时先裁剪最旧的记录；
/// 可选地以尽力而为的方式镜像到键值存储。
pub struct AlertStore {
    records: Arc<RwLock<Vec<AlertRecord>>>,
    max_history: usize,
    kv: Option<Arc<dyn KvStore>>,
}

impl AlertStore {
    pub fn new(max_history: usize) -> Self {
        Self {
            records: Arc::new(RwLock::new(Vec::new())),
            max_history,
            kv: None,
        }
    }

    pub fn with_kv(mut self, kv: Arc<dyn KvStore>) -> Self {
        self.kv = Some(kv);
        self
    }

    /// 追加一条记录
    pub async fn insert(&self, record: AlertRecord) {
        {
            let mut records = self.records.write().await;
            records.push(record.clone());

            if records.len() > self.max_history {
                let excess = records.len() - self.max_history;
                records.drain(0..excess);
            }
        }

        self.mirror(&record).await;

        if let Some(kv) = &self.kv {
            if let Ok(value) = serde_json::to_value(&record) {
                if let Err(e) = kv.append_to_list("alerts:log", value, self.max_history).await {
                    warn!(error = %e, "Failed to append alert to persistent log");
                }
            }
        }
    }

    /// 按 ID 查找
    pub async fn get(&self, id: &str) -> Option<AlertRecord> {
        let records = self.records.read().await;
        records.iter().find(|r| r.id == id).cloned()
    }

    /// 按 ID 更新；未找到返回 false，不做任何写入
    pub async fn update<F>(&self, id: &str, mutate: F) -> bool
    where
        F: FnOnce(&mut AlertRecord),
    {
        let updated = {
            let mut records = self.records.write().await;
            match records.iter_mut().find(|r| r.id == id) {
                Some(record) => {
                    mutate(record);
                    Some(record.clone())
                }
                None => None,
            }
        };

        match updated {
            Some(record) => {
                self.mirror(&record).await;
                true
            }
            None => false,
        }
    }

    /// 当前活跃告警
    pub async fn active(&self) -> Vec<AlertRecord> {
        let records = self.records.read().await;
        records
            .iter()
            .filter(|r| r.status == AlertStatus::Active)
            .cloned()
            .collect()
    }

    /// 最近 limit 条（新在前）
    pub async fn recent(&self, limit: usize) -> Vec<AlertRecord> {
        let records = self.records.read().await;
        records.iter().rev().take(limit).cloned().collect()
    }

    /// 最近 24 小时按级别/状态汇总
    pub async fn summary(&self, now: DateTime<Utc>) -> AlertSummary {
        let cutoff = now - Duration::hours(24);
        let records = self.records.read().await;

        let window: Vec<&AlertRecord> = records.iter().filter(|r| r.created_at > cutoff).collect();

        let count_level =
            |level: AlertLevel| window.iter().filter(|r| r.level == level).count();
        let count_status =
            |status: AlertStatus| window.iter().filter(|r| r.status == status).count();

        AlertSummary {
            total: window.len(),
            critical: count_level(AlertLevel::Critical),
            warning: count_level(AlertLevel::Warning),
            info: count_level(AlertLevel::Info),
            active: count_status(AlertStatus::Active),
            acknowledged: count_status(AlertStatus::Acknowledged),
            resolved: count_status(AlertStatus::Resolved),
            recent: window.iter().rev().take(10).map(|r| (*r).clone()).collect(),
        }
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn mirror(&self, record: &AlertRecord) {
        if let Some(kv) = &self.kv {
            match serde_json::to_value(record) {
                Ok(value) => {
                    if let Err(e) = kv.put(&format!("alert:{}", record.id), value).await {
                        warn!(alert_id = %record.id, error = %e, "Failed to mirror alert record");
                    }
                }
                Err(e) => warn!(alert_id = %record.id, error = %e, "Failed to serialize alert record"),
            }
        }
    }
}
