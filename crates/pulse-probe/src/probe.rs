use async_trait::async_trait;
use pulse_types::{MetricSnapshot, MonitoringTarget};

/// 探测接口
///
/// 真实实现（浏览器自动化/网络抓取）在系统边界之外；
/// 调用方负责捕获失败并记录为 error 快照。
#[async_trait]
pub trait Probe: Send + Sync {
    async fn probe(&self, target: &MonitoringTarget) -> anyhow::Result<MetricSnapshot>;
}
