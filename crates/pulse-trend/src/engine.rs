use crate::insight::{generate_insights, generate_recommendations, Insight, Recommendation};
use crate::metrics::{performance_score, TrackedMetric, ALL_METRICS};
use crate::stats::{
    change_pct, detect_anomalies, mean, predict_next, stability_pct, trend_direction,
    trend_strength_pct, volatility_pct, Anomaly, Prediction, TrendDirection,
};
use chrono::{DateTime, Utc};
use pulse_history::MetricSeriesStore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// 单个指标的趋势分析结果
///
/// 每次分析都基于当前窗口全量重算，不做增量更新。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendResult {
    pub direction: TrendDirection,
    pub data_points: usize,
    pub current: f64,
    pub previous: f64,
    pub oldest: f64,
    pub average: f64,
    pub min: f64,
    pub max: f64,
    pub change_pct: f64,
    pub volatility_pct: f64,
    pub stability_pct: f64,
    pub trend_strength_pct: f64,
    pub anomalies: Vec<Anomaly>,
    pub prediction: Prediction,
    /// 相对理想值的偏差（百分比），无理想值时为 None
    pub vs_ideal_pct: Option<f64>,
}

impl TrendResult {
    /// 数据不足（少于 2 点）时的占位结果
    pub fn insufficient(data_points: usize) -> Self {
        Self {
            direction: TrendDirection::InsufficientData,
            data_points,
            current: 0.0,
            previous: 0.0,
            oldest: 0.0,
            average: 0.0,
            min: 0.0,
            max: 0.0,
            change_pct: 0.0,
            volatility_pct: 0.0,
            stability_pct: 0.0,
            trend_strength_pct: 0.0,
            anomalies: Vec::new(),
            prediction: Prediction {
                predicted: None,
                confidence: 0.0,
                trend: TrendDirection::InsufficientData,
                slope: 0.0,
            },
            vs_ideal_pct: None,
        }
    }

    pub fn is_analyzed(&self) -> bool {
        self.direction != TrendDirection::InsufficientData || self.data_points >= 2
    }
}

/// 数值序列分析
pub fn analyze_values(data: &[f64], ideal: Option<f64>) -> TrendResult {
    if data.len() < 2 {
        return TrendResult::insufficient(data.len());
    }

    let direction = trend_direction(data);
    let current = data[data.len() - 1];

    TrendResult {
        direction,
        data_points: data.len(),
        current,
        previous: data[data.len() - 2],
        oldest: data[0],
        average: mean(data),
        min: data.iter().cloned().fold(f64::INFINITY, f64::min),
        max: data.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
        change_pct: change_pct(data),
        volatility_pct: volatility_pct(data),
        stability_pct: stability_pct(data),
        trend_strength_pct: trend_strength_pct(data, direction),
        anomalies: detect_anomalies(data),
        prediction: predict_next(data),
        vs_ideal_pct: ideal.map(|ideal| (current / ideal - 1.0) * 100.0),
    }
}

/// 可靠性汇总
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reliability {
    /// 探测成功率（百分比）
    pub success_rate_pct: f64,

    /// 综合性能分序列的趋势
    pub trend: TrendDirection,
}

/// 数据质量估计
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataQuality {
    /// 有效数据点占比
    pub completeness_pct: f64,

    /// 各指标序列一致性（100 − 波动率的均值）
    pub consistency_pct: f64,
}

/// 目标级综合趋势
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverallTrend {
    pub health: TrendResult,
    pub performance: TrendResult,
    pub reliability: Reliability,
    pub data_quality: DataQuality,
}

/// 单目标趋势报告
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendReport {
    pub target_id: String,
    pub window_days: i64,
    pub data_points: usize,
    pub analyzed_at: DateTime<Utc>,
    /// 指标名 → 趋势结果
    pub trends: BTreeMap<String, TrendResult>,
    pub insights: Vec<Insight>,
    pub recommendations: Vec<Recommendation>,
    pub overall: Option<OverallTrend>,
}

/// 趋势引擎
///
/// 读取历史序列并产出分析结果；不持有对编排器的反向引用。
pub struct TrendEngine {
    history: Arc<MetricSeriesStore>,
}

impl TrendEngine {
    pub fn new(history: Arc<MetricSeriesStore>) -> Self {
        Self { history }
    }

    /// 分析单个目标在给定窗口内的全部指标
    pub async fn analyze(&self, target_id: &str, window_days: i64) -> TrendReport {
        let snapshots = self.history.window(target_id, window_days).await;

        let mut trends = BTreeMap::new();
        for metric in ALL_METRICS {
            let series: Vec<f64> = snapshots.iter().filter_map(|s| metric.extract(s)).collect();
            let result = if series.len() >= 2 {
                analyze_values(&series, Some(metric.ideal()))
            } else {
                TrendResult::insufficient(series.len())
            };
            trends.insert(metric.as_str().to_string(), result);
        }

        let insights = generate_insights(&trends);
        let recommendations = generate_recommendations(&trends);
        let overall = self.analyze_overall(&snapshots);

        debug!(
            target_id = %target_id,
            data_points = snapshots.len(),
            insights = insights.len(),
            "Trend analysis completed"
        );

        TrendReport {
            target_id: target_id.to_string(),
            window_days,
            data_points: snapshots.len(),
            analyzed_at: Utc::now(),
            trends,
            insights,
            recommendations,
            overall,
        }
    }

    fn analyze_overall(
        &self,
        snapshots: &[pulse_types::MetricSnapshot],
    ) -> Option<OverallTrend> {
        if snapshots.len() < 2 {
            return None;
        }

        let health_series: Vec<f64> = snapshots
            .iter()
            .filter_map(|s| TrackedMetric::Health.extract(s))
            .collect();
        let performance_series: Vec<f64> = snapshots
            .iter()
            .filter(|s| s.status.is_success())
            .map(performance_score)
            .collect();

        let successful = snapshots.iter().filter(|s| s.status.is_success()).count();
        let success_rate_pct = successful as f64 / snapshots.len() as f64 * 100.0;

        let consistency_pct = {
            let mut scores = Vec::new();
            for metric in ALL_METRICS {
                let series: Vec<f64> =
                    snapshots.iter().filter_map(|s| metric.extract(s)).collect();
                if series.len() >= 2 {
                    scores.push((100.0 - volatility_pct(&series)).max(0.0));
                }
            }
            if scores.is_empty() {
                100.0
            } else {
                mean(&scores)
            }
        };

        Some(OverallTrend {
            health: analyze_values(&health_series, Some(TrackedMetric::Health.ideal())),
            performance: analyze_values(&performance_series, Some(90.0)),
            reliability: Reliability {
                success_rate_pct,
                trend: trend_direction(&performance_series),
            },
            data_quality: DataQuality {
                completeness_pct: success_rate_pct,
                consistency_pct,
            },
        })
    }

    /// 跨目标汇总报告
    pub async fn report(&self, target_ids: &[String], window_days: i64) -> FleetTrendReport {
        let mut targets = Vec::new();
        for target_id in target_ids {
            targets.push(self.analyze(target_id, window_days).await);
        }

        let summary = FleetSummary::from_reports(&targets);
        info!(
            targets = targets.len(),
            insights = summary.insights,
            recommendations = summary.recommendations,
            "Fleet trend report generated"
        );

        FleetTrendReport {
            report_id: uuid::Uuid::new_v4().to_string(),
            generated_at: Utc::now(),
            window_days,
            targets,
            summary,
        }
    }
}

/// 整体健康评级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthGrade {
    Excellent,
    Good,
    Fair,
    Poor,
    Unknown,
}

/// 跨目标汇总
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetSummary {
    pub total_targets: usize,
    pub analyzed_targets: usize,
    pub data_points: usize,
    pub insights: usize,
    pub recommendations: usize,
    pub improving: usize,
    pub degrading: usize,
    pub stable: usize,
    pub overall_health: HealthGrade,
}

impl FleetSummary {
    fn from_reports(reports: &[TrendReport]) -> Self {
        let analyzed: Vec<&TrendReport> =
            reports.iter().filter(|r| r.data_points >= 2).collect();

        let mut improving = 0;
        let mut degrading = 0;
        let mut stable = 0;
        for report in &analyzed {
            if let Some(overall) = &report.overall {
                match overall.health.direction {
                    TrendDirection::Improving => improving += 1,
                    TrendDirection::Degrading => degrading += 1,
                    TrendDirection::Stable => stable += 1,
                    TrendDirection::InsufficientData => {}
                }
            }
        }

        let health_means: Vec<f64> = analyzed
            .iter()
            .filter_map(|r| r.trends.get("health"))
            .filter(|t| t.data_points >= 2)
            .map(|t| t.average)
            .collect();

        let overall_health = if health_means.is_empty() {
            HealthGrade::Unknown
        } else {
            let avg = mean(&health_means);
            if avg >= 90.0 {
                HealthGrade::Excellent
            } else if avg >= 80.0 {
                HealthGrade::Good
            } else if avg >= 70.0 {
                HealthGrade::Fair
            } else {
                HealthGrade::Poor
            }
        };

        Self {
            total_targets: reports.len(),
            analyzed_targets: analyzed.len(),
            data_points: reports.iter().map(|r| r.data_points).sum(),
            insights: reports.iter().map(|r| r.insights.len()).sum(),
            recommendations: reports.iter().map(|r| r.recommendations.len()).sum(),
            improving,
            degrading,
            stable,
            overall_health,
        }
    }
}

/// 跨目标趋势报告
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetTrendReport {
    pub report_id: String,
    pub generated_at: DateTime<Utc>,
    pub window_days: i64,
    pub targets: Vec<TrendReport>,
    pub summary: FleetSummary,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_history::RetentionPolicy;
    use pulse_types::MetricSnapshot;

    async fn store_with_health(target_id: &str, values: &[f64]) -> Arc<MetricSeriesStore> {
        let store = Arc::new(MetricSeriesStore::new(RetentionPolicy::default()));
        for (i, health) in values.iter().enumerate() {
            let mut snapshot = MetricSnapshot::new(target_id).with_health(*health);
            snapshot.timestamp = Utc::now() - chrono::Duration::minutes((values.len() - i) as i64);
            snapshot.load_time_ms = 1500.0;
            snapshot.first_contentful_paint_ms = 800.0;
            snapshot.accessibility_score = 95.0;
            store.append(snapshot).await;
        }
        store
    }

    #[tokio::test]
    async fn test_analyze_improving_health() {
        let values: Vec<f64> = (0..10).map(|i| 60.0 + i as f64 * 4.0).collect();
        let store = store_with_health("prod-admin", &values).await;
        let engine = TrendEngine::new(store);

        let report = engine.analyze("prod-admin", 30).await;
        let health = report.trends.get("health").unwrap();

        assert_eq!(health.direction, TrendDirection::Improving);
        assert_eq!(health.trend_strength_pct, 100.0);
        assert!(health.anomalies.is_empty());
        assert_eq!(health.data_points, 10);
    }

    #[tokio::test]
    async fn test_analyze_insufficient_data() {
        let store = store_with_health("prod-admin", &[85.0]).await;
        let engine = TrendEngine::new(store);

        let report = engine.analyze("prod-admin", 30).await;
        let health = report.trends.get("health").unwrap();

        assert_eq!(health.direction, TrendDirection::InsufficientData);
        assert!(report.overall.is_none());
    }

    #[tokio::test]
    async fn test_overall_reliability_counts_error_snapshots() {
        let store = store_with_health("prod-admin", &[90.0, 88.0, 86.0]).await;
        store
            .append(MetricSnapshot::failed("prod-admin", "timeout"))
            .await;
        let engine = TrendEngine::new(store);

        let report = engine.analyze("prod-admin", 30).await;
        let overall = report.overall.unwrap();

        assert_eq!(overall.reliability.success_rate_pct, 75.0);
        assert_eq!(overall.data_quality.completeness_pct, 75.0);
    }

    #[tokio::test]
    async fn test_fleet_report_summary() {
        let store = store_with_health("prod-admin", &[92.0, 93.0, 94.0, 95.0, 96.0]).await;
        let engine = TrendEngine::new(store);

        let report = engine
            .report(&["prod-admin".to_string(), "missing".to_string()], 30)
            .await;

        assert_eq!(report.summary.total_targets, 2);
        assert_eq!(report.summary.analyzed_targets, 1);
        assert_eq!(report.summary.overall_health, HealthGrade::Excellent);
        assert_eq!(report.summary.improving, 1);
    }
}
