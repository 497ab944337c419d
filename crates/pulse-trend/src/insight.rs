use crate::engine::TrendResult;
use crate::stats::{AnomalySeverity, TrendDirection};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 建议优先级
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

/// 指标洞察
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Insight {
    pub metric: String,
    pub findings: Vec<String>,
}

/// 运维建议
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub priority: Priority,
    pub category: String,
    pub metric: String,
    pub recommendation: String,
    pub actions: Vec<String>,
}

/// 按固定规则生成指标洞察
pub fn generate_insights(trends: &BTreeMap<String, TrendResult>) -> Vec<Insight> {
    let mut insights = Vec::new();

    for (metric, trend) in trends {
        if !trend.is_analyzed() || trend.data_points < 2 {
            continue;
        }

        let mut findings = Vec::new();

        if trend.trend_strength_pct > 70.0 {
            match trend.direction {
                TrendDirection::Improving => findings.push(format!(
                    "Strong improving trend in {} with {:.0}% consistency",
                    metric, trend.trend_strength_pct
                )),
                TrendDirection::Degrading => findings.push(format!(
                    "Concerning degrading trend in {} with {:.0}% consistency",
                    metric, trend.trend_strength_pct
                )),
                _ => {}
            }
        }

        let high_anomalies = trend
            .anomalies
            .iter()
            .filter(|a| a.severity == AnomalySeverity::High)
            .count();
        if high_anomalies > 0 {
            findings.push(format!(
                "{} high-severity anomalies detected in {}",
                high_anomalies, metric
            ));
        }

        if trend.volatility_pct > 20.0 {
            findings.push(format!(
                "High volatility ({:.1}%) detected in {}",
                trend.volatility_pct, metric
            ));
        }

        if let Some(vs_ideal) = trend.vs_ideal_pct {
            if vs_ideal > 20.0 {
                findings.push(format!("{} is {:.1}% worse than ideal", metric, vs_ideal));
            } else if vs_ideal < -10.0 {
                findings.push(format!(
                    "{} is {:.1}% better than ideal",
                    metric,
                    vs_ideal.abs()
                ));
            }
        }

        if !findings.is_empty() {
            insights.push(Insight {
                metric: metric.clone(),
                findings,
            });
        }
    }

    insights
}

/// 按固定阈值生成运维建议
pub fn generate_recommendations(trends: &BTreeMap<String, TrendResult>) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();

    if let Some(health) = trends.get("health") {
        if health.direction == TrendDirection::Degrading && health.trend_strength_pct > 60.0 {
            recommendations.push(Recommendation {
                priority: Priority::High,
                category: "health".to_string(),
                metric: "health".to_string(),
                recommendation:
                    "Health score is consistently declining - investigate root causes immediately"
                        .to_string(),
                actions: vec![
                    "Review recent deployments".to_string(),
                    "Check for resource exhaustion".to_string(),
                    "Analyze error patterns".to_string(),
                ],
            });
        }
    }

    if let Some(load_time) = trends.get("load_time") {
        if load_time.direction == TrendDirection::Degrading && load_time.trend_strength_pct > 50.0 {
            recommendations.push(Recommendation {
                priority: Priority::High,
                category: "performance".to_string(),
                metric: "load_time".to_string(),
                recommendation:
                    "Page load times are consistently increasing - performance optimization required"
                        .to_string(),
                actions: vec![
                    "Profile resource loading".to_string(),
                    "Optimize images and assets".to_string(),
                    "Consider CDN implementation".to_string(),
                ],
            });
        }
    }

    if let Some(errors) = trends.get("error_count") {
        if errors.direction == TrendDirection::Improving && errors.current > 0.0 {
            recommendations.push(Recommendation {
                priority: Priority::Medium,
                category: "reliability".to_string(),
                metric: "error_count".to_string(),
                recommendation:
                    "Error count is improving but still present - continue debugging efforts"
                        .to_string(),
                actions: vec![
                    "Review error logs".to_string(),
                    "Implement error tracking".to_string(),
                    "Harden failure paths".to_string(),
                ],
            });
        }
    }

    let volatile: Vec<String> = trends
        .iter()
        .filter(|(_, t)| t.volatility_pct > 25.0)
        .map(|(metric, _)| metric.clone())
        .collect();
    if !volatile.is_empty() {
        let joined = volatile.join(", ");
        recommendations.push(Recommendation {
            priority: Priority::Medium,
            category: "stability".to_string(),
            metric: joined.clone(),
            recommendation: format!(
                "High volatility detected in {} - investigate inconsistent performance",
                joined
            ),
            actions: vec![
                "Monitor external dependencies".to_string(),
                "Review caching strategies".to_string(),
                "Check for resource contention".to_string(),
            ],
        });
    }

    let concerning: Vec<String> = trends
        .iter()
        .filter(|(_, t)| {
            t.prediction.confidence > 70.0
                && t.prediction.predicted.is_some()
                && (t.prediction.slope > 100.0 || t.prediction.slope < -50.0)
        })
        .map(|(metric, _)| metric.clone())
        .collect();
    if !concerning.is_empty() {
        recommendations.push(Recommendation {
            priority: Priority::High,
            category: "predictive".to_string(),
            metric: concerning.join(", "),
            recommendation:
                "Predictive analysis indicates future performance issues - take preventive action"
                    .to_string(),
            actions: vec![
                "Schedule maintenance window".to_string(),
                "Prepare rollback plan".to_string(),
                "Increase monitoring frequency".to_string(),
            ],
        });
    }

    recommendations
}
