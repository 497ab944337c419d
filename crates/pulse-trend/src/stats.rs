//! 序列统计
//!
//! 趋势方向有两套算法：`trend_direction` 基于最小二乘斜率，
//! `quick_trend` 只比较首尾两点（5% 相对变化阈值）。两者语义不同，
//! 分别服务于完整分析与只有少量数据点时的单遍分类，不要合并。

use serde::{Deserialize, Serialize};

/// 趋势方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Improving,
    Degrading,
    Stable,
    InsufficientData,
}

impl TrendDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendDirection::Improving => "improving",
            TrendDirection::Degrading => "degrading",
            TrendDirection::Stable => "stable",
            TrendDirection::InsufficientData => "insufficient_data",
        }
    }
}

/// 异常严重度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnomalySeverity {
    Medium,
    High,
}

/// 偏离序列均值超过 2σ 的数据点
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Anomaly {
    /// 序列下标
    pub index: usize,

    /// 数据值
    pub value: f64,

    /// 偏离均值的 σ 倍数
    pub deviation: f64,

    /// 严重度（超过 3σ 为 high）
    pub severity: AnomalySeverity,
}

/// 下一点预测
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    /// 预测值（数据不足时为 None）
    pub predicted: Option<f64>,

    /// 置信度（0-100，取整）
    pub confidence: f64,

    /// 回归趋势
    pub trend: TrendDirection,

    /// 回归斜率
    pub slope: f64,
}

pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// 总体标准差
pub fn std_dev(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let m = mean(data);
    let variance = data.iter().map(|v| (v - m).powi(2)).sum::<f64>() / data.len() as f64;
    variance.sqrt()
}

/// 对下标做最小二乘回归，返回 (斜率, 截距)
pub fn linear_regression(data: &[f64]) -> (f64, f64) {
    let n = data.len() as f64;
    if data.len() < 2 {
        return (0.0, data.first().copied().unwrap_or(0.0));
    }

    let sum_x: f64 = (0..data.len()).map(|i| i as f64).sum();
    let sum_y: f64 = data.iter().sum();
    let sum_xy: f64 = data.iter().enumerate().map(|(i, y)| i as f64 * y).sum();
    let sum_xx: f64 = (0..data.len()).map(|i| (i as f64).powi(2)).sum();

    let slope = (n * sum_xy - sum_x * sum_y) / (n * sum_xx - sum_x * sum_x);
    let intercept = (sum_y - slope * sum_x) / n;

    (slope, intercept)
}

/// 回归斜率趋势分类
pub fn trend_direction(data: &[f64]) -> TrendDirection {
    if data.len() < 3 {
        return TrendDirection::InsufficientData;
    }

    let (slope, _) = linear_regression(data);

    if slope.abs() < 0.01 {
        TrendDirection::Stable
    } else if slope > 0.0 {
        TrendDirection::Improving
    } else {
        TrendDirection::Degrading
    }
}

/// 首尾两点的粗粒度趋势分类（5% 相对变化阈值）
pub fn quick_trend(data: &[f64]) -> TrendDirection {
    if data.len() < 2 {
        return TrendDirection::InsufficientData;
    }

    let first = data[0];
    let last = data[data.len() - 1];
    let change = (last - first) / first * 100.0;

    if change.abs() < 5.0 {
        TrendDirection::Stable
    } else if change > 0.0 {
        TrendDirection::Improving
    } else {
        TrendDirection::Degrading
    }
}

/// 最近两点的百分比变化
pub fn change_pct(data: &[f64]) -> f64 {
    if data.len() < 2 {
        return 0.0;
    }
    let current = data[data.len() - 1];
    let previous = data[data.len() - 2];
    (current - previous) / previous * 100.0
}

/// 波动率：变异系数（总体标准差 / 均值），百分比
pub fn volatility_pct(data: &[f64]) -> f64 {
    if data.len() < 2 {
        return 0.0;
    }
    std_dev(data) / mean(data) * 100.0
}

/// 稳定性：最近 5 点均值相对其余部分均值的漂移的反数
pub fn stability_pct(data: &[f64]) -> f64 {
    if data.len() < 2 {
        return 0.0;
    }

    let split = data.len().saturating_sub(5);
    let (older, recent) = data.split_at(split);

    if older.is_empty() {
        return 100.0;
    }

    let change = ((mean(recent) - mean(older)) / mean(older)).abs() * 100.0;
    (100.0 - change).max(0.0)
}

/// 趋势强度：相邻步进与方向一致的占比（百分比）
///
/// stable 方向下，步进小于前值 1% 视为一致。
pub fn trend_strength_pct(data: &[f64], direction: TrendDirection) -> f64 {
    if data.len() < 3 {
        return 0.0;
    }

    let mut consistent = 0usize;
    let mut total = 0usize;

    for pair in data.windows(2) {
        let change = pair[1] - pair[0];
        let matches = match direction {
            TrendDirection::Improving => change > 0.0,
            TrendDirection::Degrading => change < 0.0,
            TrendDirection::Stable => change.abs() < 0.01 * pair[0],
            TrendDirection::InsufficientData => false,
        };
        if matches {
            consistent += 1;
        }
        total += 1;
    }

    consistent as f64 / total as f64 * 100.0
}

/// 异常检测：偏离均值超过 2σ；超过 3σ 为 high
pub fn detect_anomalies(data: &[f64]) -> Vec<Anomaly> {
    if data.len() < 5 {
        return Vec::new();
    }

    let m = mean(data);
    let sd = std_dev(data);
    if sd == 0.0 {
        return Vec::new();
    }

    data.iter()
        .enumerate()
        .filter(|(_, v)| (*v - m).abs() > 2.0 * sd)
        .map(|(index, v)| {
            let distance = (v - m).abs();
            Anomaly {
                index,
                value: *v,
                deviation: distance / sd,
                severity: if distance > 3.0 * sd {
                    AnomalySeverity::High
                } else {
                    AnomalySeverity::Medium
                },
            }
        })
        .collect()
}

/// 线性外推下一点
///
/// 置信度 = clamp(50 + 0.3·强度 − 0.2·波动率, 0, 100)，四舍五入。
pub fn predict_next(data: &[f64]) -> Prediction {
    if data.len() < 3 {
        return Prediction {
            predicted: None,
            confidence: 0.0,
            trend: TrendDirection::InsufficientData,
            slope: 0.0,
        };
    }

    let (slope, intercept) = linear_regression(data);
    let predicted = slope * data.len() as f64 + intercept;

    let trend = trend_direction(data);
    let strength = trend_strength_pct(data, trend);
    let volatility = volatility_pct(data);

    let confidence = (50.0 + 0.3 * strength - 0.2 * volatility).clamp(0.0, 100.0);

    Prediction {
        predicted: Some((predicted * 100.0).round() / 100.0),
        confidence: confidence.round(),
        trend,
        slope: (slope * 1000.0).round() / 1000.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monotonic_series_round_trip() {
        let data: Vec<f64> = (1..=10).map(|i| i as f64 * 10.0).collect();

        assert_eq!(trend_direction(&data), TrendDirection::Improving);
        assert_eq!(trend_strength_pct(&data, TrendDirection::Improving), 100.0);
        assert!(detect_anomalies(&data).is_empty());
    }

    #[test]
    fn test_flat_series_is_stable() {
        let data = vec![50.0; 8];
        assert_eq!(trend_direction(&data), TrendDirection::Stable);
        assert_eq!(volatility_pct(&data), 0.0);
    }

    #[test]
    fn test_quick_trend_five_percent_cutoff() {
        assert_eq!(quick_trend(&[100.0, 104.0]), TrendDirection::Stable);
        assert_eq!(quick_trend(&[100.0, 106.0]), TrendDirection::Improving);
        assert_eq!(quick_trend(&[100.0, 94.0]), TrendDirection::Degrading);
        assert_eq!(quick_trend(&[100.0]), TrendDirection::InsufficientData);
    }

    #[test]
    fn test_dual_algorithms_can_disagree() {
        // 首尾几乎持平但整体斜率向上：quick_trend 判稳，回归判升
        let data = vec![100.0, 108.0, 112.0, 116.0, 112.0, 108.0, 104.0];

        assert_eq!(quick_trend(&data), TrendDirection::Stable);
        assert_eq!(trend_direction(&data), TrendDirection::Improving);
    }

    #[test]
    fn test_anomaly_boundary_medium() {
        // 九个相同值加一个离群点：离群点恰好偏离 3.0σ
        let mut data = vec![50.0; 9];
        data.push(80.0);

        let anomalies = detect_anomalies(&data);
        assert_eq!(anomalies.len(), 1);
        assert_eq!(anomalies[0].index, 9);
        assert!((anomalies[0].deviation - 3.0).abs() < 1e-9);
        assert_eq!(anomalies[0].severity, AnomalySeverity::Medium);
    }

    #[test]
    fn test_anomaly_boundary_high() {
        // 更长的平坦基线把离群点推过 3σ（√10 ≈ 3.16σ）
        let mut data = vec![50.0; 10];
        data.push(80.0);

        let anomalies = detect_anomalies(&data);
        assert_eq!(anomalies.len(), 1);
        assert!(anomalies[0].deviation > 3.0);
        assert_eq!(anomalies[0].severity, AnomalySeverity::High);
    }

    #[test]
    fn test_stability_without_rest_is_full() {
        let data = vec![10.0, 11.0, 12.0];
        assert_eq!(stability_pct(&data), 100.0);
    }

    #[test]
    fn test_stability_penalizes_drift() {
        // 前段均值 10，后 5 点均值 20 → 漂移 100% → 稳定性 0
        let mut data = vec![10.0; 5];
        data.extend(vec![20.0; 5]);

        assert_eq!(stability_pct(&data), 0.0);
    }

    #[test]
    fn test_change_pct_uses_last_two_points() {
        let data = vec![100.0, 200.0, 100.0, 110.0];
        assert!((change_pct(&data) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_prediction_confidence_on_clean_linear_series() {
        // 高基数线性序列：波动率趋近于零，置信度取整后达到 80
        let data = vec![1000.0, 1001.0, 1002.0, 1003.0, 1004.0];

        let prediction = predict_next(&data);
        assert!(prediction.confidence >= 80.0);
        assert_eq!(prediction.trend, TrendDirection::Improving);
        assert!((prediction.predicted.unwrap() - 1005.0).abs() < 1e-6);
    }

    #[test]
    fn test_prediction_insufficient_data() {
        let prediction = predict_next(&[1.0, 2.0]);
        assert!(prediction.predicted.is_none());
        assert_eq!(prediction.confidence, 0.0);
        assert_eq!(prediction.trend, TrendDirection::InsufficientData);
    }

    #[test]
    fn test_volatility_is_cv_percentage() {
        // 均值 3，总体 σ = √2 → CV ≈ 47.14%
        let data = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        assert!((volatility_pct(&data) - 47.14).abs() < 0.01);
    }
}
