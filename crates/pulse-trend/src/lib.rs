pub mod engine;
pub mod insight;
pub mod metrics;
pub mod stats;

pub use engine::{
    analyze_values, DataQuality, FleetSummary, FleetTrendReport, HealthGrade, OverallTrend,
    Reliability, TrendEngine, TrendReport, TrendResult,
};
pub use insight::{Insight, Priority, Recommendation};
pub use metrics::{performance_score, TrackedMetric, ALL_METRICS};
pub use stats::{
    quick_trend, trend_direction, Anomaly, AnomalySeverity, Prediction, TrendDirection,
};
