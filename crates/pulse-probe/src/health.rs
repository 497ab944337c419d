use pulse_types::MetricSnapshot;

/// 根据子指标计算健康分（0-100）
///
/// 扣分项：控制台错误 10 分/条，警告 3 分/条，加载超过 3 秒扣 15 分，
/// 布局偏移超过 0.1 扣 10 分，失败请求 5 分/个，可访问性每低 5 分扣 3 分。
pub fn health_score(snapshot: &MetricSnapshot) -> f64 {
    let mut score = 100.0;

    score -= snapshot.console_errors as f64 * 10.0;
    score -= snapshot.console_warnings as f64 * 3.0;

    if snapshot.load_time_ms > 3000.0 {
        score -= 15.0;
    }
    if snapshot.cumulative_layout_shift > 0.1 {
        score -= 10.0;
    }

    score -= snapshot.failed_requests as f64 * 5.0;

    let accessibility_issues = ((100.0 - snapshot.accessibility_score) / 5.0).floor();
    score -= accessibility_issues.max(0.0) * 3.0;

    score.clamp(0.0, 100.0)
}
