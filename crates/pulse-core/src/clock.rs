use crate::error::{PulseError, Result};
use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

/// 一天内的时间窗口（"HH:MM-HH:MM"）
///
/// 起始大于结束表示跨午夜窗口（如 "22:00-02:00"）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// 起始（自午夜的分钟数）
    start_min: u16,

    /// 结束（自午夜的分钟数）
    end_min: u16,
}

impl TimeWindow {
    /// 解析 "HH:MM-HH:MM" 格式的窗口
    pub fn parse(raw: &str) -> Result<Self> {
        let (start, end) = raw
            .split_once('-')
            .ok_or_else(|| PulseError::Config(format!("Invalid time window: {}", raw)))?;

        Ok(Self {
            start_min: parse_hhmm(start)?,
            end_min: parse_hhmm(end)?,
        })
    }

    /// 判断某个时刻是否落在窗口内
    ///
    /// 跨午夜窗口：now >= start 或 now <= end，否则 start <= now <= end。
    pub fn contains(&self, time: NaiveTime) -> bool {
        let now = (time.hour() * 60 + time.minute()) as u16;

        if self.start_min <= self.end_min {
            now >= self.start_min && now <= self.end_min
        } else {
            now >= self.start_min || now <= self.end_min
        }
    }
}

/// 解析 "HH:MM" 为自午夜的分钟数
fn parse_hhmm(value: &str) -> Result<u16> {
    let (h, m) = value
        .trim()
        .split_once(':')
        .ok_or_else(|| PulseError::Config(format!("Invalid time of day: {}", value)))?;

    let hours: u16 = h
        .parse()
        .map_err(|_| PulseError::Config(format!("Invalid hour: {}", value)))?;
    let minutes: u16 = m
        .parse()
        .map_err(|_| PulseError::Config(format!("Invalid minute: {}", value)))?;

    if hours > 23 || minutes > 59 {
        return Err(PulseError::Config(format!("Time of day out of range: {}", value)));
    }

    Ok(hours * 60 + minutes)
}

/// 批量解析窗口列表
pub fn parse_windows(raw: &[String]) -> Result<Vec<TimeWindow>> {
    raw.iter().map(|s| TimeWindow::parse(s)).collect()
}

/// 判断时刻是否落在任意窗口内
pub fn in_any_window(windows: &[TimeWindow], time: NaiveTime) -> bool {
    windows.iter().any(|w| w.contains(time))
}
