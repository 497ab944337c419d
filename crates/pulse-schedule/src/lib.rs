//! 多节奏调度器
//!
//! 每个命名任务注册后先立即执行一次建立基线，之后按固定间隔触发。
//! 同名任务的执行严格串行：上一次未结束时到来的触发顺延到下一个
//! 周期；不同任务之间自由交错。

pub mod scheduler;

pub use scheduler::{CadenceScheduler, MaintenanceConfig, ScheduleStatus};
