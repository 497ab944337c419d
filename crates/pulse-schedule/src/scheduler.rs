use chrono::{DateTime, Utc};
use pulse_core::{in_any_window, parse_windows, Result, TimeWindow};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

/// 任务回调返回的 future
pub type JobFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>;

/// 任务回调：接收可选的目标子集
pub type JobFn = Arc<dyn Fn(Option<Vec<String>>) -> JobFuture + Send + Sync>;

/// 维护窗口配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceConfig {
    /// 窗口列表（"HH:MM-HH:MM"）
    pub windows: Vec<String>,

    /// 窗口内是否跳过监控
    pub skip_during_maintenance: bool,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            windows: vec!["02:00-04:00".to_string()],
            skip_during_maintenance: true,
        }
    }
}

/// 任务时间戳
#[derive(Debug, Clone, Default)]
struct JobTimes {
    last_attempted: Option<DateTime<Utc>>,
    last_completed: Option<DateTime<Utc>>,
    next_run: Option<DateTime<Utc>>,
}

struct Job {
    name: String,
    interval: Duration,
    targets: Option<Vec<String>>,
    callback: JobFn,
    times: RwLock<JobTimes>,
}

/// 调度状态快照
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleStatus {
    pub name: String,
    pub interval_secs: u64,
    pub last_attempted: Option<DateTime<Utc>>,
    pub last_completed: Option<DateTime<Utc>>,
    pub next_run: Option<DateTime<Utc>>,
}

/// 多节奏调度器
///
/// 自持任务表的实例，不依赖进程级全局状态；由拥有进程生命周期的
/// 一方持有并启停。
pub struct CadenceScheduler {
    jobs: RwLock<Vec<Arc<Job>>>,
    windows: Vec<TimeWindow>,
    skip_during_maintenance: bool,
    handles: Mutex<Vec<JoinHandle<()>>>,
    running: Arc<AtomicBool>,
}

impl CadenceScheduler {
    pub fn new(maintenance: MaintenanceConfig) -> Result<Self> {
        Ok(Self {
            jobs: RwLock::new(Vec::new()),
            windows: parse_windows(&maintenance.windows)?,
            skip_during_maintenance: maintenance.skip_during_maintenance,
            handles: Mutex::new(Vec::new()),
            running: Arc::new(AtomicBool::new(false)),
        })
    }

    /// 注册命名任务
    pub async fn register<F, Fut>(
        &self,
        name: &str,
        interval: Duration,
        targets: Option<Vec<String>>,
        callback: F,
    ) where
        F: Fn(Option<Vec<String>>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let job = Arc::new(Job {
            name: name.to_string(),
            interval,
            targets,
            callback: Arc::new(move |targets| Box::pin(callback(targets)) as JobFuture),
            times: RwLock::new(JobTimes::default()),
        });

        info!(
            schedule = %name,
            interval_secs = interval.as_secs(),
            "Schedule registered"
        );

        self.jobs.write().await.push(job);
    }

    /// 启动所有任务
    pub async fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Cadence scheduler is already running");
            return;
        }

        let jobs = self.jobs.read().await.clone();
        let mut handles = self.handles.lock().await;

        for job in jobs {
            let running = self.running.clone();
            let windows = self.windows.clone();
            let skip = self.skip_during_maintenance;

            handles.push(tokio::spawn(async move {
                run_job_loop(job, running, windows, skip).await;
            }));
        }

        info!("Cadence scheduler started");
    }

    /// 停止：取消所有待触发的定时器
    ///
    /// 进行中的回调在自己的任务里收尾，不会被打断。
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            warn!("Cadence scheduler is not running");
            return;
        }

        let mut handles = self.handles.lock().await;
        for handle in handles.drain(..) {
            handle.abort();
        }

        info!("Cadence scheduler stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// 各任务的时间戳快照
    pub async fn status(&self) -> Vec<ScheduleStatus> {
        let jobs = self.jobs.read().await;
        let mut statuses = Vec::with_capacity(jobs.len());

        for job in jobs.iter() {
            let times = job.times.read().await.clone();
            statuses.push(ScheduleStatus {
                name: job.name.clone(),
                interval_secs: job.interval.as_secs(),
                last_attempted: times.last_attempted,
                last_completed: times.last_completed,
                next_run: times.next_run,
            });
        }

        statuses
    }

    /// 当前时刻是否处于维护窗口
    pub fn in_maintenance(&self, at: DateTime<Utc>) -> bool {
        self.skip_during_maintenance && in_any_window(&self.windows, at.time())
    }
}

/// 单个任务的触发循环
///
/// interval 的首个 tick 立即返回，承担注册后的基线执行；
/// 回调超过周期时错过的 tick 被跳过，等价于顺延到下一个周期。
async fn run_job_loop(
    job: Arc<Job>,
    running: Arc<AtomicBool>,
    windows: Vec<TimeWindow>,
    skip_during_maintenance: bool,
) {
    let mut ticker = tokio::time::interval(job.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;

        if !running.load(Ordering::SeqCst) {
            break;
        }

        let now = Utc::now();
        {
            let mut times = job.times.write().await;
            times.last_attempted = Some(now);
            times.next_run = Some(
                now + chrono::Duration::from_std(job.interval)
                    .unwrap_or_else(|_| chrono::Duration::zero()),
            );
        }

        if skip_during_maintenance && in_any_window(&windows, now.time()) {
            info!(schedule = %job.name, "Maintenance window active, run skipped");
            continue;
        }

        info!(schedule = %job.name, "Executing scheduled run");

        let callback = job.callback.clone();
        let targets = job.targets.clone();
        let started = std::time::Instant::now();

        // 回调跑在独立任务里：stop() 中止本循环时在途回调仍能收尾
        let outcome = tokio::spawn(async move { callback(targets).await }).await;

        match outcome {
            Ok(Ok(())) => {
                let mut times = job.times.write().await;
                times.last_completed = Some(Utc::now());
                info!(
                    schedule = %job.name,
                    duration_ms = started.elapsed().as_millis() as u64,
                    "Scheduled run completed"
                );
            }
            Ok(Err(e)) => {
                error!(schedule = %job.name, error = %e, "Scheduled run failed");
            }
            Err(e) => {
                error!(schedule = %job.name, error = %e, "Scheduled run aborted");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    fn no_maintenance() -> MaintenanceConfig {
        MaintenanceConfig {
            windows: Vec::new(),
            skip_during_maintenance: true,
        }
    }

    fn all_day_maintenance() -> MaintenanceConfig {
        MaintenanceConfig {
            windows: vec!["00:00-23:59".to_string()],
            skip_during_maintenance: true,
        }
    }

    #[tokio::test]
    async fn test_immediate_baseline_fire() {
        let scheduler = CadenceScheduler::new(no_maintenance()).unwrap();
        let fired = Arc::new(AtomicU32::new(0));

        let counter = fired.clone();
        scheduler
            .register("quick", Duration::from_secs(3600), None, move |_| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            })
            .await;

        scheduler.start().await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        scheduler.stop().await;

        // 注册后的基线执行不等完整周期
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_runs_of_same_job_never_overlap() {
        let scheduler = CadenceScheduler::new(no_maintenance()).unwrap();
        let spans: Arc<Mutex<Vec<(std::time::Instant, std::time::Instant)>>> =
            Arc::new(Mutex::new(Vec::new()));

        let recorder = spans.clone();
        scheduler
            .register("slow", Duration::from_millis(40), None, move |_| {
                let recorder = recorder.clone();
                async move {
                    let start = std::time::Instant::now();
                    tokio::time::sleep(Duration::from_millis(90)).await;
                    recorder.lock().await.push((start, std::time::Instant::now()));
                    Ok(())
                }
            })
            .await;

        scheduler.start().await;
        tokio::time::sleep(Duration::from_millis(400)).await;
        scheduler.stop().await;
        tokio::time::sleep(Duration::from_millis(120)).await;

        let spans = spans.lock().await;
        assert!(spans.len() >= 2);
        for pair in spans.windows(2) {
            // 第 k+1 次的开始不早于第 k 次的结束
            assert!(pair[1].0 >= pair[0].1);
        }
    }

    #[tokio::test]
    async fn test_callback_failure_does_not_stop_schedule() {
        let scheduler = CadenceScheduler::new(no_maintenance()).unwrap();
        let fired = Arc::new(AtomicU32::new(0));

        let counter = fired.clone();
        scheduler
            .register("flaky", Duration::from_millis(50), None, move |_| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    anyhow::bail!("probe exploded")
                }
            })
            .await;

        scheduler.start().await;
        tokio::time::sleep(Duration::from_millis(180)).await;
        scheduler.stop().await;

        // 失败后仍按周期触发
        assert!(fired.load(Ordering::SeqCst) >= 3);
    }

    #[tokio::test]
    async fn test_maintenance_skip_advances_attempted_only() {
        let scheduler = CadenceScheduler::new(all_day_maintenance()).unwrap();
        let fired = Arc::new(AtomicU32::new(0));

        let counter = fired.clone();
        scheduler
            .register("quick", Duration::from_millis(50), None, move |_| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            })
            .await;

        scheduler.start().await;
        tokio::time::sleep(Duration::from_millis(150)).await;
        scheduler.stop().await;

        assert_eq!(fired.load(Ordering::SeqCst), 0);

        let status = &scheduler.status().await[0];
        assert!(status.last_attempted.is_some());
        assert!(status.last_completed.is_none());
        assert!(status.next_run.is_some());
    }

    #[tokio::test]
    async fn test_stop_halts_ticks() {
        let scheduler = CadenceScheduler::new(no_maintenance()).unwrap();
        let fired = Arc::new(AtomicU32::new(0));

        let counter = fired.clone();
        scheduler
            .register("quick", Duration::from_millis(40), None, move |_| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            })
            .await;

        scheduler.start().await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        scheduler.stop().await;
        assert!(!scheduler.is_running());

        let after_stop = fired.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(fired.load(Ordering::SeqCst), after_stop);
    }

    #[tokio::test]
    async fn test_different_jobs_interleave() {
        let scheduler = CadenceScheduler::new(no_maintenance()).unwrap();
        let quick_fired = Arc::new(AtomicU32::new(0));
        let deep_fired = Arc::new(AtomicU32::new(0));

        let counter = quick_fired.clone();
        scheduler
            .register("quick", Duration::from_millis(40), None, move |_| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            })
            .await;

        let counter = deep_fired.clone();
        scheduler
            .register("deep", Duration::from_millis(60), None, move |_| {
                let counter = counter.clone();
                async move {
                    // deep 任务耗时较长，但不阻塞 quick
                    tokio::time::sleep(Duration::from_millis(80)).await;
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            })
            .await;

        scheduler.start().await;
        tokio::time::sleep(Duration::from_millis(250)).await;
        scheduler.stop().await;
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(quick_fired.load(Ordering::SeqCst) >= 4);
        assert!(deep_fired.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn test_target_subset_passed_to_callback() {
        let scheduler = CadenceScheduler::new(no_maintenance()).unwrap();
        let seen: Arc<Mutex<Option<Vec<String>>>> = Arc::new(Mutex::new(None));

        let sink = seen.clone();
        scheduler
            .register(
                "quick",
                Duration::from_secs(3600),
                Some(vec!["prod-admin".to_string()]),
                move |targets| {
                    let sink = sink.clone();
                    async move {
                        *sink.lock().await = targets;
                        Ok(())
                    }
                },
            )
            .await;

        scheduler.start().await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        scheduler.stop().await;

        assert_eq!(
            seen.lock().await.as_deref(),
            Some(&["prod-admin".to_string()][..])
        );
    }

    #[test]
    fn test_rejects_malformed_maintenance_window() {
        let config = MaintenanceConfig {
            windows: vec!["2am-4am".to_string()],
            skip_during_maintenance: true,
        };

        assert!(CadenceScheduler::new(config).is_err());
    }
}
