pub mod loader;
pub mod model;

pub use loader::ConfigLoader;
pub use model::{
    default_targets, ConfigSummary, HistoryConfig, MonitorConfig, NotificationsConfig,
    ScheduleEntry, SchedulesConfig,
};
