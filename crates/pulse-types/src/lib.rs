pub mod run;
pub mod snapshot;
pub mod target;

pub use run::{MonitoringRun, RunKind, RunSummary};
pub use snapshot::{MetricSnapshot, ProbeStatus};
pub use target::{Criticality, Environment, MonitoringTarget};
