pub mod engine;
pub mod escalation;
pub mod model;
pub mod store;
pub mod suppression;

pub use engine::{
    AlertEngine, CriticalThresholds, InfoThresholds, Thresholds, WarningThresholds,
};
pub use escalation::{EscalationPolicy, EscalationScheduler, EscalationStage, EscalationTask};
pub use model::{
    AlertCandidate, AlertDetail, AlertLevel, AlertRecord, AlertStatus, AlertType,
    NotificationEntry, TargetRef,
};
pub use store::{AlertStore, AlertSummary};
pub use suppression::{MaintenanceRule, SuppressReason, SuppressionConfig, SuppressionEvaluator};
