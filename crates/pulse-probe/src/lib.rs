pub mod health;
pub mod probe;
pub mod simulated;

pub use health::health_score;
pub use probe::Probe;
pub use simulated::SimulatedProbe;
