pub mod clock;
pub mod error;

pub use clock::{in_any_window, parse_windows, TimeWindow};
pub use error::{PulseError, Result};
