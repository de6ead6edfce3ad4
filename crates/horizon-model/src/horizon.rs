//! Fixed elapsed-time checkpoints.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Minutes in one horizon step (24 hours).
pub const MINUTES_PER_DAY: f64 = 1440.0;

/// Horizons used when the configuration does not name any (0h, 24h, 48h).
pub const DEFAULT_HORIZONS: [Horizon; 3] = [Horizon(0), Horizon(1), Horizon(2)];

/// A snapshot checkpoint expressed in whole days since ICU admission.
///
/// Horizon `h` sees every event recorded at or before `h * 1440` minutes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Horizon(pub u32);

impl Horizon {
    pub fn index(self) -> u32 {
        self.0
    }

    /// Inclusive upper bound on event offsets visible at this horizon.
    pub fn cutoff_minutes(self) -> f64 {
        f64::from(self.0) * MINUTES_PER_DAY
    }

    /// Horizon position in days, used to re-base outcome times.
    pub fn days(self) -> f64 {
        f64::from(self.0)
    }
}

impl fmt::Display for Horizon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "day{}", self.0)
    }
}

/// Convert a minute offset to days.
pub fn minutes_to_days(minutes: f64) -> f64 {
    minutes / MINUTES_PER_DAY
}
