//! Core traits for moving-window statistics
//!
//! [`WindowStatistic`] is the seam callers program against when they only need
//! "feed a sample, read mean and deviation" (anomaly detectors, dashboards).

use core::fmt::Debug;

/// Error constructing a window
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowError {
    /// Capacity must hold at least one observation
    InvalidCapacity { capacity: usize },
}

impl core::fmt::Display for WindowError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            WindowError::InvalidCapacity { capacity } => {
                write!(f, "invalid capacity: expected at least 1, found {}", capacity)
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for WindowError {}

/// Fixed-capacity statistic over the most recent observations of a stream
pub trait WindowStatistic: Clone + Debug {
    /// Add an observation, evicting the oldest if full
    ///
    /// Returns the refreshed `(mean, stddev)`.
    fn update(&mut self, value: f64) -> (f64, f64);

    /// Remove up to `count` of the oldest observations
    ///
    /// Returns the refreshed `(mean, stddev)`.
    fn drop_oldest(&mut self, count: usize) -> (f64, f64);

    /// Reset to the empty state, keeping the capacity
    fn clear(&mut self);

    /// Number of observations currently in the window
    fn len(&self) -> usize;

    /// Maximum number of observations retained
    fn capacity(&self) -> usize;

    /// Mean computed by the last update or drop
    fn mean(&self) -> f64;

    /// Standard deviation computed by the last update or drop
    fn stddev(&self) -> f64;

    /// `(mean, stddev)` pair
    fn stats(&self) -> (f64, f64) {
        (self.mean(), self.stddev())
    }

    /// Check if the window holds no observations
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check if the window is at capacity
    fn is_full(&self) -> bool {
        self.len() == self.capacity()
    }

    /// Check if `value` lies more than `k` standard deviations from the mean
    ///
    /// Always `false` while the deviation is zero.
    fn is_outlier(&self, value: f64, k: f64) -> bool {
        let (mean, stddev) = self.stats();
        stddev > 0.0 && crate::math::abs(value - mean) > k * stddev
    }
}
