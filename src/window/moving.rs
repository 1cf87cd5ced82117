//! Moving window mean and standard deviation
//!
//! A ring buffer of fixed capacity paired with running aggregates (sum and sum
//! of squares). Adding a value adjusts the aggregates by the difference between
//! the new value and the one it evicts, so updates never rescan the window.

use crate::math;
use crate::traits::{WindowError, WindowStatistic};

#[cfg(not(feature = "std"))]
use alloc::{boxed::Box, vec};

/// How the standard deviation is derived from the window
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Estimator {
    /// One-pass `sqrt(|Σx²/(n-1) - mean²|)`
    ///
    /// The mean in this formula is the one cached by the *previous* update or
    /// drop, and the result is not a true variance estimate (a constant stream
    /// does not report zero).
    #[default]
    Legacy,
    /// Unbiased sample deviation from Welford moments, `sqrt(M2/(n-1))`
    Sample,
    /// Population deviation from Welford moments, `sqrt(M2/n)`
    Population,
}

/// Welford mean and M2 over the logical window
///
/// Removal inverts the insertion step. That inversion loses precision when a
/// value much larger than the rest leaves, so the window periodically rebuilds
/// the moments from its live values (see `MovingWindow::rebuild_moments`).
#[derive(Clone, Copy, Debug, Default)]
struct Moments {
    mean: f64,
    m2: f64,
}

impl Moments {
    /// `n` is the count after the insertion
    #[inline]
    fn push(&mut self, n: usize, value: f64) {
        let delta = value - self.mean;
        self.mean += delta / n as f64;
        self.m2 += delta * (value - self.mean);
    }

    /// `n` is the count before the removal
    #[inline]
    fn pop(&mut self, n: usize, value: f64) {
        if n <= 1 {
            *self = Self::default();
            return;
        }

        let prev = (self.mean * n as f64 - value) / (n - 1) as f64;
        self.m2 -= (value - self.mean) * (value - prev);
        self.mean = prev;
    }
}

/// Mean and standard deviation of the most recent `capacity` observations
///
/// # Example
///
/// ```
/// use movstats::MovingWindow;
///
/// let mut window = MovingWindow::new(3).unwrap();
///
/// assert_eq!(window.update(1.0), (1.0, 0.0));
/// window.update(2.0);
/// window.update(3.0);
///
/// // Evicts 1.0
/// let (mean, _) = window.update(4.0);
/// assert_eq!(mean, 3.0);
/// assert_eq!(window.iter().collect::<Vec<_>>(), vec![2.0, 3.0, 4.0]);
/// ```
///
/// The window is a plain value with a single owner. Wrap it in a mutex to
/// share it across threads.
#[derive(Clone, Debug)]
pub struct MovingWindow {
    /// Ring storage, always `capacity` slots
    buffer: Box<[f64]>,
    /// Next write position
    index: usize,
    /// Logical number of observations
    length: usize,
    /// Running sum of the logical observations
    sum: f64,
    /// Running sum of squares of the logical observations
    sum_squares: f64,
    /// Welford moments for the non-legacy estimators
    moments: Moments,
    estimator: Estimator,
    /// Cached by the last update or drop
    average: f64,
    stddev: f64,
}

impl MovingWindow {
    /// Create an empty window using [`Estimator::Legacy`]
    ///
    /// # Errors
    ///
    /// Returns [`WindowError::InvalidCapacity`] if `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self, WindowError> {
        Self::with_estimator(capacity, Estimator::default())
    }

    /// Create an empty window with the given estimator
    ///
    /// # Arguments
    ///
    /// * `capacity` - Maximum number of observations retained (at least 1)
    /// * `estimator` - How the standard deviation is derived
    ///
    /// # Errors
    ///
    /// Returns [`WindowError::InvalidCapacity`] if `capacity` is zero.
    pub fn with_estimator(capacity: usize, estimator: Estimator) -> Result<Self, WindowError> {
        if capacity == 0 {
            #[cfg(feature = "tracing")]
            tracing::debug!(capacity, "rejecting moving window with zero capacity");
            return Err(WindowError::InvalidCapacity { capacity });
        }

        Ok(Self {
            buffer: vec![0.0; capacity].into_boxed_slice(),
            index: 0,
            length: 0,
            sum: 0.0,
            sum_squares: 0.0,
            moments: Moments::default(),
            estimator,
            average: 0.0,
            stddev: 0.0,
        })
    }

    /// Add an observation, evicting the oldest one if the window is full
    ///
    /// Returns the refreshed `(mean, stddev)`. Non-finite values are not
    /// rejected; they propagate into the statistics.
    pub fn update(&mut self, value: f64) -> (f64, f64) {
        let capacity = self.buffer.len();

        if self.length < capacity {
            self.length += 1;
            self.sum += value;
            self.sum_squares += value * value;
        } else {
            let evicted = self.buffer[self.index];
            self.sum += value - evicted;
            self.sum_squares += value * value - evicted * evicted;
            self.moments.pop(self.length, evicted);
        }
        self.moments.push(self.length, value);

        self.buffer[self.index] = value;
        self.index += 1;
        if self.index >= capacity {
            self.index = 0;
            // Once per lap, so amortized O(1).
            if self.length == capacity {
                self.rebuild_moments();
            }
        }

        self.refresh()
    }

    /// Remove up to `count` of the oldest observations
    ///
    /// The ring is not shifted; only the logical length shrinks. Returns the
    /// refreshed `(mean, stddev)`.
    pub fn drop_oldest(&mut self, count: usize) -> (f64, f64) {
        if self.length == 0 {
            return self.refresh();
        }

        let mut remaining = count;
        while remaining > 0 && self.length > 0 {
            let value = self.buffer[self.oldest_index()];

            self.sum -= value;
            self.sum_squares -= value * value;
            self.moments.pop(self.length, value);

            self.length -= 1;
            remaining -= 1;
        }

        #[cfg(feature = "tracing")]
        tracing::trace!(
            requested = count,
            removed = count - remaining,
            len = self.length,
            "dropped oldest observations"
        );

        // Below two samples there is no deviation; clear float residue so the
        // sqrt never sees a negative argument.
        if self.length < 2 {
            self.sum_squares = 0.0;
            self.moments.m2 = 0.0;
            if self.length < 1 {
                self.length = 0;
                self.sum = 0.0;
                self.moments = Moments::default();
            }
        }
        if remaining < count {
            self.rebuild_moments();
        }

        self.refresh()
    }

    /// Reset to the freshly constructed state
    ///
    /// Capacity and estimator are kept. The buffer is not zeroed; stale slots
    /// are never read.
    pub fn clear(&mut self) {
        #[cfg(feature = "tracing")]
        tracing::trace!(discarded = self.length, "clearing moving window");

        self.index = 0;
        self.length = 0;
        self.sum = 0.0;
        self.sum_squares = 0.0;
        self.moments = Moments::default();
        self.average = 0.0;
        self.stddev = 0.0;
    }

    /// Number of observations currently in the window
    #[inline]
    pub fn len(&self) -> usize {
        self.length
    }

    /// Maximum number of observations retained
    #[inline]
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the window holds no observations
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Check if the window is at capacity
    #[inline]
    pub fn is_full(&self) -> bool {
        self.length == self.buffer.len()
    }

    /// Mean computed by the last update or drop
    #[inline]
    pub fn mean(&self) -> f64 {
        self.average
    }

    /// Standard deviation computed by the last update or drop
    #[inline]
    pub fn stddev(&self) -> f64 {
        self.stddev
    }

    /// `(mean, stddev)` as cached by the last update or drop
    #[inline]
    pub fn stats(&self) -> (f64, f64) {
        (self.average, self.stddev)
    }

    /// Running sum of the observations in the window
    pub fn sum(&self) -> f64 {
        self.sum
    }

    /// Estimator chosen at construction
    pub fn estimator(&self) -> Estimator {
        self.estimator
    }

    /// Iterate over the observations, oldest first
    ///
    /// ```
    /// use movstats::MovingWindow;
    ///
    /// let mut window = MovingWindow::new(4).unwrap();
    /// window.extend([1.0, 2.0, 3.0, 4.0, 5.0]);
    /// window.drop_oldest(1);
    ///
    /// let values: Vec<f64> = window.iter().collect();
    /// assert_eq!(values, vec![3.0, 4.0, 5.0]);
    /// ```
    pub fn iter(&self) -> impl ExactSizeIterator<Item = f64> + '_ {
        let start = self.oldest_index();
        let capacity = self.buffer.len();
        (0..self.length).map(move |i| self.buffer[(start + i) % capacity])
    }

    /// Oldest observation, next in line for eviction
    pub fn oldest(&self) -> Option<f64> {
        if self.length == 0 {
            return None;
        }
        Some(self.buffer[self.oldest_index()])
    }

    /// Most recently added observation
    pub fn newest(&self) -> Option<f64> {
        if self.length == 0 {
            return None;
        }
        let capacity = self.buffer.len();
        Some(self.buffer[(self.index + capacity - 1) % capacity])
    }

    /// Ring slot of the oldest logical observation
    ///
    /// `length <= capacity`, so the offset never underflows.
    #[inline]
    fn oldest_index(&self) -> usize {
        let capacity = self.buffer.len();
        (self.index + capacity - self.length) % capacity
    }

    /// Two-pass recomputation of the Welford moments over the live values
    ///
    /// Clears the rounding residue left by removing outsized values. Skipped
    /// for the legacy estimator, which never reads the moments.
    fn rebuild_moments(&mut self) {
        if self.estimator == Estimator::Legacy || self.length == 0 {
            return;
        }

        let n = self.length as f64;
        let mean = self.iter().sum::<f64>() / n;
        let m2 = self.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>();
        self.moments = Moments { mean, m2 };
    }

    /// Recompute the cached statistics from the aggregates
    fn refresh(&mut self) -> (f64, f64) {
        let n = self.length;

        match self.estimator {
            Estimator::Legacy => {
                // Deviation first, against the previous call's average.
                self.stddev = if n > 1 {
                    let raw = self.sum_squares / (n - 1) as f64 - self.average * self.average;
                    math::sqrt(math::abs(raw))
                } else {
                    0.0
                };
                self.average = if n > 0 { self.sum / n as f64 } else { 0.0 };
            }
            Estimator::Sample | Estimator::Population => {
                self.average = if n > 0 { self.moments.mean } else { 0.0 };

                let divisor = match self.estimator {
                    Estimator::Sample => n.saturating_sub(1),
                    _ => n,
                };
                self.stddev = if n > 1 {
                    // Cancellation can leave M2 a hair below zero.
                    let m2 = if self.moments.m2 < 0.0 { 0.0 } else { self.moments.m2 };
                    math::sqrt(m2 / divisor as f64)
                } else {
                    0.0
                };
            }
        }

        (self.average, self.stddev)
    }
}

impl Extend<f64> for MovingWindow {
    fn extend<I: IntoIterator<Item = f64>>(&mut self, iter: I) {
        for value in iter {
            self.update(value);
        }
    }
}

impl WindowStatistic for MovingWindow {
    fn update(&mut self, value: f64) -> (f64, f64) {
        MovingWindow::update(self, value)
    }

    fn drop_oldest(&mut self, count: usize) -> (f64, f64) {
        MovingWindow::drop_oldest(self, count)
    }

    fn clear(&mut self) {
        MovingWindow::clear(self);
    }

    fn len(&self) -> usize {
        self.length
    }

    fn capacity(&self) -> usize {
        self.buffer.len()
    }

    fn mean(&self) -> f64 {
        self.average
    }

    fn stddev(&self) -> f64 {
        self.stddev
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(not(feature = "std"))]
    use alloc::vec::Vec;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let err = MovingWindow::new(0).unwrap_err();
        assert_eq!(err, WindowError::InvalidCapacity { capacity: 0 });

        assert!(MovingWindow::with_estimator(0, Estimator::Sample).is_err());
    }

    #[test]
    fn test_new_is_empty() {
        let window = MovingWindow::new(4).unwrap();

        assert!(window.is_empty());
        assert!(!window.is_full());
        assert_eq!(window.len(), 0);
        assert_eq!(window.capacity(), 4);
        assert_eq!(window.stats(), (0.0, 0.0));
        assert_eq!(window.estimator(), Estimator::Legacy);
        assert_eq!(window.oldest(), None);
        assert_eq!(window.newest(), None);
    }

    #[test]
    fn test_legacy_sequence() {
        let mut window = MovingWindow::new(3).unwrap();

        assert_eq!(window.update(1.0), (1.0, 0.0));

        // Σx² = 5, n-1 = 1, previous average = 1
        let (mean, stddev) = window.update(2.0);
        assert_eq!(mean, 1.5);
        assert!(close(stddev, 2.0));

        // Σx² = 14, n-1 = 2, previous average = 1.5
        let (mean, stddev) = window.update(3.0);
        assert_eq!(mean, 2.0);
        assert!(close(stddev, 4.75f64.sqrt()));

        // Evicts 1: Σx² = 29, previous average = 2
        let (mean, stddev) = window.update(4.0);
        assert_eq!(mean, 3.0);
        assert!(close(stddev, 10.5f64.sqrt()));
        assert_eq!(window.len(), 3);
        assert!(window.is_full());
    }

    #[test]
    fn test_legacy_uses_previous_average() {
        let mut window = MovingWindow::new(5).unwrap();

        window.update(10.0);
        window.update(10.0);
        // 200/1 - 10² = 100
        assert!(close(window.stddev(), 10.0));

        window.update(10.0);
        // 300/2 - 10² = 50
        assert!(close(window.stddev(), 50f64.sqrt()));
        assert_eq!(window.mean(), 10.0);
    }

    #[test]
    fn test_sample_estimator() {
        let mut window = MovingWindow::with_estimator(3, Estimator::Sample).unwrap();

        assert_eq!(window.update(1.0), (1.0, 0.0));

        let (mean, stddev) = window.update(2.0);
        assert!(close(mean, 1.5));
        assert!(close(stddev, 0.5f64.sqrt()));

        let (mean, stddev) = window.update(3.0);
        assert!(close(mean, 2.0));
        assert!(close(stddev, 1.0));

        let (mean, stddev) = window.update(4.0);
        assert!(close(mean, 3.0));
        assert!(close(stddev, 1.0));
    }

    #[test]
    fn test_population_estimator() {
        let mut window = MovingWindow::with_estimator(3, Estimator::Population).unwrap();

        window.extend([1.0, 2.0, 3.0, 4.0]);

        assert!(close(window.mean(), 3.0));
        assert!(close(window.stddev(), (2.0f64 / 3.0).sqrt()));
    }

    #[test]
    fn test_constant_stream_has_zero_deviation() {
        for estimator in [Estimator::Sample, Estimator::Population] {
            let mut window = MovingWindow::with_estimator(4, estimator).unwrap();
            window.extend([7.5; 10]);

            assert_eq!(window.mean(), 7.5);
            assert_eq!(window.stddev(), 0.0);
        }
    }

    #[test]
    fn test_drop_partial() {
        let mut window = MovingWindow::new(5).unwrap();
        window.extend([10.0, 10.0, 10.0]);

        assert_eq!(window.len(), 3);
        assert_eq!(window.mean(), 10.0);

        let (mean, stddev) = window.drop_oldest(2);
        assert_eq!(window.len(), 1);
        assert_eq!(mean, 10.0);
        assert_eq!(stddev, 0.0);
    }

    #[test]
    fn test_drop_removes_oldest_first() {
        let mut window = MovingWindow::new(4).unwrap();
        window.extend([1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);

        // Window holds {3, 4, 5, 6}, ring index has wrapped
        window.drop_oldest(1);
        assert_eq!(window.len(), 3);
        assert_eq!(window.sum(), 15.0);
        assert_eq!(window.mean(), 5.0);
        assert_eq!(window.oldest(), Some(4.0));
        assert_eq!(window.newest(), Some(6.0));
    }

    #[test]
    fn test_drop_everything() {
        let mut window = MovingWindow::with_estimator(3, Estimator::Sample).unwrap();
        window.extend([0.1, 0.2, 0.3]);

        assert_eq!(window.drop_oldest(10), (0.0, 0.0));
        assert!(window.is_empty());
        assert_eq!(window.sum(), 0.0);
        assert_eq!(window.iter().count(), 0);
    }

    #[test]
    fn test_drop_on_empty() {
        let mut window = MovingWindow::new(3).unwrap();
        assert_eq!(window.drop_oldest(5), (0.0, 0.0));
        assert_eq!(window.len(), 0);
    }

    #[test]
    fn test_drop_zero_is_noop() {
        let mut window = MovingWindow::with_estimator(4, Estimator::Sample).unwrap();
        window.extend([1.0, 5.0, 2.0]);

        let before = window.stats();
        assert_eq!(window.drop_oldest(0), before);
        assert_eq!(window.len(), 3);
    }

    #[test]
    fn test_update_after_drop_refills() {
        let mut window = MovingWindow::with_estimator(3, Estimator::Sample).unwrap();
        window.extend([1.0, 2.0, 3.0]);
        window.drop_oldest(2);

        // {3} then refill to {3, 10, 20}
        window.update(10.0);
        window.update(20.0);
        assert!(window.is_full());
        assert_eq!(window.iter().collect::<Vec<_>>(), vec![3.0, 10.0, 20.0]);
        assert!(close(window.mean(), 11.0));

        // Evicts 3
        window.update(30.0);
        assert_eq!(window.iter().collect::<Vec<_>>(), vec![10.0, 20.0, 30.0]);
        assert!(close(window.mean(), 20.0));
        assert!(close(window.stddev(), 10.0));
    }

    #[test]
    fn test_capacity_one() {
        let mut window = MovingWindow::new(1).unwrap();

        assert_eq!(window.update(3.0), (3.0, 0.0));
        assert_eq!(window.update(-8.0), (-8.0, 0.0));
        assert_eq!(window.len(), 1);
        assert_eq!(window.oldest(), window.newest());
    }

    #[test]
    fn test_clear() {
        let mut window = MovingWindow::with_estimator(3, Estimator::Population).unwrap();
        window.extend([1.0, 2.0, 3.0, 4.0]);

        window.clear();

        assert!(window.is_empty());
        assert_eq!(window.stats(), (0.0, 0.0));
        assert_eq!(window.capacity(), 3);
        assert_eq!(window.estimator(), Estimator::Population);

        window.update(2.0);
        assert_eq!(window.iter().collect::<Vec<_>>(), vec![2.0]);
    }

    #[test]
    fn test_legacy_drop_zero_refreshes_deviation() {
        let mut window = MovingWindow::new(3).unwrap();
        window.extend([1.0, 2.0, 3.0]);
        assert!(close(window.stddev(), 4.75f64.sqrt()));

        // 14/2 - 2² against the now-current average
        let (mean, stddev) = window.drop_oldest(0);
        assert_eq!(mean, 2.0);
        assert!(close(stddev, 3f64.sqrt()));
        assert_eq!(window.len(), 3);
    }

    #[test]
    fn test_spike_leaving_window_does_not_skew_moments() {
        let mut window = MovingWindow::with_estimator(3, Estimator::Sample).unwrap();
        window.extend([1e9, -1e9, 1e9, 1.0, 2.0, 3.0]);

        assert_eq!(window.iter().collect::<Vec<_>>(), vec![1.0, 2.0, 3.0]);
        assert!(close(window.mean(), 2.0));
        assert!(close(window.stddev(), 1.0));

        let mut window = MovingWindow::with_estimator(3, Estimator::Population).unwrap();
        window.extend([1e9, -1e9, 1e9, 1.0, 2.0, 3.0]);
        assert!(close(window.stddev(), (2.0f64 / 3.0).sqrt()));
    }

    #[test]
    fn test_spike_dropped_does_not_skew_moments() {
        let mut window = MovingWindow::with_estimator(5, Estimator::Sample).unwrap();
        window.extend([1e12, 1.0, 2.0, 3.0]);

        let (mean, stddev) = window.drop_oldest(1);
        assert!(close(mean, 2.0));
        assert!(close(stddev, 1.0));
    }

    #[test]
    fn test_nan_propagates() {
        let mut window = MovingWindow::new(3).unwrap();
        window.update(1.0);
        window.update(f64::NAN);

        assert!(window.mean().is_nan());
        assert_eq!(window.len(), 2);
    }

    #[test]
    fn test_infinity_propagates() {
        let mut window = MovingWindow::with_estimator(2, Estimator::Sample).unwrap();
        window.update(1.0);
        window.update(f64::INFINITY);

        assert_eq!(window.mean(), f64::INFINITY);
    }

    #[test]
    fn test_trait_outlier() {
        let mut window = MovingWindow::with_estimator(8, Estimator::Sample).unwrap();
        window.extend([2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);

        assert!(WindowStatistic::is_outlier(&window, 30.0, 3.0));
        assert!(!WindowStatistic::is_outlier(&window, 6.0, 3.0));

        let flat = {
            let mut w = MovingWindow::with_estimator(3, Estimator::Sample).unwrap();
            w.extend([1.0, 1.0, 1.0]);
            w
        };
        assert!(!WindowStatistic::is_outlier(&flat, 100.0, 3.0));
    }
}
