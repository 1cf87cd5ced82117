//! Fixed-capacity moving windows
//!
//! This module provides statistics over the most recent `N` observations of a
//! stream, updated in O(1) per observation.
//!
//! # Example
//!
//! ```
//! use movstats::window::MovingWindow;
//!
//! let mut window = MovingWindow::new(5).unwrap();
//!
//! for value in [10.0, 10.0, 10.0] {
//!     window.update(value);
//! }
//! assert_eq!(window.len(), 3);
//! assert_eq!(window.mean(), 10.0);
//!
//! // Let stale history decay without new samples
//! window.drop_oldest(2);
//! assert_eq!(window.len(), 1);
//! assert_eq!(window.stats(), (10.0, 0.0));
//! ```

mod moving;

pub use moving::{Estimator, MovingWindow};
