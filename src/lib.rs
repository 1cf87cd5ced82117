//! # Movstats
//!
//! Moving-window statistics for Rust.
//!
//! Movstats tracks the mean and standard deviation of the most recent `N`
//! observations of a stream. Values are kept in a fixed-size ring buffer and the
//! aggregates are updated incrementally, so adding a value never rescans the
//! window.
//!
//! ## Quick Start
//!
//! ```rust
//! use movstats::prelude::*;
//!
//! let mut window = MovingWindow::new(3).unwrap();
//! for sample in [1.0, 2.0, 3.0, 4.0] {
//!     window.update(sample);
//! }
//!
//! // 1.0 was evicted, the window holds {2, 3, 4}
//! assert_eq!(window.len(), 3);
//! assert_eq!(window.mean(), 3.0);
//! ```
//!
//! ## Estimators
//!
//! The default [`Estimator::Legacy`] reproduces the classic one-pass formula
//! (`sqrt(|Σx²/(n-1) - mean²|)`, evaluated against the mean cached by the
//! previous update). [`Estimator::Sample`] and [`Estimator::Population`] keep
//! Welford moments alongside the window and report the textbook values:
//!
//! ```rust
//! use movstats::{Estimator, MovingWindow};
//!
//! let mut window = MovingWindow::with_estimator(3, Estimator::Sample).unwrap();
//! window.update(1.0);
//! let (mean, stddev) = window.update(2.0);
//!
//! assert_eq!(mean, 1.5);
//! assert!((stddev - 0.5f64.sqrt()).abs() < 1e-12);
//! ```
//!
//! ## Feature Flags
//!
//! - `std` (default): Standard library support
//! - `tracing`: Emit diagnostic events through `tracing`
//!
//! Without `std` the crate is `no_std` + `alloc` and float math goes through `libm`.

#![cfg_attr(not(feature = "std"), no_std)]
#![cfg_attr(docsrs, feature(doc_cfg))]

#[cfg(not(feature = "std"))]
extern crate alloc;

mod math;

pub mod traits;
pub mod window;

pub mod prelude {
    pub use crate::traits::*;
    pub use crate::window::{Estimator, MovingWindow};
}

pub use traits::{WindowError, WindowStatistic};
pub use window::{Estimator, MovingWindow};
