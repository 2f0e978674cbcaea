//! Aggregation of closed windows
//!
//! Aggregators accumulate the numeric values of one group; [`ReduceOperator`]
//! drives them per group as the batch aggregator inside windows.
//!
//! # Available Aggregators
//!
//! - [`CountAggregator`]: Count the number of values
//! - [`SumAggregator`]: Sum all values
//! - [`AverageAggregator`]: Compute the mean
//! - [`MinAggregator`]: Track the minimum value
//! - [`MaxAggregator`]: Track the maximum value
//!
//! # Examples
//!
//! ```rust
//! use processor::aggregation::{Aggregator, AverageAggregator};
//!
//! let mut agg = AverageAggregator::new();
//! agg.update(10.0);
//! agg.update(20.0);
//! agg.update(30.0);
//!
//! assert_eq!(agg.finalize(), Some(20.0));
//! ```

mod avg;
mod count;
mod minmax;
pub mod reduce;
mod sum;
mod trait_;

pub use avg::AverageAggregator;
pub use count::CountAggregator;
pub use minmax::{MaxAggregator, MinAggregator};
pub use reduce::{AggregateKind, ReduceOperator};
pub use sum::SumAggregator;
pub use trait_::{Aggregator, ToF64};
