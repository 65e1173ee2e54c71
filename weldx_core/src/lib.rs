// weldx_core/src/lib.rs

// Coordinate system hierarchies, time series and their tagged tree format.
pub mod annotations;
pub mod asdf;
pub mod error;
pub mod expression;
pub mod prelude;
pub mod time;
pub mod time_series;
pub mod transformations;
pub mod units;
pub mod utils;
pub mod welding;
