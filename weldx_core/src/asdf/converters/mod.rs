// weldx_core/src/asdf/converters/mod.rs

//! [`TreeConverter`](crate::asdf::TreeConverter) implementations, one file per record family.

mod csm;
mod expression;
mod lcs;
mod time;
mod time_series;
mod welding;
