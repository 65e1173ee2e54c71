// weldx_core/src/utils/mod.rs

pub mod interpolation;
