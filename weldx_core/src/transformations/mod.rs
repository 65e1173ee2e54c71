// weldx_core/src/transformations/mod.rs

//! Coordinate systems and the manager that arranges them as a tree.

pub mod csm;
pub mod lcs;
pub mod subsystems;

pub use csm::{CoordinateSystemManager, DEFAULT_CSM_NAME};
pub use lcs::{Coordinates, LocalCoordinateSystem, Motion};
pub use subsystems::Subsystem;
