// weldx_core/src/prelude.rs

// --- Core Abstractions ---
pub use crate::annotations::{Annotated, Annotations};
pub use crate::asdf::validation::{BuiltinSchemas, SchemaValidator, Violation};
pub use crate::asdf::TreeConverter;
pub use crate::error::{Result, WeldxError};
pub use crate::expression::MathematicalExpression;

// --- Core Data Structures ---
pub use crate::time::{ReferenceTime, TimeAxis};
pub use crate::time_series::{Interpolation, TimeSeries};
pub use crate::transformations::{
    Coordinates, CoordinateSystemManager, LocalCoordinateSystem, Motion, Subsystem,
};
pub use crate::units::{LengthUnit, Quantity};
pub use crate::welding::JointPenetration;

// --- Persistence ---
pub use crate::asdf::file::WeldxFile;
pub use crate::asdf::{from_tagged, to_tagged};
