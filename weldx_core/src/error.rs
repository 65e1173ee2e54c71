// weldx_core/src/error.rs

use thiserror::Error;

use crate::asdf::validation::Violation;

/// Every failure the core library can report.
///
/// Each variant carries the name (node, subsystem, tag) or property path that
/// caused it so callers can surface a precise message without extra context.
#[derive(Debug, Error)]
pub enum WeldxError {
    // --- Graph errors ---
    #[error("coordinate system '{0}' already exists")]
    NodeExists(String),

    #[error("coordinate system '{0}' not found")]
    NodeNotFound(String),

    #[error("reference system '{parent}' of '{name}' not found")]
    ParentNotFound { name: String, parent: String },

    #[error("name collision while merging '{subsystem}': '{name}' already exists")]
    NameCollision { subsystem: String, name: String },

    #[error("cannot modify '{name}': {reason}")]
    InvalidOperation { name: String, reason: String },

    #[error("subsystem '{0}' not found")]
    SubsystemNotFound(String),

    // --- Data errors ---
    #[error("shape mismatch: {0}")]
    Shape(String),

    #[error("unit error: {0}")]
    Unit(String),

    #[error("orientation at index {index} is not a proper rotation matrix")]
    InvalidOrientation { index: usize },

    #[error("expression error: {0}")]
    Expression(String),

    #[error("time {requested} is outside the valid range [{start}, {end}]")]
    TimeRange {
        requested: String,
        start: String,
        end: String,
    },

    // --- Tree errors ---
    #[error("unresolved or cyclic references for coordinate systems: {}", .0.join(", "))]
    CyclicOrUnresolvedReference(Vec<String>),

    #[error("schema validation failed for '{tag}': {}", format_violations(.violations))]
    SchemaValidation {
        tag: String,
        violations: Vec<Violation>,
    },

    #[error("unknown or unexpected tag '{found}' (expected '{expected}')")]
    UnknownTag { expected: String, found: String },

    #[error("malformed tree at '{path}': {message}")]
    MalformedTree { path: String, message: String },

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, WeldxError>;

impl WeldxError {
    /// Shorthand used by the converters when a field is missing or has the wrong kind.
    pub fn malformed(path: impl Into<String>, message: impl Into<String>) -> Self {
        WeldxError::MalformedTree {
            path: path.into(),
            message: message.into(),
        }
    }
}

fn format_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
