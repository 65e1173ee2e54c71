// weldx_cli/src/prelude.rs

// Re-export the entire weldx_core prelude so commands and embedding tools can
// reach the entities, converters and the file type from one place.
pub use weldx_core::prelude::*;

// CLI-specific types.
pub use crate::cli::{Cli, Command};
pub use crate::config::{InterpolationConfig, LoggingConfig, ValidationConfig, WeldxConfig};
