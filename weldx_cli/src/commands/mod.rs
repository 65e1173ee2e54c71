// weldx_cli/src/commands/mod.rs

//! One module per subcommand. Each returns the text it prints so it can be tested.

pub mod demo;
pub mod inspect;
pub mod transform;
pub mod validate;

use anyhow::Context;
use std::fs;
use std::path::Path;
use weldx_core::prelude::*;

/// Reads `path` with the configured validator.
pub(crate) fn load(path: &Path, validator: Option<Box<dyn SchemaValidator>>) -> anyhow::Result<WeldxFile> {
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    WeldxFile::parse(&bytes, validator).with_context(|| format!("failed to load {}", path.display()))
}

/// Top-level keys whose entry is a coordinate system hierarchy.
pub(crate) fn csm_keys(file: &WeldxFile) -> Vec<String> {
    file.entries()
        .into_iter()
        .filter(|(_, tag)| {
            tag.as_deref()
                .and_then(weldx_core::asdf::tags::WeldxTag::parse)
                .is_some_and(|t| t.matches(CoordinateSystemManager::NAME, CoordinateSystemManager::VERSION))
        })
        .map(|(key, _)| key.to_string())
        .collect()
}
