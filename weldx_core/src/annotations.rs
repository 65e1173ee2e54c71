// weldx_core/src/annotations.rs

//! Optional, untyped side-channel data that every persistable entity carries.
//!
//! `metadata` maps a standard name (e.g. `"ISO 4063"`) to a mapping of
//! standard-specific fields; `user` is a free-form mapping for notes. The core
//! never interprets either; both are written and read back unchanged.

use serde_yaml::{Mapping, Value};

use crate::error::{Result, WeldxError};

/// Tree key holding the standard-specific metadata.
pub const METADATA_KEY: &str = "wx_metadata";
/// Tree key holding free-form user data.
pub const USER_KEY: &str = "wx_user";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Annotations {
    metadata: Option<Mapping>,
    user: Option<Mapping>,
}

impl Annotations {
    pub fn is_empty(&self) -> bool {
        self.metadata.is_none() && self.user.is_none()
    }

    pub fn metadata(&self) -> Option<&Mapping> {
        self.metadata.as_ref()
    }

    pub fn user(&self) -> Option<&Mapping> {
        self.user.as_ref()
    }

    /// Adds (or replaces) the entries recorded for one standard.
    pub fn insert_metadata(&mut self, standard: impl Into<String>, entries: Mapping) {
        self.metadata
            .get_or_insert_with(Mapping::new)
            .insert(Value::String(standard.into()), Value::Mapping(entries));
    }

    pub fn insert_user(&mut self, key: impl Into<String>, value: Value) {
        self.user
            .get_or_insert_with(Mapping::new)
            .insert(Value::String(key.into()), value);
    }

    /// Writes both side channels into `tree` when they are set.
    pub fn write_into(&self, tree: &mut Mapping) {
        if let Some(meta) = &self.metadata {
            tree.insert(METADATA_KEY.into(), Value::Mapping(meta.clone()));
        }
        if let Some(user) = &self.user {
            tree.insert(USER_KEY.into(), Value::Mapping(user.clone()));
        }
    }

    /// Removes both side channels from `tree` and returns them.
    pub fn take_from(tree: &mut Mapping) -> Result<Self> {
        let metadata = match tree.remove(METADATA_KEY) {
            None | Some(Value::Null) => None,
            Some(Value::Mapping(m)) => {
                if let Some((key, _)) = m.iter().find(|(_, v)| !v.is_mapping()) {
                    return Err(WeldxError::malformed(
                        format!("{METADATA_KEY}/{}", key.as_str().unwrap_or("?")),
                        "metadata entries must be mappings",
                    ));
                }
                Some(m)
            }
            Some(_) => return Err(WeldxError::malformed(METADATA_KEY, "expected a mapping")),
        };
        let user = match tree.remove(USER_KEY) {
            None | Some(Value::Null) => None,
            Some(Value::Mapping(m)) => Some(m),
            Some(_) => return Err(WeldxError::malformed(USER_KEY, "expected a mapping")),
        };
        Ok(Self { metadata, user })
    }
}

/// Implemented by every entity that can carry [`Annotations`].
pub trait Annotated {
    fn annotations(&self) -> &Annotations;
    fn annotations_mut(&mut self) -> &mut Annotations;
}
