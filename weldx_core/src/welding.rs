// weldx_core/src/welding.rs

//! Welding design records.

use serde::{Deserialize, Serialize};

use crate::annotations::{Annotated, Annotations};
use crate::error::Result;
use crate::units::Quantity;

/// Joint penetration of a groove weld (AWS design nomenclature).
///
/// All optional sizes are plain numbers in the unit of `root_penetration`.
/// The serde form is the tree record; unset sizes are left out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointPenetration {
    pub complete_or_partial: String,
    pub root_penetration: Quantity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groove_weld_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incomplete_joint_penetration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weld_size: Option<f64>,
    #[serde(rename = "weld_size_E1", default, skip_serializing_if = "Option::is_none")]
    pub weld_size_e1: Option<f64>,
    #[serde(rename = "weld_size_E2", default, skip_serializing_if = "Option::is_none")]
    pub weld_size_e2: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth_of_fusion: Option<f64>,
    #[serde(skip)]
    pub annotations: Annotations,
}

impl JointPenetration {
    /// Checks that `root_penetration` is a length.
    pub fn new(complete_or_partial: impl Into<String>, root_penetration: Quantity) -> Result<Self> {
        root_penetration.as_length()?;
        Ok(Self {
            complete_or_partial: complete_or_partial.into(),
            root_penetration,
            groove_weld_size: None,
            incomplete_joint_penetration: None,
            weld_size: None,
            weld_size_e1: None,
            weld_size_e2: None,
            depth_of_fusion: None,
            annotations: Annotations::default(),
        })
    }
}

impl Annotated for JointPenetration {
    fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    fn annotations_mut(&mut self) -> &mut Annotations {
        &mut self.annotations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_penetration_must_be_a_length() {
        assert!(JointPenetration::new("partial", Quantity::new(2.0, "mm")).is_ok());
        assert!(JointPenetration::new("partial", Quantity::new(2.0, "s")).is_err());
    }
}
