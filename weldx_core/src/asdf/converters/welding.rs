// weldx_core/src/asdf/converters/welding.rs

use serde_yaml::Mapping;

use crate::annotations::{Annotated, Annotations};
use crate::asdf::tree::{from_record, nested, to_record};
use crate::asdf::TreeConverter;
use crate::error::Result;
use crate::welding::JointPenetration;

impl TreeConverter for JointPenetration {
    const NAME: &'static str = "aws/design/joint_penetration";
    const VERSION: &'static str = "1.0.0";

    fn to_tree(&self) -> Result<Mapping> {
        to_record(self)
    }

    fn from_tree(tree: Mapping) -> Result<Self> {
        let jp: JointPenetration = from_record(tree)?;
        nested("root_penetration", jp.root_penetration.as_length())?;
        Ok(jp)
    }

    fn tree_annotations(&self) -> Option<&Annotations> {
        Some(self.annotations())
    }

    fn restore_annotations(&mut self, annotations: Annotations) {
        *self.annotations_mut() = annotations;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asdf::{from_tagged, to_tagged};
    use crate::error::WeldxError;
    use crate::units::Quantity;
    use serde_yaml::Value;

    #[test]
    fn test_unset_sizes_are_not_written() {
        let mut jp = JointPenetration::new("partial", Quantity::new(1.5, "mm")).unwrap();
        jp.weld_size_e1 = Some(4.0);
        let Value::Tagged(tagged) = to_tagged(&jp).unwrap() else {
            panic!("expected a tagged node");
        };
        let tree = tagged.value.as_mapping().unwrap();
        assert!(tree.contains_key("weld_size_E1"));
        assert!(!tree.contains_key("weld_size"));
        assert!(!tree.contains_key("depth_of_fusion"));
    }

    #[test]
    fn test_roundtrip_with_metadata() {
        let mut jp = JointPenetration::new("complete", Quantity::new(0.0, "mm")).unwrap();
        jp.groove_weld_size = Some(8.0);
        let mut aws = Mapping::new();
        aws.insert("edition".into(), "D1.1:2020".into());
        jp.annotations_mut().insert_metadata("AWS", aws);
        let back: JointPenetration = from_tagged(to_tagged(&jp).unwrap()).unwrap();
        assert_eq!(back, jp);
    }

    #[test]
    fn test_missing_and_invalid_fields() {
        let jp = JointPenetration::new("partial", Quantity::new(1.5, "mm")).unwrap();
        let mut tree = jp.to_tree().unwrap();
        tree.remove("complete_or_partial");
        assert!(matches!(
            JointPenetration::from_tree(tree),
            Err(WeldxError::MalformedTree { path, .. }) if path == "complete_or_partial"
        ));

        let mut tree = jp.to_tree().unwrap();
        let mut seconds = Mapping::new();
        seconds.insert("value".into(), 2.0.into());
        seconds.insert("unit".into(), "s".into());
        tree.insert("root_penetration".into(), Value::Mapping(seconds));
        assert!(JointPenetration::from_tree(tree).is_err());
    }
}
