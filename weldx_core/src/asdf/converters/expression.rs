// weldx_core/src/asdf/converters/expression.rs

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_yaml::Mapping;

use crate::asdf::tree::{from_record, to_record};
use crate::asdf::TreeConverter;
use crate::error::Result;
use crate::expression::MathematicalExpression;
use crate::units::Quantity;

#[derive(Serialize, Deserialize)]
struct ExpressionRecord {
    expression: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    parameters: BTreeMap<String, Quantity>,
}

impl TreeConverter for MathematicalExpression {
    const NAME: &'static str = "core/mathematical_expression";
    const VERSION: &'static str = "0.1.0";

    fn to_tree(&self) -> Result<Mapping> {
        to_record(&ExpressionRecord {
            expression: self.expression().to_string(),
            parameters: self.parameters().clone(),
        })
    }

    fn from_tree(tree: Mapping) -> Result<Self> {
        let record: ExpressionRecord = from_record(tree)?;
        MathematicalExpression::new(record.expression, record.parameters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asdf::{from_tagged, to_tagged};
    use crate::error::WeldxError;

    #[test]
    fn test_parameters_keep_units() {
        let params = BTreeMap::from([("v".to_string(), Quantity::new(6.0, "mm/s"))]);
        let expr = MathematicalExpression::new("v * t", params).unwrap();
        let tree = expr.to_tree().unwrap();
        assert_eq!(tree["parameters"]["v"]["unit"].as_str(), Some("mm/s"));

        let back: MathematicalExpression = from_tagged(to_tagged(&expr).unwrap()).unwrap();
        assert_eq!(back, expr);
        assert_eq!(back.evaluate(&[("t", 2.0)]).unwrap(), vec![12.0]);
    }

    #[test]
    fn test_bad_expression_in_tree() {
        let mut tree = Mapping::new();
        tree.insert("expression".into(), "v * (t".into());
        assert!(matches!(
            MathematicalExpression::from_tree(tree),
            Err(WeldxError::Expression(_))
        ));
    }
}
