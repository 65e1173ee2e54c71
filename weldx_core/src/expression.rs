// weldx_core/src/expression.rs

//! Parameterized mathematical expressions, e.g. `a * t + b` with fixed `a` and `b`.

use std::collections::{BTreeMap, BTreeSet};

use evalexpr::{
    build_operator_tree, ContextWithMutableFunctions, ContextWithMutableVariables, EvalexprError,
    Function, HashMapContext, Node, Value,
};

use crate::error::{Result, WeldxError};
use crate::units::Quantity;

/// Identifiers with a predefined meaning; never free variables.
const CONSTANTS: [(&str, f64); 1] = [("pi", std::f64::consts::PI)];

/// An expression string plus constant values for some of its variables.
///
/// The remaining free variables are supplied at evaluation. Parameters keep
/// their unit label; only the numeric value enters the evaluation. Both `^`
/// and `**` are accepted for powers, and the common functions (`sin`, `cos`,
/// `tan`, `exp`, `sqrt`, `log`, `abs`) are available by their plain names.
#[derive(Debug, Clone)]
pub struct MathematicalExpression {
    expression: String,
    parameters: BTreeMap<String, Quantity>,
    tree: Node,
}

impl PartialEq for MathematicalExpression {
    fn eq(&self, other: &Self) -> bool {
        self.expression == other.expression && self.parameters == other.parameters
    }
}

impl MathematicalExpression {
    /// Parses `expression`; every parameter must name a variable of it.
    pub fn new(expression: impl Into<String>, parameters: BTreeMap<String, Quantity>) -> Result<Self> {
        let expression = expression.into();
        let tree = build_operator_tree(&expression.replace("**", "^")).map_err(expression_error)?;
        let mut expr = Self {
            expression,
            parameters: BTreeMap::new(),
            tree,
        };
        for (name, value) in parameters {
            expr.set_parameter(name, value)?;
        }
        Ok(expr)
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn parameters(&self) -> &BTreeMap<String, Quantity> {
        &self.parameters
    }

    pub fn set_parameter(&mut self, name: impl Into<String>, value: Quantity) -> Result<()> {
        let name = name.into();
        if !self.symbols().contains(name.as_str()) {
            return Err(WeldxError::Expression(format!(
                "'{}' has no parameter '{name}'",
                self.expression
            )));
        }
        self.parameters.insert(name, value);
        Ok(())
    }

    /// Variables that are not fixed by a parameter, sorted by name.
    pub fn variable_names(&self) -> Vec<&str> {
        self.symbols()
            .into_iter()
            .filter(|s| !self.parameters.contains_key(*s))
            .collect()
    }

    /// Evaluates with the given free variable values.
    ///
    /// A scalar result yields one component, a tuple `(x, y, z)` one per element.
    pub fn evaluate(&self, variables: &[(&str, f64)]) -> Result<Vec<f64>> {
        if let Some((name, _)) = variables.iter().find(|(n, _)| self.parameters.contains_key(*n)) {
            return Err(WeldxError::Expression(format!(
                "'{name}' is already defined as a parameter"
            )));
        }
        let mut context = base_context().map_err(expression_error)?;
        let values = self
            .parameters
            .iter()
            .map(|(name, q)| (name.as_str(), q.value))
            .chain(variables.iter().copied());
        for (name, value) in values {
            context
                .set_value(name.to_string(), Value::Float(value))
                .map_err(expression_error)?;
        }

        match self.tree.eval_with_context(&context).map_err(expression_error)? {
            Value::Tuple(items) => items
                .iter()
                .map(|v| v.as_number().map_err(expression_error))
                .collect(),
            other => Ok(vec![other.as_number().map_err(expression_error)?]),
        }
    }

    fn symbols(&self) -> BTreeSet<&str> {
        self.tree
            .iter_variable_identifiers()
            .filter(|id| !CONSTANTS.iter().any(|(c, _)| c == id))
            .collect()
    }
}

fn base_context() -> std::result::Result<HashMapContext, EvalexprError> {
    let mut context = HashMapContext::new();
    for (name, value) in CONSTANTS {
        context.set_value(name.to_string(), Value::Float(value))?;
    }
    let unary: [(&str, fn(f64) -> f64); 7] = [
        ("sin", f64::sin),
        ("cos", f64::cos),
        ("tan", f64::tan),
        ("exp", f64::exp),
        ("sqrt", f64::sqrt),
        ("log", f64::ln),
        ("abs", f64::abs),
    ];
    for (name, f) in unary {
        context.set_function(
            name.to_string(),
            Function::new(move |arg| Ok(Value::Float(f(arg.as_number()?)))),
        )?;
    }
    Ok(context)
}

fn expression_error(e: EvalexprError) -> WeldxError {
    WeldxError::Expression(e.to_string())
}
