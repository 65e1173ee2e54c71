// weldx_core/src/asdf/tree.rs

//! Small accessors for reading typed fields out of YAML mappings.

use nalgebra::{Matrix3, Vector3};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_yaml::{Mapping, Value};

use crate::error::{Result, WeldxError};

pub(crate) fn take(tree: &mut Mapping, key: &str) -> Result<Value> {
    match tree.remove(key) {
        None | Some(Value::Null) => Err(WeldxError::malformed(key, "missing required field")),
        Some(v) => Ok(v),
    }
}

pub(crate) fn take_opt(tree: &mut Mapping, key: &str) -> Option<Value> {
    match tree.remove(key) {
        None | Some(Value::Null) => None,
        Some(v) => Some(v),
    }
}

pub(crate) fn as_string(value: Value, path: &str) -> Result<String> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(WeldxError::malformed(path, format!("expected a string, found {}", kind(&other)))),
    }
}

pub(crate) fn take_string(tree: &mut Mapping, key: &str) -> Result<String> {
    as_string(take(tree, key)?, key)
}

pub(crate) fn as_f64(value: &Value, path: &str) -> Result<f64> {
    value
        .as_f64()
        .ok_or_else(|| WeldxError::malformed(path, format!("expected a number, found {}", kind(value))))
}

pub(crate) fn as_seq(value: Value, path: &str) -> Result<Vec<Value>> {
    match value {
        Value::Sequence(s) => Ok(s),
        other => Err(WeldxError::malformed(path, format!("expected a sequence, found {}", kind(&other)))),
    }
}

pub(crate) fn as_mapping(value: Value, path: &str) -> Result<Mapping> {
    match value {
        Value::Mapping(m) => Ok(m),
        other => Err(WeldxError::malformed(path, format!("expected a mapping, found {}", kind(&other)))),
    }
}

pub(crate) fn as_f64_list(value: &Value, path: &str) -> Result<Vec<f64>> {
    let Value::Sequence(items) = value else {
        return Err(WeldxError::malformed(path, format!("expected a sequence, found {}", kind(value))));
    };
    items
        .iter()
        .enumerate()
        .map(|(i, v)| as_f64(v, &format!("{path}/{i}")))
        .collect()
}

pub(crate) fn as_vector3(value: &Value, path: &str) -> Result<Vector3<f64>> {
    let v = as_f64_list(value, path)?;
    match v.as_slice() {
        [x, y, z] => Ok(Vector3::new(*x, *y, *z)),
        _ => Err(WeldxError::malformed(path, format!("expected 3 components, found {}", v.len()))),
    }
}

/// Reads a row-major 3x3 matrix.
pub(crate) fn as_matrix3(value: &Value, path: &str) -> Result<Matrix3<f64>> {
    let Value::Sequence(rows) = value else {
        return Err(WeldxError::malformed(path, "expected a 3x3 nested sequence"));
    };
    if rows.len() != 3 {
        return Err(WeldxError::malformed(path, format!("expected 3 rows, found {}", rows.len())));
    }
    let mut m = Matrix3::zeros();
    for (r, row) in rows.iter().enumerate() {
        let row = as_vector3(row, &format!("{path}/{r}"))?;
        m.set_row(r, &row.transpose());
    }
    Ok(m)
}

pub(crate) fn vector_value(v: &Vector3<f64>) -> Value {
    Value::Sequence(v.iter().map(|c| Value::from(*c)).collect())
}

pub(crate) fn matrix_value(m: &Matrix3<f64>) -> Value {
    Value::Sequence(
        m.row_iter()
            .map(|row| Value::Sequence(row.iter().map(|c| Value::from(*c)).collect()))
            .collect(),
    )
}

/// Serializes a plain record struct into a mapping.
pub(crate) fn to_record<T: Serialize>(record: &T) -> Result<Mapping> {
    match serde_yaml::to_value(record)? {
        Value::Mapping(m) => Ok(m),
        other => Err(WeldxError::malformed("", format!("expected a mapping, found {}", kind(&other)))),
    }
}

/// Deserializes a record struct, reporting the offending field as the path
/// when serde names one.
pub(crate) fn from_record<T: DeserializeOwned>(tree: Mapping) -> Result<T> {
    serde_yaml::from_value(Value::Mapping(tree)).map_err(|e| {
        let message = e.to_string();
        let field = message
            .split('`')
            .nth(1)
            .filter(|_| message.starts_with("missing field") || message.starts_with("unknown field"))
            .unwrap_or_default()
            .to_string();
        WeldxError::malformed(field, message)
    })
}

/// Prepends `prefix` to the property path of tree errors raised by nested records.
pub(crate) fn nested<T>(prefix: &str, result: Result<T>) -> Result<T> {
    result.map_err(|e| match e {
        WeldxError::MalformedTree { path, message } => WeldxError::MalformedTree {
            path: if path.is_empty() {
                prefix.to_string()
            } else {
                format!("{prefix}/{path}")
            },
            message,
        },
        other => other,
    })
}

/// Removes null entries from mappings, recursively.
pub(crate) fn drop_nulls(value: &mut Value) {
    match value {
        Value::Mapping(m) => {
            m.retain(|_, v| !v.is_null());
            for (_, v) in m.iter_mut() {
                drop_nulls(v);
            }
        }
        Value::Sequence(items) => items.iter_mut().for_each(drop_nulls),
        Value::Tagged(tagged) => drop_nulls(&mut tagged.value),
        _ => {}
    }
}

/// Human readable kind of a YAML node, for messages.
pub(crate) fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged node",
    }
}
