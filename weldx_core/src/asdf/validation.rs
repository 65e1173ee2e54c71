// weldx_core/src/asdf/validation.rs

use std::fmt::{self, Debug};

use dyn_clone::DynClone;
use serde_yaml::Value;

use crate::asdf::tags::{tag_str, WeldxTag};
use crate::asdf::tree::kind;

/// One schema violation, located by its property path (`coordinate_systems/2/parent_system`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub path: String,
    pub message: String,
}

impl Violation {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "<root>: {}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// Checks a tagged tree against the schema registered for its tag.
///
/// Implementations return every violation they find; an empty list means the
/// tree is valid. Unknown tags should pass unless the validator is strict.
pub trait SchemaValidator: DynClone + Debug + Send + Sync {
    fn validate(&self, tag: &str, tree: &Value) -> Vec<Violation>;
}

dyn_clone::clone_trait_object!(SchemaValidator);

// =========================================================================
// == Built-in schemas ==
// =========================================================================

#[derive(Debug, Clone, Copy)]
enum Kind {
    Str,
    Number,
    OneOf(&'static [&'static str]),
    StrList,
    NumberList,
    /// Sequence of anything (checked by the converter).
    Sequence,
    /// `{ value: number, unit: string }`
    Quantity,
    /// Mapping of names to quantities.
    QuantityMap,
    Records(&'static [Field]),
    Tagged(&'static str),
}

#[derive(Debug, Clone, Copy)]
struct Field {
    key: &'static str,
    kind: Kind,
    required: bool,
}

const fn req(key: &'static str, kind: Kind) -> Field {
    Field { key, kind, required: true }
}

const fn opt(key: &'static str, kind: Kind) -> Field {
    Field { key, kind, required: false }
}

#[derive(Debug)]
struct Schema {
    name: &'static str,
    version: &'static str,
    fields: &'static [Field],
    /// Exactly one of these keys must be present.
    exclusive: &'static [&'static str],
}

const LCS_TAG: &str = "core/transformations/local_coordinate_system";
const TIMESTAMP_TAG: &str = "time/timestamp";
const TIMEDELTA_TAG: &str = "time/timedelta";
const TDI_TAG: &str = "time/timedeltaindex";
const EXPRESSION_TAG: &str = "core/mathematical_expression";

const CS_RECORD: &[Field] = &[
    req("name", Kind::Str),
    req("parent_system", Kind::Str),
    req("transformation", Kind::Tagged(LCS_TAG)),
];

const SUBSYSTEM_RECORD: &[Field] = &[
    req("name", Kind::Str),
    req("parent_system", Kind::Str),
    req("root_cs", Kind::Str),
    opt("reference_time", Kind::Tagged(TIMESTAMP_TAG)),
    req("members", Kind::StrList),
    req("subsystem_names", Kind::StrList),
];

const SCHEMAS: &[Schema] = &[
    Schema {
        name: LCS_TAG,
        version: "0.1.0",
        fields: &[
            opt("time", Kind::Tagged(TDI_TAG)),
            opt("reference_time", Kind::Tagged(TIMESTAMP_TAG)),
            req("unit", Kind::Str),
            req("coordinates", Kind::Sequence),
            req("orientations", Kind::Sequence),
        ],
        exclusive: &[],
    },
    Schema {
        name: "core/transformations/coordinate_system_hierarchy",
        version: "0.1.0",
        fields: &[
            req("name", Kind::Str),
            req("root_system_name", Kind::Str),
            opt("reference_time", Kind::Tagged(TIMESTAMP_TAG)),
            req("coordinate_systems", Kind::Records(CS_RECORD)),
            opt("subsystems", Kind::Records(SUBSYSTEM_RECORD)),
        ],
        exclusive: &[],
    },
    Schema {
        name: "core/time_series",
        version: "0.1.0",
        fields: &[
            opt("values", Kind::Sequence),
            opt("expression", Kind::Tagged(EXPRESSION_TAG)),
            req("unit", Kind::Str),
            opt("time", Kind::Tagged(TDI_TAG)),
            opt("interpolation", Kind::OneOf(&["step", "linear"])),
            opt("reference_time", Kind::Tagged(TIMESTAMP_TAG)),
        ],
        exclusive: &["values", "expression"],
    },
    Schema {
        name: EXPRESSION_TAG,
        version: "0.1.0",
        fields: &[req("expression", Kind::Str), opt("parameters", Kind::QuantityMap)],
        exclusive: &[],
    },
    Schema {
        name: TIMESTAMP_TAG,
        version: "1.0.0",
        fields: &[req("value", Kind::Str)],
        exclusive: &[],
    },
    Schema {
        name: TIMEDELTA_TAG,
        version: "1.0.0",
        fields: &[req("value", Kind::Str)],
        exclusive: &[],
    },
    Schema {
        name: TDI_TAG,
        version: "1.0.0",
        fields: &[
            opt("values", Kind::NumberList),
            opt("freq", Kind::Str),
            req("start", Kind::Tagged(TIMEDELTA_TAG)),
            req("end", Kind::Tagged(TIMEDELTA_TAG)),
            req("min", Kind::Tagged(TIMEDELTA_TAG)),
            req("max", Kind::Tagged(TIMEDELTA_TAG)),
        ],
        exclusive: &["values", "freq"],
    },
    Schema {
        name: "aws/design/joint_penetration",
        version: "1.0.0",
        fields: &[
            req("complete_or_partial", Kind::Str),
            req("root_penetration", Kind::Quantity),
            opt("groove_weld_size", Kind::Number),
            opt("incomplete_joint_penetration", Kind::Number),
            opt("weld_size", Kind::Number),
            opt("weld_size_E1", Kind::Number),
            opt("weld_size_E2", Kind::Number),
            opt("depth_of_fusion", Kind::Number),
        ],
        exclusive: &[],
    },
];

/// Structural validator for every tag this crate writes.
///
/// Checks required keys, value kinds and nested tagged nodes. With
/// `strict_tags`, weldx tags without a registered schema (or with an
/// unsupported major version) are reported too; foreign tags always pass.
#[derive(Debug, Clone, Default)]
pub struct BuiltinSchemas {
    pub strict_tags: bool,
}

impl BuiltinSchemas {
    pub fn strict() -> Self {
        Self { strict_tags: true }
    }

    /// Every `(name, version)` pair with a registered schema.
    pub fn known_tags() -> impl Iterator<Item = (&'static str, &'static str)> {
        SCHEMAS.iter().map(|s| (s.name, s.version))
    }

    fn check_tagged(&self, tag: &str, tree: &Value, path: &str, out: &mut Vec<Violation>) {
        let Some(parsed) = WeldxTag::parse(tag) else {
            return;
        };
        match SCHEMAS.iter().find(|s| parsed.matches(s.name, s.version)) {
            Some(schema) => check_schema(self, schema, tree, path, out),
            None if self.strict_tags => {
                out.push(Violation::new(path, format!("no schema registered for tag '{tag}'")))
            }
            None => {}
        }
    }
}

impl SchemaValidator for BuiltinSchemas {
    fn validate(&self, tag: &str, tree: &Value) -> Vec<Violation> {
        let mut out = Vec::new();
        self.check_tagged(tag, tree, "", &mut out);
        out
    }
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}/{key}")
    }
}

fn check_schema(v: &BuiltinSchemas, schema: &Schema, tree: &Value, path: &str, out: &mut Vec<Violation>) {
    let Value::Mapping(map) = tree else {
        out.push(Violation::new(path, format!("expected a mapping, found {}", kind(tree))));
        return;
    };
    check_fields(v, schema.fields, map, path, out);
    if !schema.exclusive.is_empty() {
        let present = schema
            .exclusive
            .iter()
            .filter(|k| map.get(**k).is_some_and(|v| !v.is_null()))
            .count();
        if present != 1 {
            out.push(Violation::new(
                path,
                format!("exactly one of {} is required", schema.exclusive.join(", ")),
            ));
        }
    }
}

fn check_fields(
    v: &BuiltinSchemas,
    fields: &[Field],
    map: &serde_yaml::Mapping,
    path: &str,
    out: &mut Vec<Violation>,
) {
    for field in fields {
        let here = join(path, field.key);
        match map.get(field.key) {
            None | Some(Value::Null) => {
                if field.required {
                    out.push(Violation::new(here, "required property is missing"));
                }
            }
            Some(value) => check_kind(v, field.kind, value, &here, out),
        }
    }
}

fn check_kind(v: &BuiltinSchemas, kind_: Kind, value: &Value, path: &str, out: &mut Vec<Violation>) {
    let mismatch = |expected: &str| {
        Violation::new(path, format!("expected {expected}, found {}", kind(value)))
    };
    match kind_ {
        Kind::Str if !value.is_string() => out.push(mismatch("a string")),
        Kind::Number if !value.is_number() => out.push(mismatch("a number")),
        Kind::OneOf(allowed) => match value.as_str() {
            Some(s) if allowed.contains(&s) => {}
            _ => out.push(Violation::new(
                path,
                format!("expected one of {}", allowed.join(", ")),
            )),
        },
        Kind::Sequence if !value.is_sequence() => out.push(mismatch("a sequence")),
        Kind::StrList => check_list(value, path, Value::is_string, "a string", out),
        Kind::NumberList => check_list(value, path, Value::is_number, "a number", out),
        Kind::Quantity => match value {
            Value::Mapping(m) => check_fields(
                v,
                &[req("value", Kind::Number), req("unit", Kind::Str)],
                m,
                path,
                out,
            ),
            _ => out.push(mismatch("a quantity mapping")),
        },
        Kind::QuantityMap => match value {
            Value::Mapping(m) => {
                for (name, quantity) in m {
                    let here = join(path, name.as_str().unwrap_or("?"));
                    check_kind(v, Kind::Quantity, quantity, &here, out);
                }
            }
            _ => out.push(mismatch("a mapping")),
        },
        Kind::Records(fields) => match value {
            Value::Sequence(items) => {
                for (i, item) in items.iter().enumerate() {
                    let here = join(path, &i.to_string());
                    match item {
                        Value::Mapping(m) => check_fields(v, fields, m, &here, out),
                        other => out.push(Violation::new(
                            here,
                            format!("expected a mapping, found {}", kind(other)),
                        )),
                    }
                }
            }
            _ => out.push(mismatch("a sequence")),
        },
        Kind::Tagged(name) => match value {
            Value::Tagged(tagged) => {
                let tag = tag_str(&tagged.tag);
                match WeldxTag::parse(&tag) {
                    Some(t) if t.name == name => v.check_tagged(&tag, &tagged.value, path, out),
                    _ => out.push(Violation::new(path, format!("expected tag '{name}', found '{tag}'"))),
                }
            }
            _ => out.push(mismatch(&format!("a node tagged '{name}'"))),
        },
        _ => {}
    }
}

fn check_list(
    value: &Value,
    path: &str,
    ok: fn(&Value) -> bool,
    expected: &str,
    out: &mut Vec<Violation>,
) {
    let Value::Sequence(items) = value else {
        out.push(Violation::new(path, format!("expected a sequence, found {}", kind(value))));
        return;
    };
    for (i, item) in items.iter().enumerate() {
        if !ok(item) {
            out.push(Violation::new(
                join(path, &i.to_string()),
                format!("expected {expected}, found {}", kind(item)),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asdf::tags::format_tag;

    fn csm_tag() -> String {
        format_tag("core/transformations/coordinate_system_hierarchy", "0.1.0")
    }

    #[test]
    fn test_missing_parent_system_reports_path() {
        let lcs = format!(
            "!{} {{unit: mm, coordinates: [[0, 0, 0]], orientations: [[[1, 0, 0], [0, 1, 0], [0, 0, 1]]]}}",
            format_tag(LCS_TAG, "0.1.0")
        );
        let text = format!(
            "name: cell\nroot_system_name: base\ncoordinate_systems:\n  - {{name: a, parent_system: base, transformation: {lcs}}}\n  - {{name: b, transformation: {lcs}}}\n"
        );
        let tree: Value = serde_yaml::from_str(&text).unwrap();
        let violations = BuiltinSchemas::default().validate(&csm_tag(), &tree);
        assert_eq!(violations.len(), 1, "{violations:?}");
        assert_eq!(violations[0].path, "coordinate_systems/1/parent_system");
    }

    #[test]
    fn test_wrong_kinds_are_reported() {
        let tree: Value =
            serde_yaml::from_str("name: 3\nroot_system_name: base\ncoordinate_systems: {}\n").unwrap();
        let violations = BuiltinSchemas::default().validate(&csm_tag(), &tree);
        let paths: Vec<&str> = violations.iter().map(|v| v.path.as_str()).collect();
        assert_eq!(paths, vec!["name", "coordinate_systems"]);
    }

    #[test]
    fn test_timedeltaindex_needs_values_or_freq() {
        let td = format!("!{} {{value: P0DT0H0M0S}}", format_tag(TIMEDELTA_TAG, "1.0.0"));
        let text = format!("start: {td}\nend: {td}\nmin: {td}\nmax: {td}\n");
        let tree: Value = serde_yaml::from_str(&text).unwrap();
        let violations = BuiltinSchemas::default().validate(&format_tag(TDI_TAG, "1.0.0"), &tree);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.contains("exactly one of"));
    }

    #[test]
    fn test_unknown_tags_pass_unless_strict() {
        let tree: Value = serde_yaml::from_str("anything: 1").unwrap();
        let tag = format_tag("equipment/generic_equipment", "0.1.0");
        assert!(BuiltinSchemas::default().validate(&tag, &tree).is_empty());
        assert_eq!(BuiltinSchemas::strict().validate(&tag, &tree).len(), 1);
        assert!(BuiltinSchemas::strict()
            .validate("tag:stsci.edu:asdf/core/ndarray-1.0.0", &tree)
            .is_empty());
    }

    #[test]
    fn test_boxed_validator_clones() {
        let boxed: Box<dyn SchemaValidator> = Box::new(BuiltinSchemas::strict());
        let copy = boxed.clone();
        assert_eq!(format!("{boxed:?}"), format!("{copy:?}"));
    }

    #[test]
    fn test_time_series_needs_values_or_expression() {
        let tag = format_tag("core/time_series", "0.1.0");
        let expr = format!(
            "!{} {{expression: a*t, parameters: {{a: {{value: 2, unit: A/s}}, b: {{value: x}}}}}}",
            format_tag(EXPRESSION_TAG, "0.1.0")
        );
        let tree: Value = serde_yaml::from_str(&format!("unit: A\nexpression: {expr}\n")).unwrap();
        let paths: Vec<String> = BuiltinSchemas::default()
            .validate(&tag, &tree)
            .into_iter()
            .map(|v| v.path)
            .collect();
        assert_eq!(paths, vec!["expression/parameters/b/value", "expression/parameters/b/unit"]);

        let both: Value =
            serde_yaml::from_str(&format!("unit: A\nvalues: [[1]]\nexpression: {expr}\n")).unwrap();
        let violations = BuiltinSchemas::default().validate(&tag, &both);
        assert!(violations.iter().any(|v| v.path.is_empty() && v.message.contains("exactly one of")));
    }
}
