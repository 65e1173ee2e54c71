// weldx_core/src/asdf/file.rs

use std::fs;
use std::path::Path;

use serde_yaml::{Mapping, Value};
use tracing::{debug, info};

use crate::asdf::tags::tag_str;
use crate::asdf::validation::{BuiltinSchemas, SchemaValidator, Violation};
use crate::asdf::{from_tagged, to_tagged, TreeConverter};
use crate::error::{Result, WeldxError};

const HEADER: &str = "#ASDF 1.0.0\n#ASDF_STANDARD 1.5.0\n%YAML 1.1\n---\n";
const FOOTER: &str = "...\n";

/// An in-memory document: top-level names mapped to tagged trees.
///
/// Typed access goes through [`insert`](Self::insert) and [`get`](Self::get),
/// which run the converters and the schema validator. Entries keep their
/// insertion order when written.
#[derive(Debug, Clone)]
pub struct WeldxFile {
    tree: Mapping,
    validator: Option<Box<dyn SchemaValidator>>,
}

impl Default for WeldxFile {
    fn default() -> Self {
        Self::new()
    }
}

impl WeldxFile {
    /// An empty document validated with [`BuiltinSchemas`].
    pub fn new() -> Self {
        Self::with_validator(Some(Box::new(BuiltinSchemas::default())))
    }

    /// An empty document using `validator`, or no validation at all with `None`.
    pub fn with_validator(validator: Option<Box<dyn SchemaValidator>>) -> Self {
        Self {
            tree: Mapping::new(),
            validator,
        }
    }

    /// Replaces the validator used by later typed access and [`violations`](Self::violations).
    pub fn set_validator(&mut self, validator: Option<Box<dyn SchemaValidator>>) {
        self.validator = validator;
    }

    // --- Typed access ---

    /// Converts, validates and stores `obj` under `key`, replacing any previous entry.
    pub fn insert<T: TreeConverter>(&mut self, key: &str, obj: &T) -> Result<()> {
        let value = to_tagged(obj)?;
        self.check(key, &value)?;
        self.tree.insert(key.into(), value);
        debug!("stored '{}' as {}", key, T::NAME);
        Ok(())
    }

    /// Validates and converts the entry under `key`.
    pub fn get<T: TreeConverter>(&self, key: &str) -> Result<T> {
        let value = self
            .tree
            .get(key)
            .ok_or_else(|| WeldxError::malformed(key, "no such entry in the document"))?;
        self.check(key, value)?;
        from_tagged(value.clone())
    }

    // --- Raw access ---

    pub fn keys(&self) -> Vec<&str> {
        self.tree.keys().filter_map(Value::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    pub fn get_value(&self, key: &str) -> Option<&Value> {
        self.tree.get(key)
    }

    /// Stores an arbitrary node without conversion or validation.
    pub fn insert_value(&mut self, key: &str, value: Value) {
        self.tree.insert(key.into(), value);
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.tree.remove(key)
    }

    /// Top-level entries with their tag (`None` for untagged nodes).
    pub fn entries(&self) -> Vec<(&str, Option<String>)> {
        self.tree
            .iter()
            .filter_map(|(k, v)| {
                let tag = match v {
                    Value::Tagged(t) => Some(tag_str(&t.tag)),
                    _ => None,
                };
                k.as_str().map(|k| (k, tag))
            })
            .collect()
    }

    /// Every violation in every tagged top-level entry, paths prefixed by the entry name.
    pub fn violations(&self) -> Vec<Violation> {
        let Some(validator) = &self.validator else {
            return Vec::new();
        };
        self.tree
            .iter()
            .filter_map(|(k, v)| match v {
                Value::Tagged(t) => Some((k.as_str().unwrap_or("?"), t)),
                _ => None,
            })
            .flat_map(|(key, tagged)| {
                validator
                    .validate(&tag_str(&tagged.tag), &tagged.value)
                    .into_iter()
                    .map(move |v| Violation::new(prefixed(key, &v.path), v.message))
            })
            .collect()
    }

    // --- Bytes ---

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let body = serde_yaml::to_string(&Value::Mapping(self.tree.clone()))?;
        let mut out = String::with_capacity(HEADER.len() + body.len() + FOOTER.len());
        out.push_str(HEADER);
        out.push_str(&body);
        if !body.ends_with('\n') {
            out.push('\n');
        }
        out.push_str(FOOTER);
        Ok(out.into_bytes())
    }

    /// Parses and validates a document with the built-in schemas.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::parse(bytes, Some(Box::new(BuiltinSchemas::default())))
    }

    /// Parses a document; the first invalid entry aborts the load.
    pub fn parse(bytes: &[u8], validator: Option<Box<dyn SchemaValidator>>) -> Result<Self> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| WeldxError::malformed("", format!("document is not UTF-8: {e}")))?;
        let body = normalize_verbatim_tags(&document_body(text));
        let tree = match serde_yaml::from_str::<Value>(&body)? {
            Value::Null => Mapping::new(),
            Value::Mapping(m) => m,
            // A tag on the document root (`--- !core/asdf-1.1.0`).
            Value::Tagged(t) => match t.value {
                Value::Mapping(m) => m,
                _ => return Err(WeldxError::malformed("", "document root must be a mapping")),
            },
            _ => return Err(WeldxError::malformed("", "document root must be a mapping")),
        };
        let file = Self { tree, validator };
        for (key, value) in file.tree.iter() {
            if let Some(key) = key.as_str() {
                file.check(key, value)?;
            }
        }
        Ok(file)
    }

    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        let file = Self::from_bytes(&bytes)?;
        info!("loaded {} entries from {}", file.len(), path.display());
        Ok(file)
    }

    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        fs::write(path, self.to_bytes()?)?;
        info!("wrote {} entries to {}", self.len(), path.display());
        Ok(())
    }

    fn check(&self, key: &str, value: &Value) -> Result<()> {
        let (Some(validator), Value::Tagged(tagged)) = (&self.validator, value) else {
            return Ok(());
        };
        let tag = tag_str(&tagged.tag);
        let violations: Vec<Violation> = validator
            .validate(&tag, &tagged.value)
            .into_iter()
            .map(|v| Violation::new(prefixed(key, &v.path), v.message))
            .collect();
        if violations.is_empty() {
            Ok(())
        } else {
            Err(WeldxError::SchemaValidation { tag, violations })
        }
    }
}

fn prefixed(key: &str, path: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{key}/{path}")
    }
}

/// The YAML between the document start marker and the end marker.
///
/// Header comments and directives before `---` are skipped; without a start
/// marker the whole text is the body.
fn document_body(text: &str) -> String {
    let mut lines: Vec<&str> = text.lines().collect();
    if let Some(start) = lines.iter().position(|l| l.starts_with("---")) {
        // Keep a root tag written on the marker line.
        let rest = lines[start].trim_start_matches("---").trim();
        lines.drain(..=start);
        if !rest.is_empty() {
            lines.insert(0, rest);
        }
    }
    if let Some(end) = lines.iter().rposition(|l| l.trim_end() == "...") {
        lines.truncate(end);
    }
    lines.join("\n")
}

/// Rewrites verbatim tags `!<uri>` as `!uri` so they survive parsing.
///
/// Only tags in node position are rewritten. Quoted scalars, block scalars
/// and comments are copied unchanged.
fn normalize_verbatim_tags(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    // Open quote of a scalar, which may continue on the next lines.
    let mut quote: Option<char> = None;
    // Indentation of the line that opened a block scalar.
    let mut block: Option<usize> = None;

    for line in text.split_inclusive('\n') {
        let indent = line.len() - line.trim_start_matches(' ').len();
        if let Some(parent) = block {
            if line.trim().is_empty() || indent > parent {
                out.push_str(line);
                continue;
            }
            block = None;
        }

        let chars: Vec<char> = line.chars().collect();
        let mut prev: Option<char> = None;
        let mut i = 0;
        while i < chars.len() {
            let c = chars[i];
            if let Some(q) = quote {
                out.push(c);
                if q == '"' && c == '\\' {
                    if let Some(&escaped) = chars.get(i + 1) {
                        out.push(escaped);
                        i += 1;
                    }
                } else if c == q {
                    if q == '\'' && chars.get(i + 1) == Some(&'\'') {
                        out.push(q);
                        i += 1;
                    } else {
                        quote = None;
                        prev = Some(c);
                    }
                }
                i += 1;
                continue;
            }

            let after_space = i == 0 || chars[i - 1].is_whitespace();
            let node_start = match prev {
                None | Some('[' | '{' | ',') => true,
                Some(':' | '-' | '?') => after_space,
                _ => false,
            };
            match c {
                '#' if after_space => {
                    out.extend(&chars[i..]);
                    break;
                }
                '"' | '\'' if node_start => quote = Some(c),
                '|' | '>' if node_start => block = Some(indent),
                '!' if node_start => {
                    let end = chars[i..]
                        .iter()
                        .position(|&ch| ch.is_whitespace() || matches!(ch, ',' | '}' | ']'))
                        .map_or(chars.len(), |n| i + n);
                    let tag = &chars[i..end];
                    match tag {
                        ['!', '<', uri @ .., '>'] => {
                            out.push('!');
                            out.extend(uri);
                        }
                        _ => out.extend(tag),
                    }
                    // A tag keeps the node open for its value.
                    i = end;
                    continue;
                }
                _ => {}
            }
            out.push(c);
            if !c.is_whitespace() {
                prev = Some(c);
            }
            i += 1;
        }
    }
    out
}
